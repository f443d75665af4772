//! Finding the earliest collision of a ball among the primitives near it,
//! and dispatching the response.
//!
//! A typical sub-step for one ball looks like this:
//!
//! 1. [`find_earliest_collision`] (or the variant collecting rest contacts),
//! 2. advance the ball to `event.hit_time`,
//! 3. [`apply_collision`] for an impact or [`apply_contact`] for a rest contact,
//! 4. repeat with the time that's left.

use super::{event::CollisionEvent, spatialindex::SpatialIndex, Primitive, ResponseContext};
use crate::physics::{ball::Ball, forcefield::ForceField};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Find the earliest hit of `ball` within `dtime` and record it in `event`.
///
/// `event` is reset first, so nothing from a previous query survives.
/// Returns whether anything was hit.
/// Rest contacts compete with impacts; a contact at time 0 beats everything after it.
pub fn find_earliest_collision<I: SpatialIndex>(
    index: &I,
    prims: &[Primitive],
    ball: &Ball,
    dtime: f32,
    event: &mut CollisionEvent,
) -> bool {
    scan(index, prims, ball, dtime, event, None)
}

/// Like [`find_earliest_collision`], but rest contacts are appended to `contacts`
/// instead of competing with impacts. `event` only ever holds an impact.
pub fn find_earliest_collision_with_contacts<I: SpatialIndex>(
    index: &I,
    prims: &[Primitive],
    ball: &Ball,
    dtime: f32,
    event: &mut CollisionEvent,
    contacts: &mut Vec<CollisionEvent>,
) -> bool {
    scan(index, prims, ball, dtime, event, Some(contacts))
}

/// Convenience form of [`find_earliest_collision`] that allocates its own event.
pub fn earliest_collision<I: SpatialIndex>(
    index: &I,
    prims: &[Primitive],
    ball: &Ball,
    dtime: f32,
) -> Option<CollisionEvent> {
    let mut event = CollisionEvent::new(ball.id);
    find_earliest_collision(index, prims, ball, dtime, &mut event).then_some(event)
}

fn scan<I: SpatialIndex>(
    index: &I,
    prims: &[Primitive],
    ball: &Ball,
    dtime: f32,
    event: &mut CollisionEvent,
    mut contacts: Option<&mut Vec<CollisionEvent>>,
) -> bool {
    event.ball = ball.id;
    event.reset(dtime);
    if ball.frozen {
        return false;
    }

    let (center, radius_sq) = ball.hit_sphere(dtime);
    let mut candidate = CollisionEvent::new(ball.id);
    index.query(center, radius_sq, |slot| {
        if ball.proxy == Some(slot) {
            return;
        }
        let Some(prim) = prims.get(slot) else {
            return;
        };

        candidate.reset(event.hit_time);
        let Some(time) = prim.hit_test(ball, event.hit_time, &mut candidate) else {
            return;
        };
        candidate.primitive = Some(slot);

        match contacts.as_deref_mut() {
            Some(contacts) if candidate.is_contact => contacts.push(candidate),
            _ if time < event.hit_time => event.set(&candidate),
            _ => {}
        }
    });

    event.has_hit()
}

/// Call [`find_earliest_collision`] for every ball, writing one event per ball into `events`.
///
/// With the `parallel` feature the balls are processed in parallel.
/// Returns the number of balls that hit something.
pub fn find_earliest_collisions<I>(
    index: &I,
    prims: &[Primitive],
    balls: &[Ball],
    dtime: f32,
    events: &mut Vec<CollisionEvent>,
) -> usize
where
    I: SpatialIndex + Sync,
{
    let _span = tracy_span!("find earliest collisions", "find_earliest_collisions");

    events.clear();
    events.extend(balls.iter().map(|ball| CollisionEvent::new(ball.id)));

    #[cfg(feature = "parallel")]
    let hits = events
        .par_iter_mut()
        .zip(balls.par_iter())
        .map(|(event, ball)| find_earliest_collision(index, prims, ball, dtime, event))
        .filter(|hit| *hit)
        .count();
    #[cfg(not(feature = "parallel"))]
    let hits = events
        .iter_mut()
        .zip(balls)
        .map(|(event, ball)| find_earliest_collision(index, prims, ball, dtime, event))
        .filter(|hit| *hit)
        .count();

    log::trace!("{} of {} balls hit something", hits, balls.len());
    hits
}

/// Run the response of the primitive recorded in `event`, if any.
pub fn apply_collision(
    prims: &[Primitive],
    ball: &mut Ball,
    event: &CollisionEvent,
    ctx: &mut ResponseContext,
) {
    if let Some(prim) = event.primitive.and_then(|slot| prims.get(slot)) {
        prim.collide(ball, event, ctx);
    }
}

/// Hold a ball resting on the primitive recorded in `event` for `dtime`.
pub fn apply_contact(
    prims: &[Primitive],
    ball: &mut Ball,
    event: &CollisionEvent,
    dtime: f32,
    field: &dyn ForceField,
) {
    if let Some(prim) = event.primitive.and_then(|slot| prims.get(slot)) {
        prim.contact(ball, event, dtime, field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{IndexKind, PhysicsSettings},
        math::{Vec2, Vec3},
        physics::{
            ball::BallId,
            collision::{
                event::{HitEvent, HitEventKind},
                primitive::ItemHandle,
                spatialindex::Index,
            },
            forcefield::Gravity,
        },
    };
    use rand::{rngs::StdRng, SeedableRng};

    const KINDS: [IndexKind; 2] = [IndexKind::KdTree, IndexKind::QuadTree];

    fn falling_ball() -> Ball {
        Ball::new(BallId(0), Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -10.0), 1.0)
    }

    #[test]
    fn ball_falls_onto_playfield() {
        let prims = vec![
            Primitive::plane(Vec3::unit_z(), 0.0),
            Primitive::circle(Vec2::new(30.0, 30.0), 1.0, 0.0, 2.0),
        ];
        for kind in KINDS {
            let index = Index::build(kind, &prims);
            let event = earliest_collision(&index, &prims, &falling_ball(), 1.0)
                .expect("ball should hit the plane");
            assert_eq!(event.primitive, Some(0));
            assert!((event.hit_time - 0.4).abs() < 1e-5);
            assert!((event.hit_normal - Vec3::unit_z()).mag() < 1e-5);
            assert!(!event.is_contact);
        }
    }

    #[test]
    fn earliest_of_two_walls_wins() {
        let prims = vec![
            Primitive::plane(Vec3::unit_z(), 0.0),
            Primitive::plane(Vec3::unit_z(), 2.0),
        ];
        for kind in KINDS {
            let index = Index::build(kind, &prims);
            let event = earliest_collision(&index, &prims, &falling_ball(), 1.0).unwrap();
            assert_eq!(event.primitive, Some(1));
            assert!((event.hit_time - 0.2).abs() < 1e-5);
        }
    }

    #[test]
    fn nothing_in_window() {
        let prims = vec![Primitive::plane(Vec3::unit_z(), 0.0)];
        let index = Index::build(IndexKind::KdTree, &prims);
        assert!(earliest_collision(&index, &prims, &falling_ball(), 0.3).is_none());

        let mut frozen = falling_ball();
        frozen.frozen = true;
        assert!(earliest_collision(&index, &prims, &frozen, 1.0).is_none());
    }

    #[test]
    fn proxy_is_skipped() {
        let prims = vec![
            Primitive::circle(Vec2::new(0.0, 0.0), 1.0, 0.0, 10.0),
            Primitive::plane(Vec3::unit_z(), 0.0),
        ];
        let index = Index::build(IndexKind::QuadTree, &prims);
        let mut ball = falling_ball();
        ball.pos = Vec3::new(1.5, 0.0, 5.0);
        ball.vel = Vec3::new(-1.0, 0.0, -10.0);
        let event = earliest_collision(&index, &prims, &ball, 1.0).unwrap();
        assert_eq!(event.primitive, Some(0));

        ball.proxy = Some(0);
        let event = earliest_collision(&index, &prims, &ball, 1.0).unwrap();
        assert_eq!(event.primitive, Some(1));
    }

    #[test]
    fn event_is_fresh_each_query() {
        let prims = vec![Primitive::plane(Vec3::unit_z(), 0.0)];
        let index = Index::build(IndexKind::KdTree, &prims);
        let mut event = CollisionEvent::new(BallId(0));
        assert!(find_earliest_collision(&index, &prims, &falling_ball(), 1.0, &mut event));

        let mut away = falling_ball();
        away.vel = Vec3::new(0.0, 0.0, 10.0);
        assert!(!find_earliest_collision(&index, &prims, &away, 1.0, &mut event));
        assert_eq!(event.primitive, None);
        assert_eq!(event.hit_time, 1.0);
    }

    #[test]
    fn resting_ball_stays_put() {
        let settings = PhysicsSettings::default();
        let gravity = Gravity::from(&settings);
        let prims = vec![Primitive::plane(Vec3::unit_z(), 0.0)];
        let dtime = 0.01;

        for kind in KINDS {
            let index = Index::build(kind, &prims);
            let mut ball = Ball::new(BallId(0), Vec3::new(3.0, 4.0, 1.0), Vec3::zero(), 1.0);
            let mut event = CollisionEvent::new(ball.id);
            for _ in 0..100 {
                assert!(find_earliest_collision(&index, &prims, &ball, dtime, &mut event));
                assert!(event.is_contact);
                assert_eq!(event.hit_time, 0.0);
                apply_contact(&prims, &mut ball, &event, dtime, &gravity);

                ball.vel += gravity.0 * dtime;
                ball.advance(dtime);
            }
            assert!((ball.pos - Vec3::new(3.0, 4.0, 1.0)).mag() < 1e-4);
        }
    }

    #[test]
    fn resting_on_faces_and_walls() {
        let settings = PhysicsSettings::default();
        let dtime = 0.01;
        let floor = Primitive::polygon(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
        ]);
        let wall = Primitive::line_segment(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 0.0, 5.0);
        // a small gap inside the touch band in both cases
        let setups = [
            (floor, Vec3::new(5.0, 5.0, 0.28), 0.25, Gravity::from(&settings)),
            (wall, Vec3::new(5.0, 1.03, 1.0), 1.0, Gravity(Vec3::new(0.0, -1.5, 0.0))),
        ];

        for (prim, start, radius, gravity) in setups {
            let prims = vec![prim];
            for kind in KINDS {
                let index = Index::build(kind, &prims);
                let mut ball = Ball::new(BallId(0), start, Vec3::zero(), radius);
                let mut event = CollisionEvent::new(ball.id);
                for _ in 0..100 {
                    assert!(find_earliest_collision(&index, &prims, &ball, dtime, &mut event));
                    assert!(event.is_contact);
                    assert_eq!(event.hit_time, 0.0);
                    apply_contact(&prims, &mut ball, &event, dtime, &gravity);

                    ball.vel += gravity.0 * dtime;
                    ball.advance(dtime);
                }
                assert!((ball.pos - start).mag() < 1e-4);
            }
        }
    }

    #[test]
    fn contacts_are_collected_separately() {
        let prims = vec![
            Primitive::plane(Vec3::unit_z(), 0.0),
            Primitive::plane(Vec3::unit_x(), -5.0),
        ];
        let index = Index::build(IndexKind::KdTree, &prims);
        let ball = Ball::new(BallId(0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(-8.0, 0.0, 0.0), 1.0);

        let mut event = CollisionEvent::new(ball.id);
        let mut contacts = Vec::new();
        assert!(find_earliest_collision_with_contacts(
            &index, &prims, &ball, 1.0, &mut event, &mut contacts
        ));
        assert_eq!(event.primitive, Some(1));
        assert!(!event.is_contact);
        assert!((event.hit_time - 0.5).abs() < 1e-5);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].primitive, Some(0));
        assert!(contacts[0].is_contact);

        // without diverting, the contact at time 0 wins
        assert!(find_earliest_collision(&index, &prims, &ball, 1.0, &mut event));
        assert_eq!(event.primitive, Some(0));
    }

    #[test]
    fn trigger_fires_enter_and_exit_once() {
        let settings = PhysicsSettings::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut events: Vec<HitEvent> = Vec::new();
        let item = ItemHandle(5);
        let prims = vec![
            Primitive::circle(Vec2::zero(), 2.0, 0.0, 2.0).as_trigger(item),
            Primitive::polygon(vec![
                Vec3::new(6.0, -3.0, 3.0),
                Vec3::new(6.0, 3.0, 3.0),
                Vec3::new(6.0, 3.0, -1.0),
                Vec3::new(6.0, -3.0, -1.0),
            ])
            .as_trigger(ItemHandle(6)),
        ];
        let dtime = 0.1;

        for kind in KINDS {
            events.clear();
            let index = Index::build(kind, &prims);
            let mut ball =
                Ball::new(BallId(2), Vec3::new(-5.25, 0.0, 1.0), Vec3::new(10.0, 0.0, 0.0), 0.5);
            let mut event = CollisionEvent::new(ball.id);

            for _ in 0..15 {
                let mut remaining = dtime;
                for _ in 0..8 {
                    if !find_earliest_collision(&index, &prims, &ball, remaining, &mut event) {
                        break;
                    }
                    ball.advance(event.hit_time);
                    remaining -= event.hit_time;
                    let mut ctx = ResponseContext::new(&settings, &mut rng, &mut events);
                    apply_collision(&prims, &mut ball, &event, &mut ctx);
                }
                ball.advance(remaining);
            }

            let kinds: Vec<_> = events.iter().map(|e| (e.item, e.kind)).collect();
            itertools::assert_equal(
                kinds,
                [
                    (item, HitEventKind::Enter),
                    (item, HitEventKind::Exit),
                    (ItemHandle(6), HitEventKind::Enter),
                ],
            );
            assert!(events.iter().all(|e| e.ball == BallId(2)));
            assert!(!ball.is_inside(item));
            assert!(ball.is_inside(ItemHandle(6)));
        }
    }

    #[test]
    fn many_balls_at_once() {
        let prims = vec![Primitive::plane(Vec3::unit_z(), 0.0)];
        let index = Index::build(IndexKind::QuadTree, &prims);
        let balls: Vec<Ball> = (0..10)
            .map(|i| {
                let vz = if i % 2 == 0 { -10.0 } else { 10.0 };
                Ball::new(BallId(i), Vec3::new(i as f32, 0.0, 5.0), Vec3::new(0.0, 0.0, vz), 1.0)
            })
            .collect();
        let mut events = Vec::new();
        let hits = find_earliest_collisions(&index, &prims, &balls, 1.0, &mut events);
        assert_eq!(hits, 5);
        assert_eq!(events.len(), 10);
        for (ball, event) in balls.iter().zip(&events) {
            assert_eq!(event.ball, ball.id);
            assert_eq!(event.has_hit(), ball.vel.z < 0.0);
        }
    }
}
