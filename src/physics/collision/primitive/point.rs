use super::{sphere_point_toi, Hit};
use crate::{
    math::Vec3,
    physics::{ball::Ball, collision::BoundingBox},
};

/// A single point, e.g. the sharp end of a wall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub p: Vec3,
}

impl Point {
    pub fn new(p: Vec3) -> Self {
        Self { p }
    }

    pub(super) fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.p, self.p)
    }

    pub(super) fn hit_test(&self, ball: &Ball, dtime: f32) -> Option<Hit> {
        let (t, bnd, bnv, is_contact) =
            sphere_point_toi(ball.pos - self.p, ball.vel, ball.radius, dtime)?;

        let hit_pos = ball.pos + t * ball.vel;
        let mut hit = Hit::new(t, (hit_pos - self.p).normalized(), bnd);
        if is_contact {
            hit.contact = Some(bnv);
        }
        Some(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ball::BallId;

    #[test]
    fn head_on() {
        let point = Point::new(Vec3::zero());
        let ball = Ball::new(BallId(0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(-4.0, 0.0, 0.0), 1.0);
        let hit = point.hit_test(&ball, 1.0).unwrap();
        assert!((hit.time - 0.5).abs() < 0.001);
        assert!((hit.normal - Vec3::unit_x()).mag() < 0.001);
        assert!(hit.contact.is_none());
    }

    #[test]
    fn miss_and_window() {
        let point = Point::new(Vec3::zero());
        // passes 2 units to the side
        let ball = Ball::new(BallId(0), Vec3::new(3.0, 2.0, 0.0), Vec3::new(-4.0, 0.0, 0.0), 1.0);
        assert!(point.hit_test(&ball, 1.0).is_none());
        // would hit, but not this sub-step
        let ball = Ball::new(BallId(0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(-4.0, 0.0, 0.0), 1.0);
        assert!(point.hit_test(&ball, 0.4).is_none());
    }

    #[test]
    fn resting_is_contact() {
        let point = Point::new(Vec3::zero());
        let ball = Ball::new(BallId(0), Vec3::new(0.0, 0.0, 1.02), Vec3::new(0.3, 0.0, 0.0), 1.0);
        let hit = point.hit_test(&ball, 1.0).unwrap();
        assert_eq!(hit.time, 0.0);
        assert!(hit.contact.is_some());
    }
}
