use super::{in_window, trigger_plane_time, Hit, HitProps, Response};
use crate::{
    math::{Unit, Vec2, Vec3},
    physics::{ball::Ball, collision::BoundingBox, constants::*},
};

use itertools::Itertools;

/// A flat polygon in 3D, e.g. a piece of a ramp or a toy's mesh.
///
/// The normal is found with Newell's method. Counter-clockwise vertices
/// (seen from the side the normal should face) give an outward normal.
/// If the vertices don't span an area the polygon can never be hit.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon3D {
    vertices: Vec<Vec3>,
    normal: Option<Unit<Vec3>>,
}

impl Polygon3D {
    pub fn new(vertices: Vec<Vec3>) -> Self {
        let normal = newell_normal(&vertices);
        if normal.is_none() {
            log::warn!(
                "polygon with {} vertices has no area and will never be hit",
                vertices.len()
            );
        }
        Self { vertices, normal }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normal(&self) -> Option<Vec3> {
        self.normal.map(|n| *n)
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal.is_none()
    }

    pub(super) fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices.iter().copied())
    }

    pub(super) fn hit_test(&self, props: &HitProps, ball: &Ball, dtime: f32) -> Option<Hit> {
        face_hit_test(&self.vertices, *self.normal?, props, ball, dtime)
    }
}

/// A polygon with exactly three vertices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    vertices: [Vec3; 3],
    normal: Option<Unit<Vec3>>,
}

impl Triangle {
    pub fn new(vertices: [Vec3; 3]) -> Self {
        let [a, b, c] = vertices;
        let normal = Unit::try_new((b - a).cross(c - a), DEGENERATE_NORMAL_SQ);
        if normal.is_none() {
            log::warn!("triangle {:?} has no area and will never be hit", vertices);
        }
        Self { vertices, normal }
    }

    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.vertices
    }

    pub fn normal(&self) -> Option<Vec3> {
        self.normal.map(|n| *n)
    }

    pub(super) fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.vertices)
    }

    pub(super) fn hit_test(&self, props: &HitProps, ball: &Ball, dtime: f32) -> Option<Hit> {
        face_hit_test(&self.vertices, *self.normal?, props, ball, dtime)
    }
}

fn newell_normal(vertices: &[Vec3]) -> Option<Unit<Vec3>> {
    if vertices.len() < 3 {
        return None;
    }
    let n = vertices
        .iter()
        .circular_tuple_windows()
        .fold(Vec3::zero(), |n, (a, b)| {
            n + Vec3::new(
                (a.y - b.y) * (a.z + b.z),
                (a.z - b.z) * (a.x + b.x),
                (a.x - b.x) * (a.y + b.y),
            )
        });
    Unit::try_new(n, DEGENERATE_NORMAL_SQ)
}

/// Time of impact with a flat face whose plane passes through `vertices[0]`.
fn face_hit_test(
    vertices: &[Vec3],
    normal: Vec3,
    props: &HitProps,
    ball: &Ball,
    dtime: f32,
) -> Option<Hit> {
    let rigid = props.response == Response::Rigid;
    let r = ball.radius;

    let bnv = normal.dot(ball.vel);
    if rigid && bnv > C_LOWNORMVEL {
        return None;
    }
    let bnd = normal.dot(ball.pos - vertices[0]) - r;

    let (t, unhit) = if rigid {
        if bnd < -r {
            return None;
        }
        let t = if bnd <= PHYS_TOUCH {
            // touching or embedded, resolved right away; slow ones are rest contacts
            0.0
        } else if bnv.abs() > C_LOWNORMVEL {
            bnd / -bnv
        } else {
            return None;
        };
        (t, false)
    } else {
        trigger_plane_time(props, ball, bnd, bnv)?
    };

    if !in_window(t, dtime) {
        return None;
    }

    let contact_point = ball.pos + t * ball.vel - r * normal;
    if !point_in_polygon(vertices, normal, contact_point) {
        return None;
    }

    let mut hit = Hit::new(t, normal, bnd);
    hit.unhit = unhit;
    if rigid && bnv.abs() <= C_CONTACTVEL && bnd.abs() <= PHYS_TOUCH {
        hit.contact = Some(bnv);
    }
    Some(hit)
}

/// Crossing number test of `p` against the polygon, projected onto the
/// coordinate plane most perpendicular to `normal`.
///
/// Edges are half-open in the second coordinate and crossings are counted
/// strictly to the left of the point, so points on the bottom and right edges
/// of an axis-aligned square are inside and points on the top and left edges
/// are outside.
pub(crate) fn point_in_polygon(vertices: &[Vec3], normal: Vec3, p: Vec3) -> bool {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    let project: fn(Vec3) -> Vec2 = if az >= ax && az >= ay {
        |v| Vec2::new(v.x, v.y)
    } else if ay >= ax {
        |v| Vec2::new(v.z, v.x)
    } else {
        |v| Vec2::new(v.y, v.z)
    };

    let q = project(p);
    let mut inside = false;
    for (a, b) in vertices
        .iter()
        .map(|v| project(*v))
        .circular_tuple_windows()
    {
        if (a.y <= q.y) != (b.y <= q.y) {
            let x = a.x + (q.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if x < q.x {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{ball::BallId, collision::primitive::ItemHandle};

    fn unit_square() -> Polygon3D {
        Polygon3D::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ])
    }

    fn regular_ngon(n: usize, radius: f32) -> Vec<Vec3> {
        (0..n)
            .map(|i| {
                let a = i as f32 * std::f32::consts::TAU / n as f32;
                Vec3::new(radius * a.cos(), radius * a.sin(), 0.0)
            })
            .collect()
    }

    #[test]
    fn newell_normal_follows_winding() {
        let sq = unit_square();
        assert_eq!(sq.normal(), Some(Vec3::unit_z()));
        let mut verts = sq.vertices().to_vec();
        verts.reverse();
        assert_eq!(Polygon3D::new(verts).normal(), Some(-Vec3::unit_z()));

        let tri = Triangle::new([Vec3::zero(), Vec3::unit_x(), Vec3::unit_y()]);
        assert_eq!(tri.normal(), Some(Vec3::unit_z()));
    }

    #[test]
    fn degenerate_polygon_never_hit() {
        let line = Polygon3D::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
        ]);
        assert!(line.is_degenerate());
        let ball = Ball::new(BallId(0), Vec3::new(1.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -10.0), 1.0);
        assert!(line.hit_test(&HitProps::default(), &ball, 1.0).is_none());

        let tri = Triangle::new([Vec3::zero(), Vec3::unit_x(), Vec3::unit_x() * 2.0]);
        assert!(tri.hit_test(&HitProps::default(), &ball, 1.0).is_none());
    }

    #[test]
    fn regular_ngon_inside_outside() {
        for n in [3, 5, 8, 13] {
            let verts = regular_ngon(n, 2.0);
            let inner = 2.0 * (std::f32::consts::PI / n as f32).cos();
            for i in 0..32 {
                let a = i as f32 * std::f32::consts::TAU / 32.0 + 0.01;
                let dir = Vec3::new(a.cos(), a.sin(), 0.0);
                assert!(point_in_polygon(&verts, Vec3::unit_z(), dir * inner * 0.95));
                assert!(!point_in_polygon(&verts, Vec3::unit_z(), dir * 2.05));
            }
            assert!(point_in_polygon(&verts, Vec3::unit_z(), Vec3::zero()));
        }
    }

    #[test]
    fn boundary_tie_break() {
        let sq = unit_square();
        let n = Vec3::unit_z();
        let inside = |x: f32, y: f32| point_in_polygon(sq.vertices(), n, Vec3::new(x, y, 0.0));
        assert!(inside(1.0, 0.5));
        assert!(!inside(0.0, 0.5));
        assert!(inside(0.5, 0.0));
        assert!(!inside(0.5, 1.0));
        // the rightmost vertex of a hexagon is in, the leftmost out
        let h = 3.0f32.sqrt();
        let hex = [
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, h, 0.0),
            Vec3::new(-1.0, h, 0.0),
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(-1.0, -h, 0.0),
            Vec3::new(1.0, -h, 0.0),
        ];
        assert!(point_in_polygon(&hex, n, Vec3::new(2.0, 0.0, 0.0)));
        assert!(!point_in_polygon(&hex, n, Vec3::new(-2.0, 0.0, 0.0)));
    }

    #[test]
    fn rigid_hit_inside_and_outside_face() {
        let props = HitProps::default();
        let sq = unit_square();
        let ball = Ball::new(BallId(0), Vec3::new(0.5, 0.5, 3.0), Vec3::new(0.0, 0.0, -4.0), 0.25);
        let hit = sq.hit_test(&props, &ball, 1.0).unwrap();
        // surface starts 2.75 above
        assert!((hit.time - 2.75 / 4.0).abs() < 0.001);
        assert_eq!(hit.normal, Vec3::unit_z());

        let ball = Ball::new(BallId(0), Vec3::new(1.5, 0.5, 3.0), Vec3::new(0.0, 0.0, -4.0), 0.25);
        assert!(sq.hit_test(&props, &ball, 1.0).is_none());

        // from below, receding from the front face
        let ball = Ball::new(BallId(0), Vec3::new(0.5, 0.5, -3.0), Vec3::new(0.0, 0.0, 4.0), 0.25);
        assert!(sq.hit_test(&props, &ball, 1.0).is_none());
    }

    #[test]
    fn resting_on_face_is_contact() {
        let props = HitProps::default();
        let sq = unit_square();
        let ball = Ball::new(BallId(0), Vec3::new(0.5, 0.5, 0.25), Vec3::new(0.05, 0.0, 0.0), 0.25);
        let hit = sq.hit_test(&props, &ball, 1.0).unwrap();
        assert_eq!(hit.time, 0.0);
        assert_eq!(hit.contact, Some(0.0));

        // hovering inside the touch band, with windows long and short
        for z in [0.26, 0.28, 0.29] {
            let ball = Ball::new(BallId(0), Vec3::new(0.5, 0.5, z), Vec3::new(0.05, 0.0, 0.0), 0.25);
            for dtime in [1.0, 0.01] {
                let hit = sq.hit_test(&props, &ball, dtime).unwrap();
                assert_eq!(hit.time, 0.0);
                assert_eq!(hit.contact, Some(0.0));
            }
        }
    }

    #[test]
    fn trigger_crossing_flags() {
        let props = HitProps {
            response: Response::Trigger,
            owner: Some(ItemHandle(3)),
            ..Default::default()
        };
        let sq = unit_square();
        let mut ball = Ball::new(BallId(0), Vec3::new(0.5, 0.5, 2.0), Vec3::new(0.0, 0.0, -4.0), 0.25);
        // approaching the front: entering
        let hit = sq.hit_test(&props, &ball, 1.0).unwrap();
        assert!(!hit.unhit);

        // behind the face moving out through it: leaving
        ball.pos = Vec3::new(0.5, 0.5, -2.0);
        ball.vel = Vec3::new(0.0, 0.0, 4.0);
        ball.enter_volume(ItemHandle(3));
        let hit = sq.hit_test(&props, &ball, 1.0).unwrap();
        assert!(hit.unhit);
    }
}
