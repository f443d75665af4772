use super::{line_z::LineZ, Hit};
use crate::{
    math::{rotation_around_axis, Mat3, Vec2, Vec3},
    physics::{ball::Ball, collision::BoundingBox},
};

/// A line segment at any angle, e.g. the edge of a ramp.
///
/// Tested as a [`LineZ`] in a rotated frame where the segment points along +z.
#[derive(Clone, Copy, Debug)]
pub struct Line3D {
    pub v1: Vec3,
    pub v2: Vec3,
    /// World to line frame.
    rotation: Mat3,
    local: LineZ,
}

impl Line3D {
    pub fn new(v1: Vec3, v2: Vec3) -> Self {
        let dir = (v2 - v1).normalized();

        let axis = Vec3::new(dir.y, -dir.x, 0.0);
        let axis_len_sq = axis.mag_sq();
        let axis = if axis_len_sq <= 1.0e-6 {
            Vec3::unit_x()
        } else {
            axis / axis_len_sq.sqrt()
        };
        let cos = dir.z;
        let sin = (1.0 - cos * cos).max(0.0).sqrt();
        let rotation = rotation_around_axis(axis, sin, cos);

        let t1 = rotation * v1;
        let t2 = rotation * v2;
        let local = LineZ::new(Vec2::new(t1.x, t1.y), t1.z.min(t2.z), t1.z.max(t2.z));

        Self {
            v1,
            v2,
            rotation,
            local,
        }
    }

    pub(super) fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points([self.v1, self.v2])
    }

    pub(super) fn hit_test(&self, ball: &Ball, dtime: f32) -> Option<Hit> {
        let pos = self.rotation * ball.pos;
        let vel = self.rotation * ball.vel;
        let mut hit = self.local.hit_test_moving(pos, vel, ball.radius, dtime)?;
        hit.normal = self.rotation.transposed() * hit.normal;
        Some(hit)
    }
}
