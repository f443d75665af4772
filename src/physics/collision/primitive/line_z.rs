use super::{sphere_point_toi, Hit};
use crate::{
    math::{Vec2, Vec3},
    physics::{ball::Ball, collision::BoundingBox},
};

/// A vertical line, like a post or the corner of a wall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineZ {
    pub xy: Vec2,
    pub z_low: f32,
    pub z_high: f32,
}

impl LineZ {
    pub fn new(xy: Vec2, z_low: f32, z_high: f32) -> Self {
        Self { xy, z_low, z_high }
    }

    pub(super) fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            Vec3::new(self.xy.x, self.xy.y, self.z_low),
            Vec3::new(self.xy.x, self.xy.y, self.z_high),
        )
    }

    /// Hit test in the line's own frame, with the ball given by position and velocity
    /// so rotated lines can reuse it.
    pub(super) fn hit_test_moving(
        &self,
        pos: Vec3,
        vel: Vec3,
        radius: f32,
        dtime: f32,
    ) -> Option<Hit> {
        let rel = Vec3::new(pos.x - self.xy.x, pos.y - self.xy.y, 0.0);
        let vel_xy = Vec3::new(vel.x, vel.y, 0.0);
        let (t, bnd, bnv, is_contact) = sphere_point_toi(rel, vel_xy, radius, dtime)?;

        let hit_z = pos.z + t * vel.z;
        if hit_z < self.z_low || hit_z > self.z_high {
            return None;
        }

        let normal = (rel + t * vel_xy).normalized();
        let mut hit = Hit::new(t, normal, bnd);
        if is_contact {
            hit.contact = Some(bnv);
        }
        Some(hit)
    }

    pub(super) fn hit_test(&self, ball: &Ball, dtime: f32) -> Option<Hit> {
        self.hit_test_moving(ball.pos, ball.vel, ball.radius, dtime)
    }
}
