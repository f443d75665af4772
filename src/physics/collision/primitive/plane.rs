use super::{in_window, Hit};
use crate::{
    math::Vec3,
    physics::{ball::Ball, collision::BoundingBox, constants::*},
};

/// The infinite plane `normal · x = d`, e.g. the playfield or the glass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    /// `normal` is normalized here.
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self {
            normal: normal.normalized(),
            d,
        }
    }

    pub(super) fn bounding_box(&self) -> BoundingBox {
        BoundingBox::INFINITE
    }

    /// Signed distance from the ball's surface to the plane.
    #[inline]
    fn surface_distance(&self, ball: &Ball) -> f32 {
        self.normal.dot(ball.pos) - ball.radius - self.d
    }

    pub(super) fn hit_test(&self, ball: &Ball, dtime: f32) -> Option<Hit> {
        let bnv = self.normal.dot(ball.vel);
        if bnv > C_CONTACTVEL {
            return None;
        }
        let bnd = self.surface_distance(ball);
        if bnd < -2.0 * ball.radius {
            // too deep to get out the right way
            return None;
        }

        if bnv.abs() <= C_CONTACTVEL {
            if bnd.abs() <= PHYS_TOUCH {
                let mut hit = Hit::new(0.0, self.normal, bnd);
                hit.contact = Some(bnv);
                return Some(hit);
            }
            return None;
        }

        let t = (bnd / -bnv).max(0.0);
        in_window(t, dtime).then(|| Hit::new(t, self.normal, bnd))
    }

    /// Move a penetrating ball back onto the surface.
    pub(super) fn push_out(&self, ball: &mut Ball) {
        let bnd = self.surface_distance(ball);
        if bnd < 0.0 {
            ball.pos -= self.normal * bnd;
        }
    }
}
