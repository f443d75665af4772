use crate::math::{Vec2, Vec3};

/// An axis-aligned bounding box with an independent Z extent.
///
/// `top <= bottom` is the Y ordering (table coordinates grow towards the player).
/// A box may start out as [`BoundingBox::EMPTY`] and be grown with `extend`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub z_low: f32,
    pub z_high: f32,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// Inverted box that any `extend` will replace.
    pub const EMPTY: Self = Self {
        left: f32::INFINITY,
        right: f32::NEG_INFINITY,
        top: f32::INFINITY,
        bottom: f32::NEG_INFINITY,
        z_low: f32::INFINITY,
        z_high: f32::NEG_INFINITY,
    };

    /// Box covering all of space, used by unbounded primitives.
    pub const INFINITE: Self = Self {
        left: f32::NEG_INFINITY,
        right: f32::INFINITY,
        top: f32::NEG_INFINITY,
        bottom: f32::INFINITY,
        z_low: f32::NEG_INFINITY,
        z_high: f32::INFINITY,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            left: min.x,
            right: max.x,
            top: min.y,
            bottom: max.y,
            z_low: min.z,
            z_high: max.z,
        }
    }

    /// Box around a sphere.
    pub fn around_sphere(center: Vec3, radius: f32) -> Self {
        let r = Vec3::broadcast(radius);
        Self::new(center - r, center + r)
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut bb, p| {
            bb.extend_point(p);
            bb
        })
    }

    pub fn extend_point(&mut self, p: Vec3) {
        self.left = self.left.min(p.x);
        self.right = self.right.max(p.x);
        self.top = self.top.min(p.y);
        self.bottom = self.bottom.max(p.y);
        self.z_low = self.z_low.min(p.z);
        self.z_high = self.z_high.max(p.z);
    }

    pub fn extend(&mut self, other: &Self) {
        self.left = self.left.min(other.left);
        self.right = self.right.max(other.right);
        self.top = self.top.min(other.top);
        self.bottom = self.bottom.max(other.bottom);
        self.z_low = self.z_low.min(other.z_low);
        self.z_high = self.z_high.max(other.z_high);
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut ret = *self;
        ret.extend(other);
        ret
    }

    /// True once the box has been extended by at least one point.
    pub fn is_valid(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom && self.z_low <= self.z_high
    }

    pub fn is_finite(&self) -> bool {
        [
            self.left,
            self.right,
            self.top,
            self.bottom,
            self.z_low,
            self.z_high,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn depth(&self) -> f32 {
        self.z_high - self.z_low
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
            (self.z_low + self.z_high) * 0.5,
        )
    }

    pub fn center_xy(&self) -> Vec2 {
        Vec2::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
        )
    }

    /// Overlap test, inclusive on faces.
    pub fn intersects(&self, other: &Self) -> bool {
        self.right >= other.left
            && self.left <= other.right
            && self.bottom >= other.top
            && self.top <= other.bottom
            && self.z_high >= other.z_low
            && self.z_low <= other.z_high
    }

    /// Does a sphere with the given squared radius touch the box?
    pub fn intersects_sphere(&self, center: Vec3, radius_sq: f32) -> bool {
        let ex = (self.left - center.x).max(0.0) + (center.x - self.right).max(0.0);
        let ey = (self.top - center.y).max(0.0) + (center.y - self.bottom).max(0.0);
        let ez = (self.z_low - center.z).max(0.0) + (center.z - self.z_high).max(0.0);
        ex * ex + ey * ey + ez * ez <= radius_sq
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.left
            && p.x <= self.right
            && p.y >= self.top
            && p.y <= self.bottom
            && p.z >= self.z_low
            && p.z <= self.z_high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_from_empty() {
        let mut bb = BoundingBox::EMPTY;
        assert!(!bb.is_valid());
        bb.extend_point(Vec3::new(1.0, 2.0, 3.0));
        assert!(bb.is_valid());
        assert_eq!(bb.width(), 0.0);
        bb.extend_point(Vec3::new(-1.0, 4.0, 0.0));
        assert_eq!(
            bb,
            BoundingBox::new(Vec3::new(-1.0, 2.0, 0.0), Vec3::new(1.0, 4.0, 3.0))
        );
        assert_eq!(bb.center(), Vec3::new(0.0, 3.0, 1.5));
    }

    #[test]
    fn sphere_test() {
        let bb = BoundingBox::new(Vec3::zero(), Vec3::one());
        assert!(bb.intersects_sphere(Vec3::new(0.5, 0.5, 0.5), 0.0));
        assert!(bb.intersects_sphere(Vec3::new(2.0, 0.5, 0.5), 1.0));
        assert!(!bb.intersects_sphere(Vec3::new(2.0, 2.0, 0.5), 1.0));
        // corner distance is sqrt(3)
        assert!(bb.intersects_sphere(Vec3::new(2.0, 2.0, 2.0), 3.01));
        assert!(!bb.intersects_sphere(Vec3::new(2.0, 2.0, 2.0), 2.99));
    }

    #[test]
    fn infinite_box_hits_everything() {
        let bb = BoundingBox::INFINITE;
        assert!(!bb.is_finite());
        assert!(bb.intersects_sphere(Vec3::new(1e6, -1e6, 3.0), 0.0));
        assert!(bb.intersects(&BoundingBox::around_sphere(Vec3::zero(), 1.0)));
    }
}
