//! Types, aliases and helper operations for doing math with `ultraviolet`.
pub use ultraviolet as uv;

pub type Vec2 = uv::Vec2;
pub type Vec3 = uv::Vec3;
pub type Mat3 = uv::Mat3;

/// A wrapper type to indicate a vector should always be normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Unit<T>(T);

impl Unit<Vec2> {
    pub fn new_normalize(v: Vec2) -> Self {
        Unit(v.normalized())
    }

    pub const fn new_unchecked(v: Vec2) -> Self {
        Unit(v)
    }

    pub fn unit_y() -> Self {
        Unit(Vec2::unit_y())
    }
}

impl Unit<Vec3> {
    pub fn new_normalize(v: Vec3) -> Self {
        Unit(v.normalized())
    }

    /// Normalize `v` unless it is too short to have a meaningful direction.
    pub fn try_new(v: Vec3, min_mag_sq: f32) -> Option<Self> {
        let mag_sq = v.mag_sq();
        if mag_sq > min_mag_sq && mag_sq.is_finite() {
            Some(Unit(v / mag_sq.sqrt()))
        } else {
            None
        }
    }

    pub const fn new_unchecked(v: Vec3) -> Self {
        Unit(v)
    }

    pub fn unit_z() -> Self {
        Unit(Vec3::unit_z())
    }
}

impl std::ops::Mul<Unit<Vec3>> for Mat3 {
    type Output = Unit<Vec3>;

    fn mul(self, rhs: Unit<Vec3>) -> Self::Output {
        Unit(self * rhs.0)
    }
}

impl<T> std::ops::Deref for Unit<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::Neg for Unit<T>
where
    T: std::ops::Neg,
{
    type Output = Unit<<T as std::ops::Neg>::Output>;

    fn neg(self) -> Self::Output {
        Unit(-self.0)
    }
}

// Vec2 utils

#[inline]
pub fn left_normal(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
#[inline]
pub fn right_normal(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

#[inline]
pub fn xy(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.y)
}

// solvers

/// Solve `a t² + b t + c = 0`.
///
/// Returns `None` if there are no real roots. The roots are not sorted;
/// with `a > 0` the first one is the smaller.
pub fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    let discr = b * b - 4.0 * a * c;
    if discr < 0.0 {
        return None;
    }
    let discr = discr.sqrt();
    let inv_a = -0.5 / a;
    let t1 = (b + discr) * inv_a;
    let t2 = (b - discr) * inv_a;
    if t1.is_finite() && t2.is_finite() {
        Some((t1, t2))
    } else {
        None
    }
}

/// Rotation matrix around a unit `axis` given the sine and cosine of the angle
/// (Rodrigues' formula).
pub fn rotation_around_axis(axis: Vec3, sin: f32, cos: f32) -> Mat3 {
    let t = 1.0 - cos;
    let (x, y, z) = (axis.x, axis.y, axis.z);
    // ultraviolet matrices are column-major
    Mat3::new(
        Vec3::new(t * x * x + cos, t * x * y + sin * z, t * x * z - sin * y),
        Vec3::new(t * x * y - sin * z, t * y * y + cos, t * y * z + sin * x),
        Vec3::new(t * x * z + sin * y, t * y * z - sin * x, t * z * z + cos),
    )
}
