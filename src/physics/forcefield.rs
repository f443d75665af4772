use crate::math::Vec3;

/// A (possibly) position-dependent acceleration acting on balls,
/// used by static contact handling to work out the normal force.
pub trait ForceField {
    fn value_at(&self, position: Vec3) -> Vec3;
}

pub struct NoneField;
impl ForceField for NoneField {
    fn value_at(&self, _: Vec3) -> Vec3 {
        Vec3::zero()
    }
}

/// A combination of two different force fields.
pub struct Sum<F1: ForceField, F2: ForceField>(pub F1, pub F2);
impl<F1: ForceField, F2: ForceField> ForceField for Sum<F1, F2> {
    fn value_at(&self, pos: Vec3) -> Vec3 {
        self.0.value_at(pos) + self.1.value_at(pos)
    }
}

/// Constant gravity over all of space.
///
/// A tilted playfield is expressed by giving gravity a Y component.
pub struct Gravity(pub Vec3);
impl ForceField for Gravity {
    fn value_at(&self, _pos: Vec3) -> Vec3 {
        self.0
    }
}

impl From<&crate::config::PhysicsSettings> for Gravity {
    fn from(settings: &crate::config::PhysicsSettings) -> Self {
        let [x, y, z] = settings.gravity;
        Gravity(Vec3::new(x, y, z))
    }
}
