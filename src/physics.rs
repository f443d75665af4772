//! Ball state, collision detection and collision response.

pub mod ball;
pub use ball::{Ball, BallId};

pub mod collision;
pub use collision::{narrowphase, BoundingBox, Primitive, ResponseContext};

pub mod constants;

pub mod forcefield;
pub use forcefield::ForceField;
