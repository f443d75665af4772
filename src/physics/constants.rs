//! Numeric tolerances shared by every collidable.
//!
//! These values decide when a ball counts as touching, resting or embedded.
//! Changing any of them changes visible jitter and tunneling behaviour,
//! so they are fixed constants rather than configuration.

/// Distance from a surface below which a ball is considered to be touching it.
pub const PHYS_TOUCH: f32 = 0.05;

/// Normal speed at or below which a touching ball is in resting contact
/// rather than colliding.
pub const C_CONTACTVEL: f32 = 0.099;

/// Normal speed treated as effectively zero (receding/approaching cutoff).
pub const C_LOWNORMVEL: f32 = 0.0001;

/// Penetration depth beyond which a slow ball gets kicked out of a wall.
pub const C_EMBEDDED: f32 = 0.0;

/// Normal speed given to an embedded ball to free it.
pub const C_EMBEDSHOT: f32 = 0.05;

/// Fraction of the penetration depth corrected on impact.
pub const C_DISP_GAIN: f32 = 0.9875;

/// Maximum displacement correction on a single impact.
pub const C_DISP_LIMIT: f32 = 5.0;

/// Tolerance for hits past the endpoints of a line segment.
pub const C_TOL_ENDPNTS: f32 = 0.0;

/// Slip speed below which friction is treated as static.
pub const C_PRECISION: f32 = 0.01;

/// Time a ball is advanced after changing trigger membership,
/// so the same crossing is not detected twice.
pub const STATIC_TIME: f32 = 0.005;

/// Scales impact speed in the elasticity falloff formula.
pub const ELASTICITY_FALLOFF_SCALE: f32 = 1.0 / 18.53;

/// Squared distance a ball has to move before the same wall fires another hit event.
pub const EVENT_REPEAT_DIST_SQ: f32 = 0.25;

/// Impact speed along the normal below which scatter is not applied.
pub const SCATTER_MIN_SPEED: f32 = 1.0;

/// Squared length under which a computed normal is considered degenerate.
pub const DEGENERATE_NORMAL_SQ: f32 = 1.0e-12;

/// Distances below this count as "exactly on the centre" for round shapes.
pub const CENTER_EPSILON: f32 = 1.0e-6;

/// Squared relative speed below which a ball is considered motionless.
pub const MIN_SPEED_SQ: f32 = 1.0e-8;
