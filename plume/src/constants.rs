//! Physical and historical constants of the estimation pipeline.
//!
//! Run-tunable values have counterparts in [`crate::Config`]; the constants
//! here are their documented defaults.

/// Gas constant for dry air, J/(kg·K).
pub const R_DRY_AIR: f64 = 287.0;

/// Gravitational acceleration, m/s². Negative by the sign convention of the
/// buoyancy-frequency formula.
pub const GRAVITY: f64 = -9.81;

/// Buoyancy frequency assigned to the whole series when the sounding never
/// places the max-height temperature above the brightness temperature. A
/// coarse heuristic for the unstable/uncomputable case, not physics.
pub const FALLBACK_BUOYANCY_FREQUENCY: f64 = 0.035;

/// Diameter ratio above which a cloud spreads as a downwind plume.
pub const DOWNWIND_RATIO: f64 = 3.0;

/// Shape factor λ for a downwind plume.
pub const DOWNWIND_SHAPE_FACTOR: f64 = 0.845;

/// Shape factor λ for an umbrella cloud.
pub const UMBRELLA_SHAPE_FACTOR: f64 = 1.0;

/// Historical ingestion window: only this many trailing table rows are
/// consumed from longer tables.
pub const TAIL_ROWS: usize = 15;

/// Draw size for exponent probability evaluation. Small by intent,
/// reflecting the generally small number of satellite acquisitions.
pub const FIT_SAMPLES: usize = 100;

/// Percentage scale applied to reported 1-σ fit parameter errors.
pub const STDEV_SCALE: f64 = 100.0;

/// Wind speed, knots to m/s.
pub const KNOTS_TO_MPS: f64 = 0.514444;

/// Height, feet to meters.
pub const FEET_TO_M: f64 = 0.3048;

/// Temperature offset, Celsius to Kelvin.
pub const CELSIUS_TO_K: f64 = 273.15;
