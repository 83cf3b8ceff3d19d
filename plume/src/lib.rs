//! Mass-eruption-rate estimation from satellite ash-cloud observations.
//!
//! The pipeline runs one observation series start to finish: elapsed time
//! from positional timestamp codes, atmospheric state from sounding
//! columns, per-step cloud-type classification and MER integration, a
//! power-law fit of area growth, and t-test probabilities against the
//! theoretical growth exponents. [`AnalysisBuilder`] drives the whole
//! chain; each stage is also callable on its own.

mod analysis;
mod atmosphere;
mod clock;
pub mod constants;
mod error;
mod mer;
mod powerfit;
mod probability;
mod series;

pub use analysis::{Analysis, AnalysisBuilder, Config};
pub use atmosphere::{resolve_buoyancy, resolve_density, resolve_states, AtmosphericState};
pub use clock::{elapsed_seconds, Timestamp};
pub use error::PlumeError;
pub use mer::{integrate, CloudType, MerSeries, MerStep, MerSummary};
pub use powerfit::{fit_power_law, PowerLawFit, SegmentFit};
pub use probability::{
    evaluate_power_probabilities, ExponentTest, ProbabilityReport, SegmentReport,
    CANONICAL_EXPONENTS,
};
pub use series::{read_observations, InputFormatVersion, Observation};
