//! One-call driver over the full pipeline: elapsed time, atmospheric
//! state, MER integration, power-law fit, probability evaluation.

use crate::{
    atmosphere::resolve_states,
    clock::{elapsed_seconds, Timestamp},
    constants::{FIT_SAMPLES, GRAVITY, R_DRY_AIR, STDEV_SCALE, TAIL_ROWS},
    mer::{integrate, CloudType, MerSeries},
    powerfit::fit_power_law,
    probability::evaluate_power_probabilities,
    AtmosphericState, Observation, PlumeError, PowerLawFit, ProbabilityReport,
};
use log::debug;
use rand::Rng;

/// Tunables for one analysis run. Defaults mirror the historical pipeline.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Specific gas constant for dry air, J/(kg·K).
    pub rd: f64,

    /// Gravitational acceleration, m/s², downward-negative.
    pub gravity: f64,

    /// Pixel-to-km scale for mask-derived geometry.
    pub km_per_pixel: f64,

    /// Percentage scale applied to fit parameter uncertainties.
    pub stdev_scale: f64,

    /// Resample count per t-test draw.
    pub fit_samples: usize,

    /// Input-table window: only this many trailing rows are consumed.
    pub tail_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rd: R_DRY_AIR,
            gravity: GRAVITY,
            km_per_pixel: 1.0,
            stdev_scale: STDEV_SCALE,
            fit_samples: FIT_SAMPLES,
            tail_rows: TAIL_ROWS,
        }
    }
}

/// All per-run pipeline outputs, index-aligned with the input observations.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub tss: Vec<i64>,
    pub atmosphere: Vec<AtmosphericState>,
    pub mer: MerSeries,
    pub fit: PowerLawFit,
    pub probabilities: ProbabilityReport,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AnalysisBuilder {
    config: Config,
    epoch: Option<Timestamp>,
}

impl AnalysisBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Eruption onset. When unset, the first observation's timestamp is
    /// the epoch and the series starts at zero elapsed seconds.
    pub fn epoch(mut self, epoch: Timestamp) -> Self {
        self.epoch = Some(epoch);
        self
    }

    /// Runs the whole pipeline over an ordered observation series.
    pub fn build<R: Rng + ?Sized>(
        self,
        observations: &[Observation],
        rng: &mut R,
    ) -> Result<Analysis, PlumeError> {
        let Some(first) = observations.first() else {
            return Err(PlumeError::SeriesShape("empty series".to_string()));
        };
        let epoch = self.epoch.unwrap_or(first.timestamp);

        let tss: Vec<i64> = observations
            .iter()
            .map(|o| elapsed_seconds(&o.timestamp, &epoch))
            .collect();
        debug!(
            "analyzing {} observations spanning {} s",
            observations.len(),
            tss.last().unwrap_or(&0) - tss.first().unwrap_or(&0)
        );

        let atmosphere = resolve_states(observations, self.config.rd, self.config.gravity)?;

        let d1: Vec<f64> = observations.iter().map(|o| o.d1_km).collect();
        let d2: Vec<f64> = observations.iter().map(|o| o.d2_km).collect();
        let area: Vec<f64> = observations.iter().map(|o| o.area_km2).collect();
        let wind: Vec<f64> = observations.iter().map(|o| o.wind_mps).collect();
        let mer = integrate(&d1, &d2, &area, &tss, &atmosphere, &wind)?;

        let cloud_types: Vec<CloudType> = mer.steps.iter().map(|s| s.cloud_type).collect();
        let fit = fit_power_law(&area, &tss, &cloud_types, self.config.stdev_scale)?;
        let probabilities = evaluate_power_probabilities(&fit, self.config.fit_samples, rng)?;

        Ok(Analysis {
            tss,
            atmosphere,
            mer,
            fit,
            probabilities,
        })
    }
}
