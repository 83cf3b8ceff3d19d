//! Cloud-type classification and mass-eruption-rate integration.
//!
//! This is the heart of the pipeline: a sequential pass over the
//! observation series in which step `t` needs step `t − 1`'s finalized
//! values. The recurrence is intentional and must stay sequential; whole
//! eruption cases can run in parallel, a single series cannot.

use crate::{
    constants::{DOWNWIND_RATIO, DOWNWIND_SHAPE_FACTOR, UMBRELLA_SHAPE_FACTOR},
    AtmosphericState, PlumeError,
};
use log::debug;
use std::f64::consts::PI;

/// Spreading regime of one observation, from the diameter-ratio heuristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloudType {
    /// Elongated footprint advected by wind.
    DownwindPlume,

    /// Radially spreading, roughly symmetric footprint.
    UmbrellaCloud,
}

impl CloudType {
    /// Classifies one step from its footprint diameters: a long/short ratio
    /// above 3 is a downwind plume, anything else an umbrella cloud. Pure
    /// per-step geometry, no hysteresis.
    pub fn classify(d1_km: f64, d2_km: f64) -> Self {
        if d1_km > DOWNWIND_RATIO * d2_km || d2_km > DOWNWIND_RATIO * d1_km {
            Self::DownwindPlume
        } else {
            Self::UmbrellaCloud
        }
    }

    /// Shape factor λ of the regime.
    pub fn shape_factor(self) -> f64 {
        match self {
            Self::DownwindPlume => DOWNWIND_SHAPE_FACTOR,
            Self::UmbrellaCloud => UMBRELLA_SHAPE_FACTOR,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DownwindPlume => "downwind_plume",
            Self::UmbrellaCloud => "umbrella_cloud",
        }
    }
}

/// Per-observation MER estimates.
///
/// `None` rates are the undefined-value marker: the formula produced a
/// negative (physically invalid) figure, typically a dissipating cloud.
/// Undefined is a first-class result, never an error and never zero.
#[derive(Clone, Copy, Debug)]
pub struct MerStep {
    pub cloud_type: CloudType,

    /// Shape factor λ used at this step.
    pub shape_factor: f64,

    /// Continuous-emission MER of the whole plume, kg/s.
    pub plume_rate: Option<f64>,

    /// Continuous-emission MER of ash particles, kg/s.
    pub particle_rate: Option<f64>,

    /// Instantaneous-release mass-rate analog of the plume, kg/s; umbrella
    /// regime only.
    pub instantaneous_plume_rate: Option<f64>,

    /// Instantaneous-release particle analog, kg/s; umbrella regime only.
    pub instantaneous_particle_rate: Option<f64>,

    /// Running particle mass, kg. Non-decreasing: undefined steps
    /// contribute a zero increment.
    pub cumulative_mass: f64,
}

/// Whole-run aggregates, for reporting only.
#[derive(Clone, Copy, Debug)]
pub struct MerSummary {
    /// Final cumulative particle mass, kg.
    pub final_mass: f64,

    pub final_elapsed_s: i64,

    /// Mean cumulative mass over the last two completed intervals.
    pub tail_mean_mass: f64,

    /// Population standard deviation over the same window.
    pub tail_stdev_mass: f64,

    pub max_mass: f64,

    pub max_mass_elapsed_s: i64,

    /// Elapsed time at maximum mass, capped at the final elapsed time.
    pub duration_s: i64,
}

#[derive(Clone, Debug)]
pub struct MerSeries {
    pub steps: Vec<MerStep>,
    pub summary: MerSummary,
}

/// Steps the classifier/integrator over the full observation series.
///
/// All slices are per-observation and must agree in length; `tss` must be
/// strictly increasing past index 0. Index 0 has no discrete derivative,
/// so its rates are undefined and its mass is 0.
///
/// # Errors
///
/// Equal consecutive timestamps are a caller contract violation
/// ([`PlumeError::NonMonotonicTime`]); zero buoyancy frequency, zero wind
/// in the downwind regime, and non-finite intermediate results are
/// [`PlumeError::NumericDomain`]s naming the step.
pub fn integrate(
    d1_km: &[f64],
    d2_km: &[f64],
    area_km2: &[f64],
    tss: &[i64],
    atmosphere: &[AtmosphericState],
    wind_mps: &[f64],
) -> Result<MerSeries, PlumeError> {
    let n = d1_km.len();
    if d2_km.len() != n
        || area_km2.len() != n
        || tss.len() != n
        || atmosphere.len() != n
        || wind_mps.len() != n
    {
        return Err(PlumeError::SeriesShape(format!(
            "d1: {n}, d2: {}, area: {}, tss: {}, atmosphere: {}, wind: {}",
            d2_km.len(),
            area_km2.len(),
            tss.len(),
            atmosphere.len(),
            wind_mps.len()
        )));
    }
    if n == 0 {
        return Err(PlumeError::SeriesShape("empty series".to_string()));
    }

    let mut steps: Vec<MerStep> = Vec::with_capacity(n);
    for t in 0..n {
        let cloud_type = CloudType::classify(d1_km[t], d2_km[t]);
        let shape_factor = cloud_type.shape_factor();

        if t == 0 {
            steps.push(MerStep {
                cloud_type,
                shape_factor,
                plume_rate: None,
                particle_rate: None,
                instantaneous_plume_rate: None,
                instantaneous_particle_rate: None,
                cumulative_mass: 0.0,
            });
            continue;
        }

        if tss[t] <= tss[t - 1] {
            return Err(PlumeError::NonMonotonicTime {
                index: t,
                prev: tss[t - 1],
                next: tss[t],
            });
        }

        let state = atmosphere[t];
        if state.buoyancy == 0.0 {
            return Err(PlumeError::NumericDomain {
                index: t,
                what: "buoyancy frequency is zero".to_string(),
            });
        }

        // km² -> m² before the powers; A·10⁶ squared carries the 10¹².
        let area_m2 = area_km2[t] * 1e6;
        let prev_area_m2 = area_km2[t - 1] * 1e6;
        let now = tss[t] as f64;
        let before = tss[t - 1] as f64;

        let (plume_rate, instantaneous_plume_rate) = match cloud_type {
            CloudType::DownwindPlume => {
                let wind = wind_mps[t];
                if wind == 0.0 {
                    return Err(PlumeError::NumericDomain {
                        index: t,
                        what: "wind speed is zero in the downwind regime".to_string(),
                    });
                }
                let continuous = (9.0 * state.rho_bar
                    / (8.0 * shape_factor * state.buoyancy * wind))
                    * (area_m2.powi(2) - prev_area_m2.powi(2))
                    / (now.powi(3) - before.powi(3));
                (clamp_rate(continuous, t, "continuous plume MER")?, None)
            }
            CloudType::UmbrellaCloud => {
                let area_growth = area_m2.powf(1.5) - prev_area_m2.powf(1.5);
                let continuous = (2.0 * state.rho_bar
                    / (3.0 * PI.sqrt() * shape_factor * state.buoyancy))
                    * area_growth
                    / (now.powi(2) - before.powi(2));
                let instantaneous = (PI.sqrt() * state.rho_bar
                    / (3.0 * shape_factor * state.buoyancy))
                    * area_growth
                    / (now - before);
                (
                    clamp_rate(continuous, t, "continuous plume MER")?,
                    clamp_rate(instantaneous, t, "instantaneous plume mass rate")?,
                )
            }
        };

        let particle_rate = particle_fraction(plume_rate, state, t)?;
        let instantaneous_particle_rate = particle_fraction(instantaneous_plume_rate, state, t)?;

        // Undefined steps contribute nothing to the running sum, while the
        // reported per-step rate stays undefined.
        let cumulative_mass = match particle_rate {
            Some(rate) => steps[t - 1].cumulative_mass + rate * (now - before),
            None => steps[t - 1].cumulative_mass,
        };

        steps.push(MerStep {
            cloud_type,
            shape_factor,
            plume_rate,
            particle_rate,
            instantaneous_plume_rate,
            instantaneous_particle_rate,
            cumulative_mass,
        });
    }

    let summary = summarize(&steps, tss);
    debug!(
        "MER series; final mass: {} kg at {} s, max mass: {} kg, duration: {} s",
        summary.final_mass, summary.final_elapsed_s, summary.max_mass, summary.duration_s
    );

    Ok(MerSeries { steps, summary })
}

fn summarize(steps: &[MerStep], tss: &[i64]) -> MerSummary {
    let n = steps.len();
    let mass: Vec<f64> = steps.iter().map(|step| step.cumulative_mass).collect();

    let mut max_idx = 0;
    for (idx, &value) in mass.iter().enumerate() {
        if value > mass[max_idx] {
            max_idx = idx;
        }
    }

    let tail = if n >= 3 { &mass[n - 3..n - 1] } else { &mass[..] };
    let tail_mean = tail.iter().sum::<f64>() / tail.len() as f64;
    let tail_stdev = (tail
        .iter()
        .map(|value| (value - tail_mean).powi(2))
        .sum::<f64>()
        / tail.len() as f64)
        .sqrt();

    MerSummary {
        final_mass: mass[n - 1],
        final_elapsed_s: tss[n - 1],
        tail_mean_mass: tail_mean,
        tail_stdev_mass: tail_stdev,
        max_mass: mass[max_idx],
        max_mass_elapsed_s: tss[max_idx],
        duration_s: tss[n - 1].min(tss[max_idx]),
    }
}

/// A negative rate means `sgn(dA/dt) = −1`: the cloud is dissipating, and
/// the regime cannot dissipate and emit at once, so the value is undefined.
fn clamp_rate(rate: f64, index: usize, what: &str) -> Result<Option<f64>, PlumeError> {
    if !rate.is_finite() {
        return Err(PlumeError::NumericDomain {
            index,
            what: format!("{what} is {rate}"),
        });
    }
    if rate < 0.0 {
        debug!("sgn(dA/dt) = -1 at index {index}: {what} undefined, cloud dissipating");
        return Ok(None);
    }
    Ok(Some(rate))
}

/// Scales a plume rate to its particle fraction `1 − ρ_gas/ρ̄`. Gas denser
/// than bulk is inverted physics; the plume rate passes through unmodified
/// rather than going negative.
fn particle_fraction(
    plume_rate: Option<f64>,
    state: AtmosphericState,
    index: usize,
) -> Result<Option<f64>, PlumeError> {
    let Some(rate) = plume_rate else {
        return Ok(None);
    };
    let scaled = if state.rho_bar > state.rho_gas {
        rate * (1.0 - state.rho_gas / state.rho_bar)
    } else {
        rate
    };
    clamp_rate(scaled, index, "particle MER")
}
