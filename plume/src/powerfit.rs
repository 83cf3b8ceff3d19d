//! Nonlinear least-squares fit of area growth to `y = c·xᵃ`.
//!
//! The series is split at the cloud-type transition when one exists; more
//! than one transition means the classification input is bad or the
//! eruption is genuinely multi-phase, and either way the fit refuses.

use crate::{CloudType, PlumeError};
use log::warn;
use nalgebra::{Matrix2, Vector2};

const MAX_ITERATIONS: usize = 200;
const STEP_TOLERANCE: f64 = 1e-10;

/// Fitted `(c, a)` for one regime segment, with one-standard-deviation
/// parameter uncertainties on the configured percentage scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentFit {
    pub c: f64,
    pub a: f64,
    pub c_stdev: f64,
    pub a_stdev: f64,
}

#[derive(Clone, Debug)]
pub enum PowerLawFit {
    /// No cloud-type transition; one fit over the whole series.
    Single(SegmentFit),

    /// One transition at `transition`; segments `[0, transition)` and
    /// `[transition, end)` fit independently. A failed segment is `None`
    /// rather than aborting the other.
    Two {
        first: Option<SegmentFit>,
        second: Option<SegmentFit>,
        transition: usize,
    },
}

/// Fits the area-vs-elapsed-time series, segmenting at the cloud-type
/// transition.
///
/// # Errors
///
/// Two or more transitions fail with [`PlumeError::CloudtypeTransition`]
/// listing the indices. A single-segment fit that cannot converge fails
/// with [`PlumeError::Fit`]; in the two-segment case each side's failure
/// is logged and reported as `None` instead.
pub fn fit_power_law(
    area_km2: &[f64],
    tss: &[i64],
    cloud_types: &[CloudType],
    stdev_scale: f64,
) -> Result<PowerLawFit, PlumeError> {
    let n = area_km2.len();
    if tss.len() != n || cloud_types.len() != n {
        return Err(PlumeError::SeriesShape(format!(
            "area: {n}, tss: {}, cloud types: {}",
            tss.len(),
            cloud_types.len()
        )));
    }

    let transitions: Vec<usize> = (1..n)
        .filter(|&idx| cloud_types[idx] != cloud_types[idx - 1])
        .collect();
    if transitions.len() > 1 {
        return Err(PlumeError::CloudtypeTransition { indices: transitions });
    }

    let x: Vec<f64> = tss.iter().map(|&t| t as f64).collect();
    match transitions.first() {
        None => Ok(PowerLawFit::Single(fit_segment(
            &x,
            area_km2,
            stdev_scale,
        )?)),
        Some(&k) => {
            let first = fit_segment(&x[..k], &area_km2[..k], stdev_scale)
                .map_err(|e| warn!("pre-transition segment fit failed: {e}"))
                .ok();
            let second = fit_segment(&x[k..], &area_km2[k..], stdev_scale)
                .map_err(|e| warn!("post-transition segment fit failed: {e}"))
                .ok();
            Ok(PowerLawFit::Two {
                first,
                second,
                transition: k,
            })
        }
    }
}

/// Model value and Jacobian row at one sample. `x = 0` is on every series
/// (the onset), where the power model and both partials vanish.
fn model_row(c: f64, a: f64, x: f64) -> (f64, [f64; 2]) {
    if x == 0.0 {
        return (0.0, [0.0, 0.0]);
    }
    let xa = x.powf(a);
    (c * xa, [xa, c * xa * x.ln()])
}

fn sum_squared_residuals(c: f64, a: f64, x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&x, &y)| {
            let (value, _) = model_row(c, a, x);
            (y - value).powi(2)
        })
        .sum()
}

/// Levenberg-Marquardt on the two-parameter power model, starting from
/// `(c, a) = (1, 1)`.
fn fit_segment(x: &[f64], y: &[f64], stdev_scale: f64) -> Result<SegmentFit, PlumeError> {
    let n = x.len();
    if n < 3 {
        return Err(PlumeError::Fit {
            samples: n,
            reason: "need at least 3 samples for a two-parameter fit".to_string(),
        });
    }

    let mut c = 1.0;
    let mut a = 1.0;
    let mut lambda = 1e-3;
    let mut ssr = sum_squared_residuals(c, a, x, y);

    for _ in 0..MAX_ITERATIONS {
        let mut jtj = Matrix2::zeros();
        let mut jtr = Vector2::zeros();
        for (&xi, &yi) in x.iter().zip(y) {
            let (value, row) = model_row(c, a, xi);
            let residual = yi - value;
            let jac = Vector2::new(row[0], row[1]);
            jtj += jac * jac.transpose();
            jtr += jac * residual;
        }

        // Damped normal equations; back off the damping on an accepted
        // step, crank it on a rejected one.
        let mut stepped = false;
        for _ in 0..16 {
            let mut damped = jtj;
            damped[(0, 0)] += lambda * jtj[(0, 0)].max(1e-12);
            damped[(1, 1)] += lambda * jtj[(1, 1)].max(1e-12);
            let Some(inverse) = damped.try_inverse() else {
                lambda *= 10.0;
                continue;
            };
            let delta = inverse * jtr;
            let (c_next, a_next) = (c + delta[0], a + delta[1]);
            let ssr_next = sum_squared_residuals(c_next, a_next, x, y);
            if ssr_next.is_finite() && ssr_next <= ssr {
                let converged = delta.norm() < STEP_TOLERANCE * (1.0 + Vector2::new(c, a).norm());
                c = c_next;
                a = a_next;
                ssr = ssr_next;
                lambda = (lambda / 10.0).max(1e-12);
                stepped = true;
                if converged {
                    return finalize(c, a, ssr, x, stdev_scale);
                }
                break;
            }
            lambda *= 10.0;
        }
        if !stepped {
            // No productive step at any damping; treat the current point
            // as the optimum.
            return finalize(c, a, ssr, x, stdev_scale);
        }
    }

    finalize(c, a, ssr, x, stdev_scale)
}

/// Parameter uncertainties from the unscaled covariance `(JᵀJ)⁻¹·SSR/(n−2)`.
fn finalize(c: f64, a: f64, ssr: f64, x: &[f64], stdev_scale: f64) -> Result<SegmentFit, PlumeError> {
    let n = x.len();
    if !c.is_finite() || !a.is_finite() {
        return Err(PlumeError::Fit {
            samples: n,
            reason: format!("parameters diverged (c = {c}, a = {a})"),
        });
    }

    let mut jtj = Matrix2::zeros();
    for &xi in x {
        let (_, row) = model_row(c, a, xi);
        let jac = Vector2::new(row[0], row[1]);
        jtj += jac * jac.transpose();
    }
    let Some(inverse) = jtj.try_inverse() else {
        return Err(PlumeError::Fit {
            samples: n,
            reason: "singular normal matrix at the optimum".to_string(),
        });
    };

    let variance_scale = ssr / (n - 2) as f64;
    let c_stdev = (inverse[(0, 0)] * variance_scale).sqrt() * stdev_scale;
    let a_stdev = (inverse[(1, 1)] * variance_scale).sqrt() * stdev_scale;
    if !c_stdev.is_finite() || !a_stdev.is_finite() {
        return Err(PlumeError::Fit {
            samples: n,
            reason: "non-finite parameter uncertainty".to_string(),
        });
    }

    Ok(SegmentFit {
        c,
        a,
        c_stdev,
        a_stdev,
    })
}

#[cfg(test)]
mod tests {
    use super::{fit_power_law, fit_segment, PowerLawFit};
    use crate::{CloudType, PlumeError};
    use approx::assert_relative_eq;

    fn power_series(c: f64, a: f64, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| c * x.powf(a)).collect()
    }

    #[test]
    fn recovers_synthetic_power_law() {
        let xs: Vec<f64> = (0..12).map(|i| (i * 500) as f64).collect();
        let ys = power_series(2.5, 0.8, &xs);
        let fit = fit_segment(&xs, &ys, 1.0).unwrap();
        assert_relative_eq!(fit.c, 2.5, max_relative = 1e-4);
        assert_relative_eq!(fit.a, 0.8, max_relative = 1e-4);
        // An exact model leaves essentially no residual uncertainty.
        assert!(fit.a_stdev < 1e-3);
    }

    #[test]
    fn stdev_scale_multiplies_uncertainties() {
        let xs: Vec<f64> = (0..10).map(|i| (i * 1000) as f64).collect();
        let mut ys = power_series(3.0, 1.1, &xs);
        // Perturb so the residuals are nonzero.
        for (i, y) in ys.iter_mut().enumerate() {
            *y += if i % 2 == 0 { 0.5 } else { -0.5 };
        }
        let raw = fit_segment(&xs, &ys, 1.0).unwrap();
        let scaled = fit_segment(&xs, &ys, 100.0).unwrap();
        assert_relative_eq!(scaled.a_stdev, raw.a_stdev * 100.0, max_relative = 1e-9);
        assert_relative_eq!(scaled.c_stdev, raw.c_stdev * 100.0, max_relative = 1e-9);
    }

    #[test]
    fn too_few_samples_fail() {
        match fit_segment(&[0.0, 1000.0], &[0.0, 5.0], 1.0) {
            Err(PlumeError::Fit { samples: 2, .. }) => (),
            other => panic!("expected fit error, got {other:?}"),
        }
    }

    #[test]
    fn zero_transitions_fit_once() {
        let tss: Vec<i64> = (0..8).map(|i| i * 600).collect();
        let xs: Vec<f64> = tss.iter().map(|&t| t as f64).collect();
        let ys = power_series(1.5, 0.9, &xs);
        let types = vec![CloudType::UmbrellaCloud; 8];
        match fit_power_law(&ys, &tss, &types, 1.0).unwrap() {
            PowerLawFit::Single(fit) => {
                assert_relative_eq!(fit.a, 0.9, max_relative = 1e-4);
            }
            other => panic!("expected a single-segment fit, got {other:?}"),
        }
    }

    #[test]
    fn one_transition_fits_two_segments() {
        let tss: Vec<i64> = (0..10).map(|i| i * 600).collect();
        let xs: Vec<f64> = tss.iter().map(|&t| t as f64).collect();
        let ys = power_series(1.5, 0.9, &xs);
        let mut types = vec![CloudType::UmbrellaCloud; 10];
        for t in types.iter_mut().skip(5) {
            *t = CloudType::DownwindPlume;
        }
        match fit_power_law(&ys, &tss, &types, 1.0).unwrap() {
            PowerLawFit::Two {
                first,
                second,
                transition,
            } => {
                assert_eq!(transition, 5);
                assert!(first.is_some());
                assert!(second.is_some());
            }
            other => panic!("expected a two-segment fit, got {other:?}"),
        }
    }

    #[test]
    fn short_segment_is_reported_as_none() {
        let tss: Vec<i64> = (0..6).map(|i| i * 600).collect();
        let xs: Vec<f64> = tss.iter().map(|&t| t as f64).collect();
        let ys = power_series(1.5, 0.9, &xs);
        // Transition after two samples; the first segment cannot be fit.
        let types = vec![
            CloudType::UmbrellaCloud,
            CloudType::UmbrellaCloud,
            CloudType::DownwindPlume,
            CloudType::DownwindPlume,
            CloudType::DownwindPlume,
            CloudType::DownwindPlume,
        ];
        match fit_power_law(&ys, &tss, &types, 1.0).unwrap() {
            PowerLawFit::Two { first, second, .. } => {
                assert!(first.is_none());
                assert!(second.is_some());
            }
            other => panic!("expected a two-segment fit, got {other:?}"),
        }
    }

    #[test]
    fn two_transitions_are_rejected() {
        let tss: Vec<i64> = (0..6).map(|i| i * 600).collect();
        let ys = vec![1.0; 6];
        let types = vec![
            CloudType::UmbrellaCloud,
            CloudType::DownwindPlume,
            CloudType::DownwindPlume,
            CloudType::UmbrellaCloud,
            CloudType::UmbrellaCloud,
            CloudType::UmbrellaCloud,
        ];
        match fit_power_law(&ys, &tss, &types, 1.0) {
            Err(PlumeError::CloudtypeTransition { indices }) => {
                assert_eq!(indices, vec![1, 3]);
            }
            other => panic!("expected transition error, got {other:?}"),
        }
    }
}
