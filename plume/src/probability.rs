//! Confidence that the fitted growth exponent matches a theoretical
//! power-law value.
//!
//! Each canonical exponent is tested twice against independent resamples
//! of the fit uncertainty; agreement between the two p-values is the
//! convergence signal.

use crate::{PlumeError, PowerLawFit, SegmentFit};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Theoretical area-growth exponents from gravity-current and plume
/// scaling arguments.
pub const CANONICAL_EXPONENTS: [(&str, f64); 4] = [
    ("4/9", 4.0 / 9.0),
    ("10/9", 10.0 / 9.0),
    ("4/3", 4.0 / 3.0),
    ("3/2", 1.5),
];

/// One canonical exponent tested against two independent resamples.
#[derive(Clone, Copy, Debug)]
pub struct ExponentTest {
    pub label: &'static str,
    pub exponent: f64,
    pub t1: f64,
    pub p1: f64,
    pub t2: f64,
    pub p2: f64,

    /// Both p-values within 0.1 of each other.
    pub converged: bool,
}

#[derive(Clone, Debug)]
pub struct SegmentReport {
    pub fit: SegmentFit,
    pub tests: Vec<ExponentTest>,
}

#[derive(Clone, Debug)]
pub enum ProbabilityReport {
    Single(SegmentReport),
    Two {
        first: Option<SegmentReport>,
        second: Option<SegmentReport>,
        transition: usize,
    },
}

/// Evaluates every canonical exponent against the fit, mirroring the
/// single/two-segment shape of the input.
///
/// # Errors
///
/// Fails with [`PlumeError::Fit`] when `samples < 2` (no t-test exists)
/// or the fitted exponent uncertainty is not a valid normal width.
pub fn evaluate_power_probabilities<R: Rng + ?Sized>(
    fit: &PowerLawFit,
    samples: usize,
    rng: &mut R,
) -> Result<ProbabilityReport, PlumeError> {
    match fit {
        PowerLawFit::Single(segment) => Ok(ProbabilityReport::Single(evaluate_segment(
            segment, samples, rng,
        )?)),
        PowerLawFit::Two {
            first,
            second,
            transition,
        } => {
            let first = first
                .as_ref()
                .map(|segment| evaluate_segment(segment, samples, rng))
                .transpose()?;
            let second = second
                .as_ref()
                .map(|segment| evaluate_segment(segment, samples, rng))
                .transpose()?;
            Ok(ProbabilityReport::Two {
                first,
                second,
                transition: *transition,
            })
        }
    }
}

fn evaluate_segment<R: Rng + ?Sized>(
    segment: &SegmentFit,
    samples: usize,
    rng: &mut R,
) -> Result<SegmentReport, PlumeError> {
    if samples < 2 {
        return Err(PlumeError::Fit {
            samples,
            reason: "t-test needs at least 2 resamples".to_string(),
        });
    }
    let normal = Normal::new(segment.a, segment.a_stdev).map_err(|e| PlumeError::Fit {
        samples,
        reason: format!("exponent uncertainty {} is not a normal width: {e}", segment.a_stdev),
    })?;

    let tests = CANONICAL_EXPONENTS
        .iter()
        .map(|&(label, exponent)| {
            let draw1: Vec<f64> = (0..samples).map(|_| normal.sample(rng)).collect();
            let draw2: Vec<f64> = (0..samples).map(|_| normal.sample(rng)).collect();
            let (t1, p1) = one_sample_t_test(&draw1, exponent)?;
            let (t2, p2) = one_sample_t_test(&draw2, exponent)?;
            Ok(ExponentTest {
                label,
                exponent,
                t1,
                p1,
                t2,
                p2,
                converged: (p1 - p2).abs() < 0.1,
            })
        })
        .collect::<Result<Vec<_>, PlumeError>>()?;

    Ok(SegmentReport {
        fit: *segment,
        tests,
    })
}

/// Two-sided one-sample t-test of `sample` against mean `mu`.
///
/// A zero standard error (every draw identical) degenerates: p is 1 when
/// the common value equals `mu` and 0 otherwise.
fn one_sample_t_test(sample: &[f64], mu: f64) -> Result<(f64, f64), PlumeError> {
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_err = (variance / n).sqrt();

    if std_err == 0.0 {
        return Ok(if mean == mu {
            (0.0, 1.0)
        } else {
            (f64::INFINITY.copysign(mean - mu), 0.0)
        });
    }

    let t = (mean - mu) / std_err;
    let student = StudentsT::new(0.0, 1.0, n - 1.0).map_err(|e| PlumeError::Fit {
        samples: sample.len(),
        reason: format!("t distribution: {e}"),
    })?;
    let p = 2.0 * student.cdf(-t.abs());
    Ok((t, p))
}

#[cfg(test)]
mod tests {
    use super::{evaluate_power_probabilities, one_sample_t_test, ProbabilityReport};
    use crate::{PowerLawFit, SegmentFit};
    use rand::{rngs::StdRng, SeedableRng};

    fn fit() -> SegmentFit {
        SegmentFit {
            c: 154.0,
            a: 0.776,
            c_stdev: 123.12,
            a_stdev: 0.0481,
        }
    }

    #[test]
    fn t_test_matches_hand_computation() {
        // mean 2, variance 1, n = 4; t against 1 is (2-1)/(1/2) = 2.
        let sample = [1.0, 1.5, 2.5, 3.0];
        let mean = sample.iter().sum::<f64>() / 4.0;
        let (t, p) = one_sample_t_test(&sample, 1.0).unwrap();
        let variance = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
        let expected_t = (mean - 1.0) / (variance / 4.0).sqrt();
        assert!((t - expected_t).abs() < 1e-12);
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn degenerate_sample_has_extreme_p() {
        let (t, p) = one_sample_t_test(&[0.5; 10], 0.5).unwrap();
        assert_eq!((t, p), (0.0, 1.0));
        let (t, p) = one_sample_t_test(&[0.5; 10], 1.0).unwrap();
        assert!(t.is_infinite() && t < 0.0);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn single_fit_reports_all_four_exponents() {
        let mut rng = StdRng::seed_from_u64(7);
        let report =
            evaluate_power_probabilities(&PowerLawFit::Single(fit()), 100, &mut rng).unwrap();
        let ProbabilityReport::Single(segment) = report else {
            panic!("expected a single-segment report");
        };
        assert_eq!(segment.tests.len(), 4);
        for test in &segment.tests {
            assert!(test.p1 >= 0.0 && test.p1 <= 1.0);
            assert!(test.p2 >= 0.0 && test.p2 <= 1.0);
            // a = 0.776 with sigma 0.0481 is many standard errors from
            // every canonical exponent, so both draws agree on rejection.
            assert!(test.p1 < 0.01);
            assert!(test.converged);
        }
    }

    #[test]
    fn two_segment_shape_is_mirrored() {
        let mut rng = StdRng::seed_from_u64(7);
        let input = PowerLawFit::Two {
            first: None,
            second: Some(fit()),
            transition: 5,
        };
        let report = evaluate_power_probabilities(&input, 100, &mut rng).unwrap();
        let ProbabilityReport::Two {
            first,
            second,
            transition,
        } = report
        else {
            panic!("expected a two-segment report");
        };
        assert!(first.is_none());
        assert_eq!(second.unwrap().tests.len(), 4);
        assert_eq!(transition, 5);
    }

    #[test]
    fn too_few_samples_fail() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(evaluate_power_probabilities(&PowerLawFit::Single(fit()), 1, &mut rng).is_err());
    }
}
