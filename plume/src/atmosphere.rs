use crate::{constants::FALLBACK_BUOYANCY_FREQUENCY, Observation, PlumeError};
use log::debug;

/// Per-observation atmospheric drivers of the MER formulas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmosphericState {
    /// Bulk plume density at the neutral-buoyancy level, kg/m³ scaled by
    /// the pressure units supplied.
    pub rho_bar: f64,

    /// Density of the gas in the cloud, same scaling.
    pub rho_gas: f64,

    /// Buoyancy frequency N, 1/s.
    pub buoyancy: f64,
}

/// Bulk plume density and cloud gas density for one observation:
/// `ρ̄ = p_plume/(tb·rd)` and `ρ_gas = p_max/(max_t·rd)`.
///
/// Pressures are used in the units supplied; the historical pipeline feeds
/// sounding hPa straight in, so the absolute magnitudes are a convention,
/// not SI. `index` is the observation's position, for error attribution.
pub fn resolve_density(
    p_plume: f64,
    p_max: f64,
    max_t: f64,
    tb: f64,
    rd: f64,
    index: usize,
) -> Result<(f64, f64), PlumeError> {
    if tb <= 0.0 || max_t <= 0.0 {
        return Err(PlumeError::NumericDomain {
            index,
            what: format!("non-positive temperature in density denominator (tb = {tb} K, max_t = {max_t} K)"),
        });
    }
    Ok((p_plume / (tb * rd), p_max / (max_t * rd)))
}

/// Buoyancy frequency `N = sqrt(−(g/tb)·((max_t − tb)/(max_ph − ph)))` per
/// observation.
///
/// When the max-height temperature never exceeds the brightness temperature
/// anywhere in the series, the whole series takes the fixed fallback
/// [`FALLBACK_BUOYANCY_FREQUENCY`] instead; this models the
/// unstable/uncomputable case and is a coarse heuristic, not physics.
pub fn resolve_buoyancy(
    tb: &[f64],
    max_t: &[f64],
    ph: &[f64],
    max_ph: &[f64],
    gravity: f64,
) -> Result<Vec<f64>, PlumeError> {
    let n = tb.len();
    if max_t.len() != n || ph.len() != n || max_ph.len() != n {
        return Err(PlumeError::SeriesShape(format!(
            "tb: {n}, max_t: {}, ph: {}, max_ph: {}",
            max_t.len(),
            ph.len(),
            max_ph.len()
        )));
    }

    if !tb.iter().zip(max_t).any(|(&tb, &max_t)| max_t > tb) {
        debug!("max-height temperature never exceeds brightness temperature; using fallback N = {FALLBACK_BUOYANCY_FREQUENCY}");
        return Ok(vec![FALLBACK_BUOYANCY_FREQUENCY; n]);
    }

    (0..n)
        .map(|index| {
            let depth = max_ph[index] - ph[index];
            if depth == 0.0 || tb[index] == 0.0 {
                return Err(PlumeError::NumericDomain {
                    index,
                    what: format!(
                        "zero denominator in buoyancy frequency (depth = {depth} m, tb = {} K)",
                        tb[index]
                    ),
                });
            }
            let radicand = -(gravity / tb[index]) * ((max_t[index] - tb[index]) / depth);
            if radicand < 0.0 {
                return Err(PlumeError::NumericDomain {
                    index,
                    what: format!("negative radicand {radicand} in buoyancy frequency"),
                });
            }
            Ok(radicand.sqrt())
        })
        .collect()
}

/// Resolves the full atmospheric state series for a run.
pub fn resolve_states(
    observations: &[Observation],
    rd: f64,
    gravity: f64,
) -> Result<Vec<AtmosphericState>, PlumeError> {
    let tb: Vec<f64> = observations.iter().map(|o| o.brightness_temp_k).collect();
    let max_t: Vec<f64> = observations.iter().map(|o| o.max_height_temp_k).collect();
    let ph: Vec<f64> = observations.iter().map(|o| o.plume_height_m).collect();
    let max_ph: Vec<f64> = observations.iter().map(|o| o.max_height_m).collect();

    let buoyancy = resolve_buoyancy(&tb, &max_t, &ph, &max_ph, gravity)?;

    observations
        .iter()
        .zip(buoyancy)
        .enumerate()
        .map(|(index, (o, buoyancy))| {
            let (rho_bar, rho_gas) = resolve_density(
                o.plume_pressure_hpa,
                o.max_height_pressure_hpa,
                o.max_height_temp_k,
                o.brightness_temp_k,
                rd,
                index,
            )?;
            Ok(AtmosphericState {
                rho_bar,
                rho_gas,
                buoyancy,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{resolve_buoyancy, resolve_density, FALLBACK_BUOYANCY_FREQUENCY};
    use crate::PlumeError;
    use approx::assert_relative_eq;

    #[test]
    fn density_round_trips() {
        let rd = 287.0;
        let (rho_bar, rho_gas) = resolve_density(300.0, 250.0, 235.0, 240.0, rd, 0).unwrap();
        // Back-substitution recovers the inputs.
        assert_relative_eq!(rho_bar * 240.0 * rd, 300.0, max_relative = 1e-12);
        assert_relative_eq!(rho_gas * 235.0 * rd, 250.0, max_relative = 1e-12);
    }

    #[test]
    fn density_rejects_zero_temperature() {
        match resolve_density(300.0, 250.0, 235.0, 0.0, 287.0, 4) {
            Err(PlumeError::NumericDomain { index: 4, .. }) => (),
            other => panic!("expected numeric domain error, got {other:?}"),
        }
    }

    #[test]
    fn buoyancy_matches_formula() {
        let n = resolve_buoyancy(&[240.0], &[245.0], &[9_000.0], &[11_000.0], -9.81).unwrap();
        let expected = ((9.81_f64 / 240.0) * (5.0 / 2_000.0)).sqrt();
        assert_relative_eq!(n[0], expected, max_relative = 1e-12);
    }

    #[test]
    fn buoyancy_falls_back_when_column_never_warms() {
        let n = resolve_buoyancy(
            &[240.0, 245.0],
            &[238.0, 240.0],
            &[9_000.0, 9_000.0],
            &[11_000.0, 11_000.0],
            -9.81,
        )
        .unwrap();
        assert_eq!(n, vec![FALLBACK_BUOYANCY_FREQUENCY; 2]);
    }

    #[test]
    fn buoyancy_rejects_equal_heights() {
        match resolve_buoyancy(&[240.0], &[245.0], &[9_000.0], &[9_000.0], -9.81) {
            Err(PlumeError::NumericDomain { index: 0, .. }) => (),
            other => panic!("expected numeric domain error, got {other:?}"),
        }
    }

    #[test]
    fn buoyancy_rejects_negative_radicand() {
        // One element warms (so no fallback) while another cools, driving
        // its radicand negative.
        match resolve_buoyancy(
            &[240.0, 240.0],
            &[245.0, 230.0],
            &[9_000.0, 9_000.0],
            &[11_000.0, 11_000.0],
            -9.81,
        ) {
            Err(PlumeError::NumericDomain { index: 1, .. }) => (),
            other => panic!("expected numeric domain error, got {other:?}"),
        }
    }
}
