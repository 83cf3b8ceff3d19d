mod options;

use anyhow::Error as AnyError;
use clap::Parser;
use cloudmask::{GeometrySample, Mask};
use log::debug;
use options::{Cli, Command as CliCmd, Format};
use plume::{
    read_observations, Analysis, AnalysisBuilder, Config, InputFormatVersion, Observation,
    PlumeError, ProbabilityReport, SegmentReport, Timestamp,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

fn main() -> Result<(), AnyError> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        CliCmd::Estimate {
            input,
            format,
            epoch,
            seed,
            json,
        } => estimate(&input, format, epoch.as_deref(), seed, json),
        CliCmd::Diameters { masks, scale, json } => diameters(&masks, scale, json),
    }
}

fn estimate(
    input: &Path,
    format: Format,
    epoch: Option<&str>,
    seed: Option<u64>,
    json: bool,
) -> Result<(), AnyError> {
    let version = InputFormatVersion::from(format);
    let config = Config::default();
    let reader = BufReader::new(File::open(input)?);
    let observations = read_observations(reader, version, config.tail_rows)?;
    debug!("read {} observations from {}", observations.len(), input.display());

    let mut builder = AnalysisBuilder::new().config(config);
    if let Some(code) = epoch {
        builder = builder.epoch(parse_epoch(code)?);
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let analysis = builder.build(&observations, &mut rng)?;

    if json {
        print_estimate_json(&observations, &analysis)?;
    } else {
        print_estimate_csv(&observations, &analysis)?;
    }
    print_report(&analysis)?;
    Ok(())
}

fn print_estimate_csv(observations: &[Observation], analysis: &Analysis) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "elapsed_s,area_km2,cloud_depth_m,particle_density_delta,particle_mer_kg_s,cumulative_mass_kg,cloud_type"
    )?;
    for (idx, observation) in observations.iter().enumerate() {
        let step = &analysis.mer.steps[idx];
        let state = &analysis.atmosphere[idx];
        let depth = observation.max_height_m - observation.plume_height_m;
        let density_delta = state.rho_bar - state.rho_gas;
        // Undefined rates print as NaN so the column stays numeric.
        let particle_mer = step.particle_rate.unwrap_or(f64::NAN);
        writeln!(
            stdout,
            "{},{},{depth},{density_delta},{particle_mer},{},{}",
            analysis.tss[idx],
            observation.area_km2,
            step.cumulative_mass,
            step.cloud_type.label(),
        )?;
    }
    Ok(())
}

fn print_estimate_json(observations: &[Observation], analysis: &Analysis) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonStep<'a> {
        elapsed_s: i64,
        area_km2: f64,
        cloud_depth_m: f64,
        particle_density_delta: f64,
        plume_mer_kg_s: Option<f64>,
        particle_mer_kg_s: Option<f64>,
        cumulative_mass_kg: f64,
        cloud_type: &'a str,
    }

    #[derive(Serialize)]
    struct JsonTest<'a> {
        exponent: &'a str,
        t1: f64,
        p1: f64,
        t2: f64,
        p2: f64,
        converged: bool,
    }

    #[derive(Serialize)]
    struct JsonSegment<'a> {
        c: f64,
        a: f64,
        c_stdev: f64,
        a_stdev: f64,
        tests: Vec<JsonTest<'a>>,
    }

    #[derive(Serialize)]
    struct JsonOutput<'a> {
        steps: Vec<JsonStep<'a>>,
        final_mass_kg: f64,
        max_mass_kg: f64,
        duration_s: i64,
        segments: Vec<Option<JsonSegment<'a>>>,
    }

    let steps = observations
        .iter()
        .enumerate()
        .map(|(idx, observation)| {
            let step = &analysis.mer.steps[idx];
            let state = &analysis.atmosphere[idx];
            JsonStep {
                elapsed_s: analysis.tss[idx],
                area_km2: observation.area_km2,
                cloud_depth_m: observation.max_height_m - observation.plume_height_m,
                particle_density_delta: state.rho_bar - state.rho_gas,
                plume_mer_kg_s: step.plume_rate,
                particle_mer_kg_s: step.particle_rate,
                cumulative_mass_kg: step.cumulative_mass,
                cloud_type: step.cloud_type.label(),
            }
        })
        .collect();

    let segment = |report: &SegmentReport| JsonSegment {
        c: report.fit.c,
        a: report.fit.a,
        c_stdev: report.fit.c_stdev,
        a_stdev: report.fit.a_stdev,
        tests: report
            .tests
            .iter()
            .map(|test| JsonTest {
                exponent: test.label,
                t1: test.t1,
                p1: test.p1,
                t2: test.t2,
                p2: test.p2,
                converged: test.converged,
            })
            .collect(),
    };
    let segments = match &analysis.probabilities {
        ProbabilityReport::Single(report) => vec![Some(segment(report))],
        ProbabilityReport::Two { first, second, .. } => {
            vec![first.as_ref().map(segment), second.as_ref().map(segment)]
        }
    };

    let summary = analysis.mer.summary;
    let json = serde_json::to_string(&JsonOutput {
        steps,
        final_mass_kg: summary.final_mass,
        max_mass_kg: summary.max_mass,
        duration_s: summary.duration_s,
        segments,
    })?;
    println!("{json}");
    Ok(())
}

/// Human-readable run summary, on stderr so it composes with the table
/// output on stdout.
fn print_report(analysis: &Analysis) -> Result<(), AnyError> {
    let mut stderr = std::io::stderr().lock();
    let summary = analysis.mer.summary;
    writeln!(
        stderr,
        "total particle mass: {:.3e} kg over {} s (max {:.3e} kg at {} s)",
        summary.final_mass, summary.final_elapsed_s, summary.max_mass, summary.max_mass_elapsed_s
    )?;
    writeln!(
        stderr,
        "tail mass: {:.3e} ± {:.3e} kg, estimated duration {} s",
        summary.tail_mean_mass, summary.tail_stdev_mass, summary.duration_s
    )?;

    match &analysis.probabilities {
        ProbabilityReport::Single(report) => print_segment(&mut stderr, "fit", report)?,
        ProbabilityReport::Two {
            first,
            second,
            transition,
        } => {
            writeln!(stderr, "cloud-type transition at index {transition}")?;
            if let Some(report) = first {
                print_segment(&mut stderr, "pre-transition fit", report)?;
            }
            if let Some(report) = second {
                print_segment(&mut stderr, "post-transition fit", report)?;
            }
        }
    }
    Ok(())
}

fn print_segment<W: Write>(out: &mut W, name: &str, report: &SegmentReport) -> Result<(), AnyError> {
    writeln!(
        out,
        "{name}: A = {:.4}·t^{:.4} (σc {:.4}, σa {:.4})",
        report.fit.c, report.fit.a, report.fit.c_stdev, report.fit.a_stdev
    )?;
    for test in &report.tests {
        writeln!(
            out,
            "  a = {}: p {:.4} / {:.4}{}",
            test.label,
            test.p1,
            test.p2,
            if test.converged { "" } else { " (not converged)" }
        )?;
    }
    Ok(())
}

/// Onset codes follow the 12-character start-file convention whatever the
/// table layout; a 14-character code with a trailing ordinal also works.
fn parse_epoch(code: &str) -> Result<Timestamp, PlumeError> {
    Timestamp::parse(code, InputFormatVersion::Twelve)
        .or_else(|_| Timestamp::parse(code, InputFormatVersion::Fourteen))
}

fn diameters(masks: &[PathBuf], scale: f64, json: bool) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonEntry {
        mask: String,
        area_km2: f64,
        d1_km: f64,
        d2_km: f64,
    }

    let mut entries = Vec::with_capacity(masks.len());
    for path in masks {
        let mask = Mask::load(path)?;
        let sample = GeometrySample::from_mask(&mask)?;
        let diameters = sample.diameters(scale)?;
        entries.push(JsonEntry {
            mask: path.display().to_string(),
            area_km2: sample.area_km2(scale),
            d1_km: diameters.d1,
            d2_km: diameters.d2,
        });
    }

    if json {
        println!("{}", serde_json::to_string(&entries)?);
    } else {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "mask,area_km2,d1_km,d2_km")?;
        for entry in &entries {
            writeln!(
                stdout,
                "{},{},{},{}",
                entry.mask, entry.area_km2, entry.d1_km, entry.d2_km
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_epoch;

    #[test]
    fn epoch_accepts_both_code_widths() {
        let twelve = parse_epoch("B98211190000").unwrap();
        assert_eq!((twelve.day, twelve.hour), (211, 19));
        assert_eq!(twelve.ordinal, None);

        let fourteen = parse_epoch("B9821119000003").unwrap();
        assert_eq!(fourteen.ordinal, Some(3));

        assert!(parse_epoch("B98211").is_err());
    }
}
