use clap::{Parser, Subcommand, ValueEnum};
use plume::InputFormatVersion;
use std::path::PathBuf;

/// Estimate volcanic mass eruption rates from ash-cloud observations.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the full MER pipeline over an observation table.
    Estimate {
        /// Observation table, whitespace- or comma-delimited, one header
        /// line then one row per observation.
        input: PathBuf,

        /// Table and timestamp layout of the input file.
        #[arg(short, long, value_enum, default_value_t = Format::Twelve)]
        format: Format,

        /// Eruption-onset timestamp code. Defaults to the first row's
        /// timestamp.
        #[arg(short, long)]
        epoch: Option<String>,

        /// Seed for the probability resampler; random when unset.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print JSON instead of CSV.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Extract footprint area and orthogonal diameters from binary cloud
    /// masks.
    Diameters {
        /// Mask files, one per image: rows of 0/1 cells.
        masks: Vec<PathBuf>,

        /// Pixel-to-km scale factor.
        #[arg(short, long, default_value_t = 1.0)]
        scale: f64,

        /// Print JSON instead of CSV.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Format {
    /// Twelve columns, 12-character timestamp codes, SI heights and
    /// temperatures.
    Twelve,

    /// Fourteen columns with image ordinals, heights in feet and
    /// temperatures in Celsius.
    Fourteen,
}

impl From<Format> for InputFormatVersion {
    fn from(format: Format) -> Self {
        match format {
            Format::Twelve => Self::Twelve,
            Format::Fourteen => Self::Fourteen,
        }
    }
}
