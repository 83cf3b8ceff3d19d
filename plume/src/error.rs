use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlumeError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("timestamp code {0:?} does not fit the expected layout")]
    TimestampCode(String),

    #[error("table row {row}: {reason}")]
    Table { row: usize, reason: String },

    #[error("table row {row}: timestamp {next} precedes {prev}")]
    TimestampOrder {
        row: usize,
        prev: String,
        next: String,
    },

    #[error("series inputs disagree in length ({0})")]
    SeriesShape(String),

    #[error("elapsed seconds not increasing at index {index}: {prev} then {next}")]
    NonMonotonicTime { index: usize, prev: i64, next: i64 },

    #[error("numeric domain violation at index {index}: {what}")]
    NumericDomain { index: usize, what: String },

    #[error("power-law fit over {samples} samples failed: {reason}")]
    Fit { samples: usize, reason: String },

    #[error(
        "cloud type changed more than once (indices {indices:?}); \
         at most one umbrella to downwind transition is physical"
    )]
    CloudtypeTransition { indices: Vec<usize> },
}
