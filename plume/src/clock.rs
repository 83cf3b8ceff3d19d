use crate::{InputFormatVersion, PlumeError};

/// Calendar components of one observation time, as recorded in a positional
/// timestamp code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timestamp {
    /// Two-digit year, exactly as coded.
    pub year: u8,

    /// Day of year, 1-366.
    pub day: u16,

    pub hour: u8,

    pub minute: u8,

    pub second: u8,

    /// Trailing image ordinal; only present in fourteen-column data.
    pub ordinal: Option<u8>,
}

impl Timestamp {
    /// Parses a fixed-width `?YYDDDHHMMSS` code (first character ignored).
    /// The fourteen-column layout appends a two-digit image ordinal.
    pub fn parse(code: &str, version: InputFormatVersion) -> Result<Self, PlumeError> {
        let expected_len = match version {
            InputFormatVersion::Twelve => 12,
            InputFormatVersion::Fourteen => 14,
        };
        if code.len() != expected_len {
            return Err(PlumeError::TimestampCode(code.to_string()));
        }

        let digits = |lo: usize, hi: usize| {
            code.get(lo..hi)
                .and_then(|field| field.parse::<u32>().ok())
                .ok_or_else(|| PlumeError::TimestampCode(code.to_string()))
        };

        let ordinal = match version {
            InputFormatVersion::Twelve => None,
            InputFormatVersion::Fourteen => Some(digits(12, 14)? as u8),
        };

        Ok(Self {
            year: digits(1, 3)? as u8,
            day: digits(3, 6)? as u16,
            hour: digits(6, 8)? as u8,
            minute: digits(8, 10)? as u8,
            second: digits(10, 12)? as u8,
            ordinal,
        })
    }
}

/// Seconds elapsed from `epoch` to `obs`, with `epoch` as the reference
/// lower bound.
///
/// Reproduces the historical borrow arithmetic exactly: year
/// first (gap assumed under one year, with a simplified `year % 4` leap
/// test), then day, hour, minute, second, each borrowing one unit from the
/// next coarser field. The leap rule ignores century exceptions and the
/// cross-year day count has not been verified against ground truth; both
/// are deliberately kept as-is for compatibility.
pub fn elapsed_seconds(obs: &Timestamp, epoch: &Timestamp) -> i64 {
    let (y, d, h, m, s) = (
        i64::from(obs.year),
        i64::from(obs.day),
        i64::from(obs.hour),
        i64::from(obs.minute),
        i64::from(obs.second),
    );
    let (y0, d0, h0, m0, s0) = (
        i64::from(epoch.year),
        i64::from(epoch.day),
        i64::from(epoch.hour),
        i64::from(epoch.minute),
        i64::from(epoch.second),
    );

    if y0 != y {
        let span_days = if y0 % 4 == 0 {
            366 - d0 + d - 2
        } else {
            365 - d0 + d - 1
        };
        ((24 - h0 + h - 1) + 24 * span_days) * 3600 + (60 - m0 + m - 1) * 60 + (60 - s0 + s)
    } else if d0 < d {
        let span_days = d - d0 - 1;
        ((24 - h0 + h - 1) + 24 * span_days) * 3600 + (60 - m0 + m - 1) * 60 + (60 - s0 + s)
    } else if h0 < h {
        (h - h0 - 1) * 3600 + (60 - m0 + m - 1) * 60 + (60 - s0 + s)
    } else if m0 < m {
        (m - m0 - 1) * 60 + (60 - s0 + s)
    } else if s0 < s {
        s - s0
    } else {
        0
    }
}
