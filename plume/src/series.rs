use crate::{
    clock::Timestamp,
    constants::{CELSIUS_TO_K, FEET_TO_M, KNOTS_TO_MPS},
    PlumeError,
};
use log::debug;
use std::io::BufRead;

/// Which historical table/timestamp layout a file uses.
///
/// The two layouts are incompatible (column count, unit conventions, code
/// width), so the caller must pick one explicitly; nothing here guesses
/// from file contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormatVersion {
    /// 12 columns; heights in meters, temperatures in Kelvin, wind in
    /// knots; 12-character timestamp codes.
    Twelve,

    /// 14 columns, adding virtual potential temperature and a per-row image
    /// ordinal; heights in feet, temperatures in Celsius, wind in knots;
    /// 14-character timestamp codes carrying the ordinal.
    Fourteen,
}

/// One time-indexed record of cloud geometry and sounding data, already in
/// pipeline units (km, km², m, K, hPa, m/s).
#[derive(Clone, Debug)]
pub struct Observation {
    /// Raw timestamp code, as read.
    pub code: String,

    pub timestamp: Timestamp,

    /// Cloud footprint area, km².
    pub area_km2: f64,

    /// Footprint diameters, km.
    pub d1_km: f64,
    pub d2_km: f64,

    /// Plume spreading height at neutral buoyancy, m.
    pub plume_height_m: f64,

    /// Brightness temperature at the spreading level, K.
    pub brightness_temp_k: f64,

    /// Sounding pressure at the spreading height, hPa.
    pub plume_pressure_hpa: f64,

    /// Maximum plume height, m.
    pub max_height_m: f64,

    /// Temperature at maximum plume height, K.
    pub max_height_temp_k: f64,

    /// Sounding pressure at maximum plume height, hPa.
    pub max_height_pressure_hpa: f64,

    /// Height of the wind measurement, m.
    pub wind_height_m: f64,

    /// Wind speed, m/s (converted from knots at ingestion).
    pub wind_mps: f64,

    /// Virtual potential temperature, K; fourteen-column data only.
    pub virtual_potential_temp_k: Option<f64>,
}

/// Reads an observation table: one header line, then one whitespace- or
/// comma-delimited row per observation in the fixed column order of
/// `version`. Unit conversions (feet, Celsius, knots) happen here; nothing
/// downstream converts units. Only the trailing `tail_rows` rows of a
/// longer table are kept, the historical acquisition-window convention.
///
/// # Errors
///
/// Wrong column counts and unparseable fields fail with the 1-based row
/// number and the offending field; out-of-order timestamps fail with both
/// codes.
pub fn read_observations<R: BufRead>(
    reader: R,
    version: InputFormatVersion,
    tail_rows: usize,
) -> Result<Vec<Observation>, PlumeError> {
    let expected_columns = match version {
        InputFormatVersion::Twelve => 12,
        InputFormatVersion::Fourteen => 14,
    };

    let mut rows = Vec::new();
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line_idx == 0 || line.trim().is_empty() {
            continue;
        }
        let row = line_idx + 1;

        let fields: Vec<&str> = if line.contains(',') {
            line.split(',').map(str::trim).collect()
        } else {
            line.split_whitespace().collect()
        };
        if fields.len() != expected_columns {
            return Err(PlumeError::Table {
                row,
                reason: format!("{} columns, expected {expected_columns}", fields.len()),
            });
        }

        let number = |column: usize| -> Result<f64, PlumeError> {
            fields[column].parse::<f64>().map_err(|_| PlumeError::Table {
                row,
                reason: format!("column {} is not a number: {:?}", column + 1, fields[column]),
            })
        };

        let code = fields[0].to_string();
        let timestamp = Timestamp::parse(&code, version)?;

        let observation = match version {
            InputFormatVersion::Twelve => Observation {
                code,
                timestamp,
                area_km2: number(1)?,
                d1_km: number(2)?,
                d2_km: number(3)?,
                plume_height_m: number(4)?,
                brightness_temp_k: number(5)?,
                plume_pressure_hpa: number(6)?,
                max_height_m: number(7)?,
                max_height_temp_k: number(8)?,
                max_height_pressure_hpa: number(9)?,
                wind_height_m: number(10)?,
                wind_mps: number(11)? * KNOTS_TO_MPS,
                virtual_potential_temp_k: None,
            },
            InputFormatVersion::Fourteen => {
                let row_ordinal = number(13)? as u8;
                if timestamp.ordinal != Some(row_ordinal) {
                    return Err(PlumeError::Table {
                        row,
                        reason: format!(
                            "image ordinal column ({row_ordinal}) disagrees with timestamp code {:?}",
                            fields[0]
                        ),
                    });
                }
                Observation {
                    code,
                    timestamp,
                    area_km2: number(1)?,
                    d1_km: number(2)?,
                    d2_km: number(3)?,
                    plume_height_m: number(4)? * FEET_TO_M,
                    brightness_temp_k: number(5)? + CELSIUS_TO_K,
                    plume_pressure_hpa: number(6)?,
                    max_height_m: number(7)? * FEET_TO_M,
                    max_height_temp_k: number(8)? + CELSIUS_TO_K,
                    max_height_pressure_hpa: number(9)?,
                    wind_height_m: number(10)? * FEET_TO_M,
                    wind_mps: number(11)? * KNOTS_TO_MPS,
                    virtual_potential_temp_k: Some(number(12)? + CELSIUS_TO_K),
                }
            }
        };
        rows.push((row, observation));
    }

    // Timestamps must arrive in chronological order. The only year change
    // allowed is a rollover to the next year (mod 100 for the two-digit
    // wrap); the elapsed-seconds arithmetic assumes gaps under a year.
    for pair in rows.windows(2) {
        let (_, prev) = &pair[0];
        let (row, next) = &pair[1];
        let ordered = if next.timestamp.year == prev.timestamp.year {
            component_key(&next.timestamp) >= component_key(&prev.timestamp)
        } else {
            next.timestamp.year == (prev.timestamp.year + 1) % 100
        };
        if !ordered {
            return Err(PlumeError::TimestampOrder {
                row: *row,
                prev: prev.code.clone(),
                next: next.code.clone(),
            });
        }
    }

    if rows.len() > tail_rows {
        debug!(
            "table has {} rows; keeping the trailing {tail_rows} per the acquisition window",
            rows.len()
        );
        rows.drain(..rows.len() - tail_rows);
    }

    Ok(rows.into_iter().map(|(_, observation)| observation).collect())
}

fn component_key(t: &Timestamp) -> (u16, u8, u8, u8) {
    (t.day, t.hour, t.minute, t.second)
}

#[cfg(test)]
mod tests {
    use super::{read_observations, InputFormatVersion};
    use crate::PlumeError;
    use approx::assert_relative_eq;

    const HEADER: &str =
        "time area d1 d2 ph tb pp maxph maxt pmax z uk\n";

    fn twelve_row(code: &str, area: f64) -> String {
        format!("{code} {area} 10.0 9.0 9000 240 300 11000 235 250 10000 20\n")
    }

    #[test]
    fn reads_twelve_column_rows() {
        let table = format!(
            "{HEADER}{}{}",
            twelve_row("B23100120000", 5.0),
            twelve_row("B23100130000", 7.0)
        );
        let observations =
            read_observations(table.as_bytes(), InputFormatVersion::Twelve, 15).unwrap();
        assert_eq!(observations.len(), 2);
        assert_relative_eq!(observations[0].area_km2, 5.0);
        assert_relative_eq!(observations[0].wind_mps, 20.0 * 0.514444);
        assert_eq!(observations[1].timestamp.hour, 13);
        assert!(observations[0].virtual_potential_temp_k.is_none());
    }

    #[test]
    fn reads_comma_delimited_fourteen_column_rows() {
        let table = "h1,h2,h3,h4,h5,h6,h7,h8,h9,h10,h11,h12,h13,h14\n\
                     B2310012000001,5.0,10.0,9.0,29527,-33.15,300,36089,-38.15,250,32808,20,-20.15,1\n";
        let observations =
            read_observations(table.as_bytes(), InputFormatVersion::Fourteen, 15).unwrap();
        let first = &observations[0];
        assert_relative_eq!(first.plume_height_m, 29_527.0 * 0.3048);
        assert_relative_eq!(first.brightness_temp_k, 240.0);
        assert_relative_eq!(first.max_height_temp_k, 235.0);
        assert_relative_eq!(first.virtual_potential_temp_k.unwrap(), 253.0);
        assert_eq!(first.timestamp.ordinal, Some(1));
    }

    #[test]
    fn tail_window_keeps_trailing_rows() {
        let mut table = HEADER.to_string();
        for hour in 0..20 {
            table.push_str(&twelve_row(&format!("B23100{hour:02}0000", ), f64::from(hour)));
        }
        let observations =
            read_observations(table.as_bytes(), InputFormatVersion::Twelve, 15).unwrap();
        assert_eq!(observations.len(), 15);
        // Rows 0..5 were dropped from the front.
        assert_relative_eq!(observations[0].area_km2, 5.0);
    }

    #[test]
    fn wrong_column_count_names_the_row() {
        let table = format!("{HEADER}B23100120000 5.0 10.0\n");
        match read_observations(table.as_bytes(), InputFormatVersion::Twelve, 15) {
            Err(PlumeError::Table { row: 2, .. }) => (),
            other => panic!("expected table error, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_field_names_the_column() {
        let table = format!("{HEADER}B23100120000 5.0 ten 9.0 9000 240 300 11000 235 250 10000 20\n");
        match read_observations(table.as_bytes(), InputFormatVersion::Twelve, 15) {
            Err(PlumeError::Table { row: 2, reason }) => {
                assert!(reason.contains("column 3"), "{reason}");
            }
            other => panic!("expected table error, got {other:?}"),
        }
    }

    #[test]
    fn backward_year_is_rejected() {
        let table = format!(
            "{HEADER}{}{}",
            twelve_row("B23100120000", 5.0),
            twelve_row("B22100130000", 7.0)
        );
        match read_observations(table.as_bytes(), InputFormatVersion::Twelve, 15) {
            Err(PlumeError::TimestampOrder { row: 3, .. }) => (),
            other => panic!("expected order error, got {other:?}"),
        }
    }

    #[test]
    fn rollover_to_the_next_year_is_accepted() {
        let table = format!(
            "{HEADER}{}{}{}",
            twelve_row("B99365230000", 5.0),
            twelve_row("B00001010000", 7.0),
            twelve_row("B00001020000", 9.0)
        );
        let observations =
            read_observations(table.as_bytes(), InputFormatVersion::Twelve, 15).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[1].timestamp.year, 0);
    }

    #[test]
    fn out_of_order_timestamps_are_rejected() {
        let table = format!(
            "{HEADER}{}{}",
            twelve_row("B23100130000", 5.0),
            twelve_row("B23100120000", 7.0)
        );
        match read_observations(table.as_bytes(), InputFormatVersion::Twelve, 15) {
            Err(PlumeError::TimestampOrder { row: 3, .. }) => (),
            other => panic!("expected order error, got {other:?}"),
        }
    }
}
