//! Measured time-series input: two-column CSV records with a header row.

use std::io::Read;
use std::path::Path;

use crate::error::SeriesError;

/// One `(time, value)` record of a measured series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Sample time in seconds.
    pub time: f64,
    /// Sample value (watts for a power series).
    pub value: f64,
}

/// Scale factors applied independently to the time and value columns at load.
#[derive(Debug, Clone, Copy)]
pub struct SeriesScale {
    pub time: f64,
    pub value: f64,
}

impl Default for SeriesScale {
    fn default() -> Self {
        Self {
            time: 1.0,
            value: 1.0,
        }
    }
}

/// Loads a `(time, value)` series from a CSV file.
///
/// The first record is reserved as a header/label row and discarded. Remaining
/// records must hold two numeric columns with strictly increasing time, and at
/// least two data rows must remain (interpolation needs a bracketing pair).
///
/// # Errors
///
/// Returns a [`SeriesError`] on I/O failure, a malformed record, non-monotonic
/// time, or a series too short to interpolate.
pub fn load_series(path: &Path, scale: SeriesScale) -> Result<Vec<Sample>, SeriesError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| SeriesError::Io {
        path: label.clone(),
        source,
    })?;
    read_series(file, scale, &label)
}

/// Parses a series from any reader; `label` is used in error messages.
///
/// # Errors
///
/// Same conditions as [`load_series`], minus file-open failures.
pub fn read_series<R: Read>(
    reader: R,
    scale: SeriesScale,
    label: &str,
) -> Result<Vec<Sample>, SeriesError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples: Vec<Sample> = Vec::new();
    for (record, result) in rdr.records().enumerate() {
        let row = result.map_err(|_| SeriesError::Malformed {
            path: label.to_string(),
            record,
        })?;
        if record == 0 {
            continue; // header/label row
        }
        let parsed = parse_row(&row, scale);
        let Some(sample) = parsed else {
            return Err(SeriesError::Malformed {
                path: label.to_string(),
                record,
            });
        };
        if let Some(last) = samples.last()
            && sample.time <= last.time
        {
            return Err(SeriesError::NonMonotonic {
                path: label.to_string(),
                record,
            });
        }
        samples.push(sample);
    }

    if samples.len() < 2 {
        return Err(SeriesError::TooShort {
            path: label.to_string(),
        });
    }
    Ok(samples)
}

fn parse_row(row: &csv::StringRecord, scale: SeriesScale) -> Option<Sample> {
    let time: f64 = row.get(0)?.parse().ok()?;
    let value: f64 = row.get(1)?.parse().ok()?;
    Some(Sample {
        time: time * scale.time,
        value: value * scale.value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = "time,power\n0.0,0.0\n1.0,10.0\n2.0,0.0\n";

    #[test]
    fn header_row_is_discarded() {
        let samples = read_series(DATA.as_bytes(), SeriesScale::default(), "test").unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], Sample { time: 0.0, value: 0.0 });
        assert_eq!(samples[1], Sample { time: 1.0, value: 10.0 });
    }

    #[test]
    fn scales_apply_per_column() {
        let scale = SeriesScale {
            time: 2.0,
            value: 0.5,
        };
        let samples = read_series(DATA.as_bytes(), scale, "test").unwrap();
        assert_eq!(samples[1], Sample { time: 2.0, value: 5.0 });
    }

    #[test]
    fn non_monotonic_time_is_rejected() {
        let data = "t,p\n0.0,1.0\n2.0,1.0\n1.0,1.0\n";
        let err = read_series(data.as_bytes(), SeriesScale::default(), "test").unwrap_err();
        assert!(matches!(err, SeriesError::NonMonotonic { record: 3, .. }));
    }

    #[test]
    fn non_numeric_data_row_is_rejected() {
        let data = "t,p\n0.0,1.0\nbogus,1.0\n";
        let err = read_series(data.as_bytes(), SeriesScale::default(), "test").unwrap_err();
        assert!(matches!(err, SeriesError::Malformed { record: 2, .. }));
    }

    #[test]
    fn single_data_row_is_too_short() {
        let data = "t,p\n0.0,1.0\n";
        let err = read_series(data.as_bytes(), SeriesScale::default(), "test").unwrap_err();
        assert!(matches!(err, SeriesError::TooShort { .. }));
    }
}
