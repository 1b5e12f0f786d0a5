//! Error types for configuration, data loading, and circuit misuse.

use thiserror::Error;

/// Rejected operation on an electrical node.
///
/// Exhaustion of a measured series and under-determined reads are *not* errors:
/// they surface as `None` returns and are handled by each component as a normal
/// termination signal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CircuitError {
    /// A write would fix a third electrical quantity when two are already set.
    #[error("load write rejected: {quantity} is already determined by the other two quantities")]
    OverDeterminedLoad {
        /// The quantity the caller tried to set (`"current"`, `"voltage"`, `"resistance"`).
        quantity: &'static str,
    },
}

/// Failure while loading a measured time series.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// Underlying file could not be read.
    #[error("cannot read series \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// A record did not parse as two numeric columns.
    #[error("series \"{path}\" record {record}: expected two numeric columns")]
    Malformed { path: String, record: usize },
    /// Sample times must be strictly increasing.
    #[error("series \"{path}\" record {record}: time is not strictly increasing")]
    NonMonotonic { path: String, record: usize },
    /// Fewer than two data rows after the header; no bracketing pair exists.
    #[error("series \"{path}\": at least two data rows are required")]
    TooShort { path: String },
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field} — {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.period"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_determined_display_names_quantity() {
        let err = CircuitError::OverDeterminedLoad {
            quantity: "voltage",
        };
        let msg = format!("{err}");
        assert!(msg.contains("voltage"));
    }

    #[test]
    fn config_error_display_has_field_path() {
        let err = ConfigError::new("simulation.period", "must be > 0");
        let msg = format!("{err}");
        assert!(msg.contains("simulation.period"));
        assert!(msg.contains("must be > 0"));
    }
}
