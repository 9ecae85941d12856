//! Error handling for wavefilter
//!
//! Configuration problems are reported when a filter is added, never
//! at first use. Numerical blow-up of a configured filter is not an error.

use thiserror::Error;

/// Result type alias for wavefilter operations
pub type Result<T> = std::result::Result<T, FilterError>;

/// Main error type for wavefilter operations
#[derive(Error, Debug)]
pub enum FilterError {
    // Construction Errors
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // Configuration Errors
    #[error("Invalid coefficients: {reason}")]
    InvalidCoefficients { reason: String },

    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Cannot configure {requested}: filter bank is already in {active} mode")]
    ModeConflict {
        requested: &'static str,
        active: &'static str,
    },

    #[error("Configuration is locked: {operation} is not allowed after streaming started")]
    ConfigurationLocked { operation: &'static str },

    #[error("Invalid stream configuration: {reason}")]
    InvalidStreamConfig { reason: String },

    // Processing Errors
    #[error("Channel mismatch: expected {expected} channel(s), block has {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Frequency bin {bin} out of range for a spectrum of {len} bins")]
    BinOutOfRange { bin: usize, len: usize },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FilterError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            FilterError::InvalidInput { .. } => "INVALID_INPUT",
            FilterError::FileNotFound { .. } => "FILE_NOT_FOUND",
            FilterError::InvalidAudio { .. } => "INVALID_AUDIO",
            FilterError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            FilterError::InvalidCoefficients { .. } => "INVALID_COEFFICIENTS",
            FilterError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            FilterError::ModeConflict { .. } => "MODE_CONFLICT",
            FilterError::ConfigurationLocked { .. } => "CONFIGURATION_LOCKED",
            FilterError::InvalidStreamConfig { .. } => "INVALID_STREAM_CONFIG",
            FilterError::ChannelMismatch { .. } => "CHANNEL_MISMATCH",
            FilterError::BinOutOfRange { .. } => "BIN_OUT_OF_RANGE",
            FilterError::Io(_) => "IO_ERROR",
            FilterError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the filter bank untouched, so the caller can
    /// fix the input and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FilterError::InvalidInput { .. }
                | FilterError::FileNotFound { .. }
                | FilterError::InvalidAudio { .. }
                | FilterError::UnsupportedFormat { .. }
                | FilterError::InvalidCoefficients { .. }
                | FilterError::ShapeMismatch { .. }
                | FilterError::ModeConflict { .. }
                | FilterError::InvalidStreamConfig { .. }
        )
    }

    pub(crate) fn shape(what: impl Into<String>, expected: impl ToString, actual: impl ToString) -> Self {
        FilterError::ShapeMismatch {
            what: what.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = FilterError::InvalidInput {
            reason: "expected a path or sample array".to_string(),
        };
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let err = FilterError::BinOutOfRange { bin: 200, len: 129 };
        assert_eq!(err.error_code(), "BIN_OUT_OF_RANGE");
    }

    #[test]
    fn test_recoverable() {
        let err = FilterError::shape("delay state", "[4, 2]", "[3, 2]");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("delay state"));

        let err = FilterError::ConfigurationLocked {
            operation: "add_filter_section",
        };
        assert!(!err.is_recoverable());
    }
}
