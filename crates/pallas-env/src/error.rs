//! Error types for the `pallas-env` command.

use pallas_config::ConfigError;
use pallas_telemetry::TelemetryError;
use thiserror::Error;

/// Command errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Unrecognized command-line argument.
    #[error("unknown argument: {argument}")]
    UnknownArgument {
        /// The argument as given.
        argument: String,
    },

    /// A flag that takes a value was given without one.
    #[error("{flag} requires a value")]
    MissingValue {
        /// The flag.
        flag: String,
    },

    /// A flag value could not be parsed.
    #[error("invalid value for {flag}: {reason}")]
    InvalidValue {
        /// The flag.
        flag: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging setup failed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create an unknown argument error.
    pub fn unknown_argument(argument: impl Into<String>) -> Self {
        Self::UnknownArgument {
            argument: argument.into(),
        }
    }

    /// Create a missing value error.
    pub fn missing_value(flag: impl Into<String>) -> Self {
        Self::MissingValue { flag: flag.into() }
    }

    /// Create an invalid value error.
    pub fn invalid_value(flag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            flag: flag.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a usage problem rather than a configuration problem.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::UnknownArgument { .. } | Self::MissingValue { .. } | Self::InvalidValue { .. }
        )
    }
}

/// Result type for command operations.
pub type CliResult<T> = Result<T, CliError>;
