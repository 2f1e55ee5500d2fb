//! Logging setup for Pallas processes.
//!
//! Pallas libraries only emit `tracing` events. Binaries call [`init_logging`]
//! once at startup to install a `tracing-subscriber` registry with an
//! [`EnvFilter`](tracing_subscriber::EnvFilter) and a JSON, pretty or compact
//! formatting layer writing to stderr.
//!
//! # Example
//!
//! ```rust,ignore
//! use pallas_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), pallas_telemetry::TelemetryError> {
//!     init_logging(&LogConfig::production())?;
//!     tracing::info!("Starting");
//!     Ok(())
//! }
//! ```
//!
//! Set `PALLAS_LOG` to override the level, e.g. `PALLAS_LOG=pallas_config=debug`.

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat, LOG_ENV_VAR};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
