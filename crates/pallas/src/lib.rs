//! # Pallas
//!
//! **Environment-driven settings presets for server processes**
//!
//! Pallas turns a deployment's environment variables into a sealed, typed
//! configuration tree covering the database, cache, task queue, pub/sub,
//! object storage, email, SMS, content management, health checks and error
//! reporting. Every problem is reported before anything starts.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pallas::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     pallas::telemetry::init_logging(&LogConfig::production())?;
//!
//!     let probe = StaticProbe::new(["postgres", "redis"])
//!         .with_if(cfg!(feature = "queue"), ["task-queue"]);
//!     let config = pallas::configure(FeatureOverrides::new(), &probe)?;
//!
//!     if let Some(cache) = config.cache() {
//!         println!("cache keys start with {:?}", cache.key_prefix);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Resolution
//!
//! ```text
//! environment ─▶ EnvironmentSnapshot ─▶ ConfigResolver ─▶ ConfigTree (sealed)
//!                                          │
//!                  FeatureDetector ◀───────┤
//!                  ModeSwitch      ◀───────┤
//!                  PrefixAllocator ◀───────┘
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

// Re-export the configuration engine
pub use pallas_config as config;

// Re-export logging setup
pub use pallas_telemetry as telemetry;

use pallas_config::{
    ConfigResolver, ConfigResult, ConfigTree, DependencyProbe, EnvironmentSnapshot,
    FeatureOverrides,
};

/// Resolve the process environment, including `.env` in the working
/// directory, into a shareable tree.
///
/// # Errors
///
/// Returns the first `ConfigError` found; see
/// [`ConfigResolver::resolve`](pallas_config::ConfigResolver::resolve).
pub fn configure(
    overrides: FeatureOverrides,
    probe: &dyn DependencyProbe,
) -> ConfigResult<Arc<ConfigTree>> {
    let snapshot = EnvironmentSnapshot::capture_with_dotenv()?;
    configure_from(&snapshot, overrides, probe)
}

/// Resolve an explicit snapshot into a shareable tree.
///
/// # Errors
///
/// Returns the first `ConfigError` found.
pub fn configure_from(
    snapshot: &EnvironmentSnapshot,
    overrides: FeatureOverrides,
    probe: &dyn DependencyProbe,
) -> ConfigResult<Arc<ConfigTree>> {
    let tree = ConfigResolver::new(snapshot, overrides, probe).resolve()?;
    tracing::debug!(subsystems = tree.subsystems().count(), "Configuration ready");
    Ok(Arc::new(tree))
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use pallas::prelude::*;
/// ```
pub mod prelude {
    pub use pallas_config::{
        ConfigError, ConfigResolver, ConfigResult, ConfigTree, DatabaseDriver, DependencyProbe,
        EnvironmentSnapshot, Feature, FeatureOverrides, ResolveContext, StaticProbe, Subsystem,
    };

    // Re-export settings records
    pub use pallas_config::{
        CacheSettings, CmsSettings, DatabaseSettings, EmailTransport, ErrorReportingSettings,
        HealthCheckSettings, PubSubSettings, QueueSettings, SecuritySettings, SiteSettings,
        SmsTransport, StorageProvider, StorageSettings,
    };

    // Re-export logging setup
    pub use pallas_telemetry::{init_logging, LogConfig, LogFormat};
}
