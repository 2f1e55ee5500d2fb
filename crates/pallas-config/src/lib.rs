//! Environment-driven configuration resolution for Pallas servers.
//!
//! A server process describes its deployment through environment variables.
//! This crate turns an [`EnvironmentSnapshot`] of those variables into a
//! sealed, typed [`ConfigTree`] in one deterministic pass:
//!
//! - [`EnvReader`] - typed, recording access to the snapshot
//! - [`FeatureDetector`] - decides which optional subsystems are active
//! - [`ModeSwitch`] - picks exactly one backend for a category (storage
//!   provider, email transport, SMS transport)
//! - [`PrefixAllocator`] - namespaces subsystems sharing one resource
//! - [`ConfigResolver`] - orchestrates all of the above and seals the tree
//!
//! Every problem is reported as a [`ConfigError`] before any subsystem starts.
//! There is no partial success.
//!
//! # Example
//!
//! ```
//! use pallas_config::{ConfigResolver, EnvironmentSnapshot, FeatureOverrides, StaticProbe};
//!
//! # fn main() -> Result<(), pallas_config::ConfigError> {
//! let snapshot = EnvironmentSnapshot::from_pairs([
//!     ("ENVIRONMENT", "production"),
//!     ("SECRET_KEY", "s3cr3t"),
//!     ("DATABASE_URL", "postgres://app:pw@db.internal:5432/app"),
//!     ("REDIS_URL", "redis://cache.internal:6379/0"),
//! ]);
//! let probe = StaticProbe::new(["postgres", "redis"]);
//!
//! let tree = ConfigResolver::new(&snapshot, FeatureOverrides::new(), &probe).resolve()?;
//!
//! let cache = tree.cache().expect("cache is installed");
//! assert_eq!(cache.key_prefix.as_deref(), Some("production:cache:"));
//! assert_eq!(tree.database().map(|db| db.port), Some(Some(5432)));
//! # Ok(())
//! # }
//! ```
//!
//! # Environment variables
//!
//! The full vocabulary is listed in [`vars`]. Boolean variables accept
//! `true`/`yes`/`1` and `false`/`no`/`0` in any case; empty values count as
//! unset.
//!
//! # Contexts
//!
//! [`ResolveContext::Build`] lets image builds resolve without secrets by
//! substituting documented placeholders. [`ResolveContext::Test`] forces the
//! outbound email and SMS transports to their in-memory variants.

#![warn(missing_docs)]

mod error;
mod features;
mod mode;
mod prefix;
mod reader;
mod resolver;
mod resource;
mod schema;
mod snapshot;
mod tree;
pub mod vars;

pub use error::{ConfigError, ConfigResult};
pub use features::{
    DatabaseDriver, DependencyProbe, Feature, FeatureDetector, FeatureFlags, FeatureOverrides,
    StaticProbe,
};
pub use mode::{ModeSwitch, ResolvedMode, SelectedVariant};
pub use prefix::{Consumer, PrefixAllocator, PrefixRegistry};
pub use reader::{parse_bool, EnvReader, ResolveContext, VariableUsage};
pub use resolver::{resolve, ConfigResolver, ResolverOptions, DEFAULT_REDIS_URL};
pub use resource::ResourceUrl;
pub use schema::*;
pub use snapshot::EnvironmentSnapshot;
pub use tree::ConfigTree;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_shorthand_matches_resolver() {
        let snapshot = EnvironmentSnapshot::from_pairs([
            ("ENVIRONMENT", "ci"),
            ("SECRET_KEY", "x"),
            ("DATABASE_URL", "postgres://u:p@host/db"),
        ]);
        let probe = StaticProbe::new(["postgres"]);

        let a = resolve(&snapshot, FeatureOverrides::new(), &probe).unwrap();
        let b = ConfigResolver::new(&snapshot, FeatureOverrides::new(), &probe)
            .resolve()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sealed_tree_is_shareable() {
        let snapshot = EnvironmentSnapshot::from_pairs([
            ("ENVIRONMENT", "ci"),
            ("SECRET_KEY", "x"),
            ("DATABASE_URL", "postgres://u:p@host/db"),
        ]);
        let probe = StaticProbe::new(["postgres"]);
        let tree = std::sync::Arc::new(resolve(&snapshot, FeatureOverrides::new(), &probe).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tree = std::sync::Arc::clone(&tree);
                std::thread::spawn(move || tree.site().map(|s| s.environment.clone()))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some("ci"));
        }
    }
}
