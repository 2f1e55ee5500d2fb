//! Optional subsystem detection.
//!
//! Which subsystems a process runs with is decided once, before any settings
//! are built: an explicit override from the host wins, otherwise a subsystem
//! is on when every component it needs is installed. Installation is reported
//! by an injected [`DependencyProbe`], so availability is an ordinary input
//! rather than something discovered halfway through resolution.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// An optional subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    /// Key/value cache on the shared resource.
    Cache,
    /// Background task queue.
    TaskQueue,
    /// Pub/sub layer for push channels.
    PubSub,
    /// Content management layer.
    Cms,
    /// Object storage for uploaded files.
    Storage,
    /// Health check endpoints.
    HealthCheck,
}

impl Feature {
    /// All features, in resolution order.
    pub const ALL: [Feature; 6] = [
        Feature::Cache,
        Feature::TaskQueue,
        Feature::PubSub,
        Feature::Cms,
        Feature::Storage,
        Feature::HealthCheck,
    ];

    /// Stable identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Cache => "cache",
            Feature::TaskQueue => "task-queue",
            Feature::PubSub => "pub-sub",
            Feature::Cms => "cms",
            Feature::Storage => "storage",
            Feature::HealthCheck => "health-check",
        }
    }

    /// Components that must be installed for the feature to run.
    pub fn components(self) -> &'static [&'static str] {
        match self {
            Feature::Cache => &["redis"],
            Feature::TaskQueue => &["task-queue", "redis"],
            Feature::PubSub => &["pubsub", "redis"],
            Feature::Cms => &["cms"],
            Feature::Storage => &["storage"],
            Feature::HealthCheck => &["health-check"],
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Feature::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| {
                ConfigError::unknown_variant("feature", s, Feature::ALL.map(Feature::as_str))
            })
    }
}

/// Database driver variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// Plain PostgreSQL.
    Postgres,
    /// PostgreSQL with the PostGIS geographic extension.
    Postgis,
}

impl DatabaseDriver {
    /// All drivers.
    pub const ALL: [DatabaseDriver; 2] = [DatabaseDriver::Postgres, DatabaseDriver::Postgis];

    /// Stable identifier, also the component name a probe reports.
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseDriver::Postgres => "postgres",
            DatabaseDriver::Postgis => "postgis",
        }
    }

    /// Backend module the host should load for this driver.
    pub fn engine(self) -> &'static str {
        match self {
            DatabaseDriver::Postgres => "postgresql",
            DatabaseDriver::Postgis => "postgis",
        }
    }
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseDriver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DatabaseDriver::Postgres),
            "postgis" => Ok(DatabaseDriver::Postgis),
            _ => Err(ConfigError::unknown_variant(
                "database driver",
                s,
                DatabaseDriver::ALL.map(DatabaseDriver::as_str),
            )),
        }
    }
}

/// Tells the detector which components are installed in this process.
pub trait DependencyProbe {
    /// Whether `component` is installed.
    fn is_installed(&self, component: &str) -> bool;
}

/// A probe answering from a fixed set of component names.
///
/// Hosts usually build it from their own cargo features:
///
/// ```
/// use pallas_config::StaticProbe;
///
/// let probe = StaticProbe::new(["postgres"])
///     .with_if(cfg!(feature = "queue"), ["task-queue", "redis"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticProbe {
    installed: BTreeSet<String>,
}

impl StaticProbe {
    /// Probe reporting exactly `components` as installed.
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            installed: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Add `components` when `condition` holds.
    pub fn with_if<I, S>(mut self, condition: bool, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if condition {
            self.installed.extend(components.into_iter().map(Into::into));
        }
        self
    }
}

impl DependencyProbe for StaticProbe {
    fn is_installed(&self, component: &str) -> bool {
        self.installed.contains(component)
    }
}

/// Explicit feature decisions supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureOverrides {
    features: BTreeMap<Feature, bool>,
    driver: Option<DatabaseDriver>,
}

impl FeatureOverrides {
    /// No overrides: everything is auto-detected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a feature on.
    pub fn enable(mut self, feature: Feature) -> Self {
        self.features.insert(feature, true);
        self
    }

    /// Force a feature off.
    pub fn disable(mut self, feature: Feature) -> Self {
        self.features.insert(feature, false);
        self
    }

    /// Set a feature explicitly.
    pub fn set(mut self, feature: Feature, enabled: bool) -> Self {
        self.features.insert(feature, enabled);
        self
    }

    /// Pick the database driver explicitly.
    pub fn driver(mut self, driver: DatabaseDriver) -> Self {
        self.driver = Some(driver);
        self
    }

    /// The explicit decision for `feature`, if any.
    pub fn get(&self, feature: Feature) -> Option<bool> {
        self.features.get(&feature).copied()
    }
}

/// The frozen outcome of feature detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    enabled: BTreeSet<Feature>,
    drivers: BTreeSet<DatabaseDriver>,
    requested_driver: Option<DatabaseDriver>,
}

impl FeatureFlags {
    /// Whether `feature` is on.
    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }

    /// Enabled features in a stable order.
    pub fn enabled(&self) -> impl Iterator<Item = Feature> + '_ {
        self.enabled.iter().copied()
    }

    /// Database drivers the probe reported as installed.
    pub fn available_drivers(&self) -> &BTreeSet<DatabaseDriver> {
        &self.drivers
    }

    /// Driver explicitly requested by the host, if any.
    pub fn requested_driver(&self) -> Option<DatabaseDriver> {
        self.requested_driver
    }
}

/// Computes [`FeatureFlags`] from overrides and a probe.
pub struct FeatureDetector<'p> {
    probe: &'p dyn DependencyProbe,
}

impl<'p> FeatureDetector<'p> {
    /// Create a detector backed by `probe`.
    pub fn new(probe: &'p dyn DependencyProbe) -> Self {
        Self { probe }
    }

    /// Decide every feature.
    ///
    /// Storage has no availability signal of its own worth trusting: it only
    /// auto-enables alongside the CMS layer, which is what stores uploads.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingDependency` when a feature (or the driver)
    /// is explicitly requested but one of its components is not installed.
    pub fn detect(&self, overrides: &FeatureOverrides) -> ConfigResult<FeatureFlags> {
        let mut enabled = BTreeSet::new();

        for feature in Feature::ALL {
            let on = match overrides.get(feature) {
                Some(true) => {
                    self.require(feature)?;
                    true
                }
                Some(false) => false,
                None => {
                    let available = self.missing_component(feature).is_none();
                    match feature {
                        Feature::Storage => available && enabled.contains(&Feature::Cms),
                        _ => available,
                    }
                }
            };

            tracing::debug!(feature = %feature, enabled = on, explicit = overrides.get(feature).is_some(), "Feature detected");
            if on {
                enabled.insert(feature);
            }
        }

        let drivers: BTreeSet<_> = DatabaseDriver::ALL
            .into_iter()
            .filter(|d| self.probe.is_installed(d.as_str()))
            .collect();

        if let Some(driver) = overrides.driver {
            if !drivers.contains(&driver) {
                return Err(ConfigError::missing_dependency(
                    format!("database driver {driver}"),
                    driver.as_str(),
                ));
            }
        }

        Ok(FeatureFlags {
            enabled,
            drivers,
            requested_driver: overrides.driver,
        })
    }

    fn require(&self, feature: Feature) -> ConfigResult<()> {
        match self.missing_component(feature) {
            Some(component) => Err(ConfigError::missing_dependency(feature.as_str(), component)),
            None => Ok(()),
        }
    }

    fn missing_component(&self, feature: Feature) -> Option<&'static str> {
        feature
            .components()
            .iter()
            .copied()
            .find(|c| !self.probe.is_installed(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn everything() -> StaticProbe {
        StaticProbe::new([
            "redis",
            "task-queue",
            "pubsub",
            "cms",
            "storage",
            "health-check",
            "postgres",
        ])
    }

    #[test]
    fn test_auto_detection() {
        let probe = StaticProbe::new(["redis", "task-queue"]);
        let flags = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new())
            .unwrap();

        assert!(flags.is_enabled(Feature::Cache));
        assert!(flags.is_enabled(Feature::TaskQueue));
        assert!(!flags.is_enabled(Feature::PubSub));
        assert!(!flags.is_enabled(Feature::Cms));
    }

    #[test]
    fn test_partial_components_disable_feature() {
        let probe = StaticProbe::new(["task-queue"]);
        let flags = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new())
            .unwrap();
        assert!(!flags.is_enabled(Feature::TaskQueue));
    }

    #[test]
    fn test_explicit_disable_wins() {
        let probe = everything();
        let flags = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new().disable(Feature::TaskQueue))
            .unwrap();
        assert!(!flags.is_enabled(Feature::TaskQueue));
        assert!(flags.is_enabled(Feature::Cache));
    }

    #[test]
    fn test_explicit_enable_without_dependency() {
        let probe = StaticProbe::new(["task-queue"]);
        let err = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new().enable(Feature::TaskQueue))
            .unwrap_err();
        assert_eq!(err, ConfigError::missing_dependency("task-queue", "redis"));
    }

    #[test]
    fn test_storage_follows_cms() {
        let probe = StaticProbe::new(["storage"]);
        let flags = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new())
            .unwrap();
        assert!(!flags.is_enabled(Feature::Storage));

        let probe = StaticProbe::new(["storage", "cms"]);
        let flags = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new())
            .unwrap();
        assert!(flags.is_enabled(Feature::Storage));

        let probe = StaticProbe::new(["storage"]);
        let flags = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new().enable(Feature::Storage))
            .unwrap();
        assert!(flags.is_enabled(Feature::Storage));
    }

    #[test]
    fn test_drivers() {
        let probe = StaticProbe::new(["postgres", "postgis"]);
        let flags = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new().driver(DatabaseDriver::Postgis))
            .unwrap();
        assert_eq!(flags.available_drivers().len(), 2);
        assert_eq!(flags.requested_driver(), Some(DatabaseDriver::Postgis));

        let probe = StaticProbe::new(["postgres"]);
        let err = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new().driver(DatabaseDriver::Postgis))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDependency { .. }));
    }

    #[test]
    fn test_feature_from_str() {
        assert_eq!("task-queue".parse::<Feature>().unwrap(), Feature::TaskQueue);
        assert_eq!("TASK_QUEUE".parse::<Feature>().unwrap(), Feature::TaskQueue);
        assert_eq!("health-check".parse::<Feature>().unwrap(), Feature::HealthCheck);
        assert!(matches!(
            "queue".parse::<Feature>(),
            Err(ConfigError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn test_driver_from_str() {
        assert_eq!("postgresql".parse::<DatabaseDriver>().unwrap(), DatabaseDriver::Postgres);
        assert_eq!("PostGIS".parse::<DatabaseDriver>().unwrap(), DatabaseDriver::Postgis);
        assert!("mysql".parse::<DatabaseDriver>().is_err());
    }
}
