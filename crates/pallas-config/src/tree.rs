//! The resolved configuration tree.
//!
//! A [`ConfigTree`] is the single output of resolution: one record per active
//! subsystem plus the feature flags, the prefix allocations and the usage
//! ledger that produced it. The resolver seals the tree before returning it;
//! from then on every mutation fails with `ConfigError::ImmutableConfig`.
//! A sealed tree can be shared freely across threads behind an `Arc`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::{
    CacheSettings, CmsSettings, DatabaseSettings, EmailSettings, ErrorReportingSettings,
    HealthCheckSettings, PubSubSettings, QueueSettings, ResultStore, SecuritySettings,
    SiteSettings, SmsSettings, StorageSettings, Subsystem, SubsystemSettings,
};
use crate::{
    ConfigError, ConfigResult, Consumer, FeatureFlags, PrefixRegistry, ResourceUrl, VariableUsage,
};

/// Resolved, typed configuration.
///
/// # Example
///
/// ```
/// use pallas_config::{ConfigResolver, EnvironmentSnapshot, FeatureOverrides, StaticProbe};
///
/// let snapshot = EnvironmentSnapshot::from_pairs([
///     ("ENVIRONMENT", "ci"),
///     ("SECRET_KEY", "s3cr3t"),
///     ("DATABASE_URL", "postgres://app:pw@db/app"),
/// ]);
/// let probe = StaticProbe::new(["postgres"]);
///
/// let tree = ConfigResolver::new(&snapshot, FeatureOverrides::new(), &probe)
///     .resolve()
///     .unwrap();
///
/// assert!(tree.is_sealed());
/// assert_eq!(tree.site().unwrap().environment, "ci");
/// assert!(tree.cache().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigTree {
    records: BTreeMap<Subsystem, SubsystemSettings>,
    features: FeatureFlags,
    prefixes: PrefixRegistry,
    used_variables: BTreeMap<String, VariableUsage>,
    #[serde(skip)]
    sealed: bool,
}

macro_rules! record_accessor {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self) -> Option<&$ty> {
            match self.records.get(&Subsystem::$variant) {
                Some(SubsystemSettings::$variant(settings)) => Some(settings),
                _ => None,
            }
        }
    };
}

impl ConfigTree {
    pub(crate) fn new(features: FeatureFlags) -> Self {
        Self {
            records: BTreeMap::new(),
            features,
            prefixes: PrefixRegistry::default(),
            used_variables: BTreeMap::new(),
            sealed: false,
        }
    }

    record_accessor!(
        /// Site-wide settings. Always present.
        site, Site, SiteSettings
    );
    record_accessor!(
        /// Security settings. Always present.
        security, Security, SecuritySettings
    );
    record_accessor!(
        /// Database settings. Always present.
        database, Database, DatabaseSettings
    );
    record_accessor!(
        /// Cache settings, when the cache feature is enabled.
        cache, Cache, CacheSettings
    );
    record_accessor!(
        /// Task queue settings, when the task-queue feature is enabled.
        queue, Queue, QueueSettings
    );
    record_accessor!(
        /// Pub/sub settings, when the pub-sub feature is enabled.
        pub_sub, PubSub, PubSubSettings
    );
    record_accessor!(
        /// Object storage settings, when the storage feature is enabled.
        storage, Storage, StorageSettings
    );
    record_accessor!(
        /// Email transport. Always present.
        email, Email, EmailSettings
    );
    record_accessor!(
        /// SMS transport. Always present.
        sms, Sms, SmsSettings
    );
    record_accessor!(
        /// Content management settings, when the cms feature is enabled.
        cms, Cms, CmsSettings
    );
    record_accessor!(
        /// Health check settings, when the health-check feature is enabled.
        health_check, HealthCheck, HealthCheckSettings
    );
    record_accessor!(
        /// Error reporting, when a reporting endpoint is configured.
        error_reporting, ErrorReporting, ErrorReportingSettings
    );

    /// Record of `subsystem`, if present.
    pub fn get(&self, subsystem: Subsystem) -> Option<&SubsystemSettings> {
        self.records.get(&subsystem)
    }

    /// Whether `subsystem` has a record.
    pub fn contains(&self, subsystem: Subsystem) -> bool {
        self.records.contains_key(&subsystem)
    }

    /// Subsystems with a record, in a stable order.
    pub fn subsystems(&self) -> impl Iterator<Item = Subsystem> + '_ {
        self.records.keys().copied()
    }

    /// Feature flags the tree was resolved with.
    pub fn features(&self) -> &FeatureFlags {
        &self.features
    }

    /// Key prefixes allocated on shared resources.
    pub fn prefixes(&self) -> &PrefixRegistry {
        &self.prefixes
    }

    /// Every variable resolution consulted.
    pub fn used_variables(&self) -> &BTreeMap<String, VariableUsage> {
        &self.used_variables
    }

    /// Whether the tree is sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Add or replace a record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ImmutableConfig` once the tree is sealed.
    pub fn insert(&mut self, record: SubsystemSettings) -> ConfigResult<()> {
        let subsystem = record.subsystem();
        self.ensure_mutable(subsystem.as_str())?;
        self.records.insert(subsystem, record);
        Ok(())
    }

    /// Remove a record.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ImmutableConfig` once the tree is sealed.
    pub fn remove(&mut self, subsystem: Subsystem) -> ConfigResult<Option<SubsystemSettings>> {
        self.ensure_mutable(subsystem.as_str())?;
        Ok(self.records.remove(&subsystem))
    }

    /// Replace one top-level field of a record with a JSON value.
    ///
    /// The record is rebuilt from its JSON form, so the new value must have
    /// the field's type. The rebuilt record must still agree with how the
    /// tree was resolved: a mode's variant must match its settings, and a
    /// consumer of the shared resource must keep the prefix it was allocated.
    ///
    /// # Errors
    ///
    /// - `ConfigError::ImmutableConfig` once the tree is sealed
    /// - `ConfigError::InvalidValue` if the subsystem has no record, the field
    ///   does not exist, the value has the wrong type, or the change breaks
    ///   a mode or a prefix allocation
    pub fn set_field(
        &mut self,
        subsystem: Subsystem,
        field: &str,
        value: serde_json::Value,
    ) -> ConfigResult<()> {
        let target = format!("{subsystem}.{field}");
        self.ensure_mutable(&target)?;

        let record = self
            .records
            .get(&subsystem)
            .ok_or_else(|| ConfigError::invalid_value(&target, "subsystem is not configured"))?;

        let mut json = record.to_value()?;
        let fields = json
            .as_object_mut()
            .ok_or_else(|| ConfigError::invalid_value(&target, "record has no fields"))?;
        if !fields.contains_key(field) {
            return Err(ConfigError::invalid_value(&target, "unknown field"));
        }
        fields.insert(field.to_string(), value);

        let updated = SubsystemSettings::from_value(subsystem, json)
            .map_err(|e| match e {
                ConfigError::InvalidValue { reason, .. } => ConfigError::invalid_value(&target, reason),
                other => other,
            })?;
        updated
            .check_variant()
            .map_err(|reason| ConfigError::invalid_value(&target, reason))?;
        check_prefixes(&self.prefixes, &updated)
            .map_err(|reason| ConfigError::invalid_value(&target, reason))?;
        self.records.insert(subsystem, updated);

        tracing::debug!(field = %target, "Applied configuration override");
        Ok(())
    }

    /// Seal the tree. Idempotent.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Flat `subsystem name → JSON record` map for merging into a host's
    /// settings namespace.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a record cannot be serialized.
    pub fn to_settings_map(&self) -> ConfigResult<BTreeMap<String, serde_json::Value>> {
        self.records
            .iter()
            .map(|(subsystem, record)| {
                Ok::<_, ConfigError>((subsystem.as_str().to_string(), record.to_value()?))
            })
            .collect()
    }

    pub(crate) fn set_prefixes(&mut self, prefixes: PrefixRegistry) {
        self.prefixes = prefixes;
    }

    pub(crate) fn set_used_variables(&mut self, used: BTreeMap<String, VariableUsage>) {
        self.used_variables = used;
    }

    fn ensure_mutable(&self, target: &str) -> ConfigResult<()> {
        if self.sealed {
            return Err(ConfigError::immutable(target));
        }
        Ok(())
    }
}

/// Every place a record touches a prefixable resource.
fn prefix_slots(record: &SubsystemSettings) -> Vec<(Consumer, &ResourceUrl, Option<&str>)> {
    match record {
        SubsystemSettings::Cache(cache) => {
            vec![(Consumer::Cache, &cache.location, cache.key_prefix.as_deref())]
        }
        SubsystemSettings::Queue(queue) => {
            let mut slots = vec![(Consumer::Queue, &queue.broker_url, queue.broker_prefix.as_deref())];
            if let ResultStore::Resource { url, prefix } = &queue.result_store {
                slots.push((Consumer::QueueResults, url, prefix.as_deref()));
            }
            slots
        }
        SubsystemSettings::PubSub(pubsub) => {
            vec![(Consumer::PubSub, &pubsub.url, pubsub.prefix.as_deref())]
        }
        _ => Vec::new(),
    }
}

/// A consumer allocated on the shared resource stays there with its prefix,
/// and no other consumer joins the shared resource afterwards.
fn check_prefixes(registry: &PrefixRegistry, record: &SubsystemSettings) -> Result<(), String> {
    for (consumer, url, prefix) in prefix_slots(record) {
        match (registry.allocated(consumer), registry.is_shared(url)) {
            (Some(allocated), true) if prefix == Some(allocated) => {}
            (Some(allocated), true) => {
                return Err(format!(
                    "{consumer} must keep prefix {allocated:?} on the shared resource"
                ));
            }
            (Some(_), false) => {
                return Err(format!("{consumer} cannot leave the shared resource"));
            }
            (None, true) => {
                return Err(format!(
                    "{consumer} has no prefix allocated on the shared resource"
                ));
            }
            (None, false) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConnectionOptions, EmailTransport, HealthCheckSettings};
    use crate::{FeatureDetector, FeatureOverrides, PrefixAllocator, ResolvedMode, StaticProbe};

    fn empty_tree() -> ConfigTree {
        let probe = StaticProbe::new(["postgres", "redis"]);
        let flags = FeatureDetector::new(&probe)
            .detect(&FeatureOverrides::new())
            .unwrap();
        ConfigTree::new(flags)
    }

    fn cache_record() -> SubsystemSettings {
        SubsystemSettings::Cache(CacheSettings {
            location: ResourceUrl::parse("REDIS_URL", "redis://localhost").unwrap(),
            key_prefix: Some("ci:cache:".into()),
            options: ConnectionOptions::default(),
        })
    }

    #[test]
    fn test_insert_and_typed_access() {
        let mut tree = empty_tree();
        tree.insert(cache_record()).unwrap();

        assert!(tree.contains(Subsystem::Cache));
        assert_eq!(tree.cache().unwrap().key_prefix.as_deref(), Some("ci:cache:"));
        assert!(tree.queue().is_none());
        assert_eq!(tree.subsystems().collect::<Vec<_>>(), vec![Subsystem::Cache]);
    }

    fn shared_tree() -> ConfigTree {
        let shared = ResourceUrl::parse("REDIS_URL", "redis://localhost").unwrap();
        let mut allocator = PrefixAllocator::new("ci", &shared);
        allocator.claim(Consumer::Cache, &shared);

        let mut tree = empty_tree();
        tree.insert(cache_record()).unwrap();
        tree.set_prefixes(allocator.into_registry());
        tree
    }

    #[test]
    fn test_set_field() {
        let mut tree = shared_tree();

        let mut options = serde_json::to_value(ConnectionOptions::default()).unwrap();
        options["retry_attempts"] = serde_json::json!(3);
        tree.set_field(Subsystem::Cache, "options", options).unwrap();
        assert_eq!(tree.cache().unwrap().options.retry_attempts, 3);
    }

    #[test]
    fn test_set_field_keeps_allocated_prefix() {
        let mut tree = shared_tree();

        let err = tree
            .set_field(Subsystem::Cache, "key_prefix", serde_json::json!("ci:queue:"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "cache.key_prefix"));

        let err = tree
            .set_field(Subsystem::Cache, "location", serde_json::json!("redis://elsewhere"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "cache.location"));

        assert_eq!(tree.cache().unwrap().key_prefix.as_deref(), Some("ci:cache:"));
        assert_eq!(tree.prefixes().allocated(Consumer::Cache), Some("ci:cache:"));
    }

    #[test]
    fn test_set_field_rejects_unprefixed_consumer_on_shared_resource() {
        let mut tree = shared_tree();
        tree.insert(SubsystemSettings::PubSub(PubSubSettings {
            url: ResourceUrl::parse("PUBSUB_URL", "redis://pubsub").unwrap(),
            prefix: None,
            options: ConnectionOptions::default(),
        }))
        .unwrap();

        let err = tree
            .set_field(Subsystem::PubSub, "url", serde_json::json!("redis://localhost"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "pub_sub.url"));

        tree.set_field(Subsystem::PubSub, "url", serde_json::json!("redis://pubsub-2"))
            .unwrap();
        assert_eq!(tree.pub_sub().unwrap().url.host(), Some("pubsub-2"));
    }

    #[test]
    fn test_set_field_keeps_variant_and_settings_together() {
        let mut tree = empty_tree();
        tree.insert(SubsystemSettings::Email(ResolvedMode {
            variant: "console".into(),
            settings: EmailTransport::Console,
        }))
        .unwrap();

        let err = tree
            .set_field(Subsystem::Email, "variant", serde_json::json!("mailjet"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "email.variant"));

        let err = tree
            .set_field(Subsystem::Email, "settings", serde_json::json!({ "kind": "memory" }))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "email.settings"));

        assert_eq!(tree.email().unwrap().settings, EmailTransport::Console);
    }

    #[test]
    fn test_set_field_unknown_field() {
        let mut tree = empty_tree();
        tree.insert(cache_record()).unwrap();

        let err = tree
            .set_field(Subsystem::Cache, "nope", serde_json::json!(1))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "cache.nope"));
    }

    #[test]
    fn test_set_field_wrong_type() {
        let mut tree = empty_tree();
        tree.insert(SubsystemSettings::HealthCheck(HealthCheckSettings {
            memory_min_mb: 300,
            queue_ping_timeout_ms: None,
        }))
        .unwrap();

        let err = tree
            .set_field(Subsystem::HealthCheck, "memory_min_mb", serde_json::json!("lots"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(tree.health_check().unwrap().memory_min_mb, 300);
    }

    #[test]
    fn test_set_field_absent_subsystem() {
        let mut tree = empty_tree();
        let err = tree
            .set_field(Subsystem::Queue, "track_started", serde_json::json!(false))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_sealed_tree_rejects_mutation() {
        let mut tree = empty_tree();
        tree.insert(cache_record()).unwrap();
        tree.seal();
        let before = tree.clone();

        assert_eq!(
            tree.set_field(Subsystem::Cache, "key_prefix", serde_json::json!("x:")),
            Err(ConfigError::immutable("cache.key_prefix"))
        );
        assert_eq!(tree.insert(cache_record()), Err(ConfigError::immutable("cache")));
        assert_eq!(tree.remove(Subsystem::Cache), Err(ConfigError::immutable("cache")));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_settings_map_keys() {
        let mut tree = empty_tree();
        tree.insert(cache_record()).unwrap();

        let map = tree.to_settings_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["cache"]);
        assert_eq!(map["cache"]["options"]["retry_attempts"], 100);
    }

    #[test]
    fn test_tree_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConfigTree>();
    }
}
