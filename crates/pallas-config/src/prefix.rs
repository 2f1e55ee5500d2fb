//! Key namespaces for subsystems sharing one resource.
//!
//! When the cache, the task queue and the pub/sub layer all point at the same
//! connection string they write into one key space. Each of them gets a fixed
//! prefix derived from its own identity so their keys never collide. A
//! consumer configured with a resource of its own is left alone.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ResourceUrl;

/// A subsystem that may write into the shared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Consumer {
    /// The key/value cache.
    Cache,
    /// The task-queue broker.
    Queue,
    /// The task-queue result store.
    QueueResults,
    /// The pub/sub layer.
    PubSub,
}

impl Consumer {
    /// Stable identity used in the prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Consumer::Cache => "cache",
            Consumer::Queue => "queue",
            Consumer::QueueResults => "queue-results",
            Consumer::PubSub => "pubsub",
        }
    }
}

impl fmt::Display for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allocations made on shared resources: resource URL → consumer → prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRegistry {
    shared: Option<String>,
    allocations: BTreeMap<String, BTreeMap<Consumer, String>>,
}

impl PrefixRegistry {
    /// The shared resource prefixes were allocated on, if one was set up.
    pub fn shared(&self) -> Option<&str> {
        self.shared.as_deref()
    }

    /// Whether `resource` is the shared resource.
    pub fn is_shared(&self, resource: &ResourceUrl) -> bool {
        self.shared.as_deref() == Some(resource.as_str())
    }

    /// Prefix allocated to `consumer` on the shared resource, if any.
    pub fn allocated(&self, consumer: Consumer) -> Option<&str> {
        self.shared
            .as_ref()
            .and_then(|shared| self.allocations.get(shared))
            .and_then(|consumers| consumers.get(&consumer))
            .map(String::as_str)
    }

    /// Prefix allocated to `consumer` on `resource`, if any.
    pub fn get(&self, resource: &ResourceUrl, consumer: Consumer) -> Option<&str> {
        self.allocations
            .get(resource.as_str())
            .and_then(|consumers| consumers.get(&consumer))
            .map(String::as_str)
    }

    /// Consumers sharing `resource`, with their prefixes.
    pub fn consumers(&self, resource: &ResourceUrl) -> Option<&BTreeMap<Consumer, String>> {
        self.allocations.get(resource.as_str())
    }

    /// Whether nothing was allocated.
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

/// Hands out prefixes on one shared resource.
///
/// # Example
///
/// ```
/// use pallas_config::{Consumer, PrefixAllocator, ResourceUrl};
///
/// let shared = ResourceUrl::parse("REDIS_URL", "redis://localhost").unwrap();
/// let own = ResourceUrl::parse("QUEUE_BROKER_URL", "redis://broker").unwrap();
///
/// let mut allocator = PrefixAllocator::new("production", &shared);
/// assert_eq!(allocator.claim(Consumer::Cache, &shared).as_deref(), Some("production:cache:"));
/// assert_eq!(allocator.claim(Consumer::Queue, &own), None);
/// ```
#[derive(Debug)]
pub struct PrefixAllocator<'a> {
    namespace: &'a str,
    shared: &'a ResourceUrl,
    registry: PrefixRegistry,
}

impl<'a> PrefixAllocator<'a> {
    /// Allocator for `shared`, scoping every prefix under `namespace`
    /// (the deployment environment name).
    pub fn new(namespace: &'a str, shared: &'a ResourceUrl) -> Self {
        Self {
            namespace,
            shared,
            registry: PrefixRegistry {
                shared: Some(shared.as_str().to_string()),
                allocations: BTreeMap::new(),
            },
        }
    }

    /// The prefix `consumer` gets on any shared resource in this namespace.
    ///
    /// Depends only on the namespace and the consumer identity.
    pub fn prefix_for(namespace: &str, consumer: Consumer) -> String {
        format!("{namespace}:{}:", consumer.as_str())
    }

    /// Claim a prefix for `consumer`, which is configured to use `url`.
    ///
    /// Returns `None` when `url` is not the shared resource: the consumer owns
    /// its resource and needs no namespace.
    pub fn claim(&mut self, consumer: Consumer, url: &ResourceUrl) -> Option<String> {
        if url != self.shared {
            tracing::debug!(consumer = %consumer, "Consumer has a dedicated resource, no prefix");
            return None;
        }

        let prefix = Self::prefix_for(self.namespace, consumer);
        tracing::debug!(consumer = %consumer, prefix = %prefix, "Allocated key prefix");

        self.registry
            .allocations
            .entry(self.shared.as_str().to_string())
            .or_default()
            .insert(consumer, prefix.clone());

        Some(prefix)
    }

    /// Finish allocating and return the registry.
    pub fn into_registry(self) -> PrefixRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> ResourceUrl {
        ResourceUrl::parse("TEST_URL", raw).unwrap()
    }

    #[test]
    fn test_shared_consumers_get_distinct_prefixes() {
        let shared = url("redis://localhost");
        let mut allocator = PrefixAllocator::new("prod", &shared);

        let cache = allocator.claim(Consumer::Cache, &shared).unwrap();
        let queue = allocator.claim(Consumer::Queue, &shared).unwrap();
        let results = allocator.claim(Consumer::QueueResults, &shared).unwrap();
        let pubsub = allocator.claim(Consumer::PubSub, &shared).unwrap();

        let all = [&cache, &queue, &results, &pubsub];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
                assert!(!a.starts_with(b.as_str()) && !b.starts_with(a.as_str()));
            }
        }

        let registry = allocator.into_registry();
        assert_eq!(registry.consumers(&shared).unwrap().len(), 4);
        assert_eq!(registry.get(&shared, Consumer::Cache), Some("prod:cache:"));
        assert_eq!(registry.allocated(Consumer::PubSub), Some("prod:pubsub:"));
        assert_eq!(registry.shared(), Some("redis://localhost"));
    }

    #[test]
    fn test_dedicated_resource_is_excluded() {
        let shared = url("redis://localhost");
        let broker = url("redis://broker.internal");
        let mut allocator = PrefixAllocator::new("prod", &shared);

        assert_eq!(allocator.claim(Consumer::Queue, &broker), None);
        let registry = allocator.into_registry();
        assert!(registry.is_empty());
        assert_eq!(registry.get(&broker, Consumer::Queue), None);
        assert_eq!(registry.allocated(Consumer::Queue), None);
        assert!(registry.is_shared(&shared));
        assert!(!registry.is_shared(&broker));
    }

    #[test]
    fn test_prefix_ignores_claim_order() {
        let shared = url("redis://localhost");

        let mut first = PrefixAllocator::new("ci", &shared);
        let a_cache = first.claim(Consumer::Cache, &shared);
        let a_queue = first.claim(Consumer::Queue, &shared);

        let mut second = PrefixAllocator::new("ci", &shared);
        let b_queue = second.claim(Consumer::Queue, &shared);
        let b_cache = second.claim(Consumer::Cache, &shared);

        assert_eq!(a_cache, b_cache);
        assert_eq!(a_queue, b_queue);
        assert_eq!(first.into_registry(), second.into_registry());
    }

    #[test]
    fn test_prefix_does_not_depend_on_url() {
        let one = url("redis://one");
        let two = url("redis://two/3");
        let a = PrefixAllocator::new("ci", &one).claim(Consumer::Cache, &one);
        let b = PrefixAllocator::new("ci", &two).claim(Consumer::Cache, &two);
        assert_eq!(a, b);
    }
}
