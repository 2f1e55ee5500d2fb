//! Settings records, one per subsystem.
//!
//! This module defines the structure of every record the resolver can place in
//! a [`ConfigTree`](crate::ConfigTree). Records are plain data: all decisions
//! are made by the resolver, records only carry the outcome.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult, DatabaseDriver, ResolvedMode, ResourceUrl};

/// Subsystem identifiers, which are also the keys of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    /// Site-wide settings.
    Site,
    /// Secrets and request security.
    Security,
    /// Relational database.
    Database,
    /// Key/value cache.
    Cache,
    /// Background task queue.
    Queue,
    /// Pub/sub layer.
    PubSub,
    /// Object storage.
    Storage,
    /// Outbound email.
    Email,
    /// Outbound SMS.
    Sms,
    /// Content management layer.
    Cms,
    /// Health checks.
    HealthCheck,
    /// Error reporting.
    ErrorReporting,
}

impl Subsystem {
    /// Stable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Subsystem::Site => "site",
            Subsystem::Security => "security",
            Subsystem::Database => "database",
            Subsystem::Cache => "cache",
            Subsystem::Queue => "queue",
            Subsystem::PubSub => "pub_sub",
            Subsystem::Storage => "storage",
            Subsystem::Email => "email",
            Subsystem::Sms => "sms",
            Subsystem::Cms => "cms",
            Subsystem::HealthCheck => "health_check",
            Subsystem::ErrorReporting => "error_reporting",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client tuning for connections to the shared cache/broker resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionOptions {
    /// Socket read/write timeout in seconds.
    pub socket_timeout_secs: u64,
    /// Connect timeout in seconds.
    pub socket_connect_timeout_secs: u64,
    /// Enable TCP keepalive.
    pub socket_keepalive: bool,
    /// Seconds between connection health checks.
    pub health_check_interval_secs: u64,
    /// Constant backoff between retries in seconds.
    pub retry_backoff_secs: u64,
    /// Number of retries on busy-loading, connection and timeout errors.
    pub retry_attempts: u32,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            socket_timeout_secs: 5,
            socket_connect_timeout_secs: 5,
            socket_keepalive: true,
            health_check_interval_secs: 1,
            retry_backoff_secs: 5,
            retry_attempts: 100,
        }
    }
}

/// Site-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteSettings {
    /// Deployment environment name.
    pub environment: String,
    /// Default time zone.
    pub time_zone: String,
    /// Path prefix every backend route lives under, without trailing slash.
    pub url_prefix: String,
    /// URL static files are served from.
    pub static_url: String,
    /// Public base URL, for links generated outside a request.
    pub base_url: Option<ResourceUrl>,
}

/// Secrets and request security.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecuritySettings {
    /// Signing secret.
    pub secret_key: String,
    /// Debug mode.
    pub debug: bool,
    /// Accepted `Host` header values.
    pub allowed_hosts: Vec<String>,
    /// Header and value that mark a request as having arrived over HTTPS.
    pub secure_proxy_ssl_header: (String, String),
    /// Trust `X-Forwarded-Host`.
    pub use_x_forwarded_host: bool,
    /// Password hashers, preferred first.
    pub password_hashers: Vec<String>,
}

impl fmt::Debug for SecuritySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecuritySettings")
            .field("secret_key", &"***")
            .field("debug", &self.debug)
            .field("allowed_hosts", &self.allowed_hosts)
            .field("secure_proxy_ssl_header", &self.secure_proxy_ssl_header)
            .field("use_x_forwarded_host", &self.use_x_forwarded_host)
            .field("password_hashers", &self.password_hashers)
            .finish()
    }
}

/// Relational database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSettings {
    /// Full connection URL.
    pub url: ResourceUrl,
    /// Selected driver.
    pub driver: DatabaseDriver,
    /// Backend engine module for the driver.
    pub engine: String,
    /// Database name.
    pub name: Option<String>,
    /// User name.
    pub user: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Host.
    pub host: Option<String>,
    /// Port.
    pub port: Option<u16>,
    /// Whether connections are kept open between requests.
    pub pooled: bool,
    /// Connection lifetime in seconds; 0 closes after every request.
    pub conn_max_age_secs: u64,
}

/// Key/value cache on the shared resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Resource URL.
    pub location: ResourceUrl,
    /// Key prefix, when the resource is shared.
    pub key_prefix: Option<String>,
    /// Client tuning.
    pub options: ConnectionOptions,
}

/// Where task results are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultStore {
    /// In the relational database.
    Database,
    /// In a key/value resource.
    Resource {
        /// Resource URL.
        url: ResourceUrl,
        /// Key prefix, when the resource is shared.
        prefix: Option<String>,
    },
}

/// Background task queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSettings {
    /// Broker URL.
    pub broker_url: ResourceUrl,
    /// Broker key prefix, when the broker is the shared resource.
    pub broker_prefix: Option<String>,
    /// Result store.
    pub result_store: ResultStore,
    /// Time zone for scheduled tasks.
    pub timezone: String,
    /// Report tasks as started.
    pub track_started: bool,
    /// Hard time limit per task in seconds.
    pub task_time_limit_secs: u64,
    /// Send worker tracebacks back to the caller.
    pub remote_tracebacks: bool,
    /// Cancel long-running tasks when the broker connection is lost.
    pub cancel_long_running_on_connection_loss: bool,
    /// Broker transport tuning.
    pub transport: ConnectionOptions,
}

/// Pub/sub layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PubSubSettings {
    /// Transport URL.
    pub url: ResourceUrl,
    /// Channel prefix, when the transport is the shared resource.
    pub prefix: Option<String>,
    /// Client tuning.
    pub options: ConnectionOptions,
}

/// Access key pair for object storage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageCredentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

/// Object storage provider variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageProvider {
    /// AWS S3.
    S3 {
        /// Key pair; `None` when the container runtime injects credentials.
        credentials: Option<StorageCredentials>,
    },
    /// DigitalOcean Spaces.
    DigitalOcean {
        /// Key pair.
        credentials: StorageCredentials,
        /// Spaces region.
        region: String,
        /// S3-compatible endpoint for the region.
        endpoint_url: String,
    },
}

impl StorageProvider {
    /// The `STORAGES_MODE` variant that builds this provider.
    pub fn variant(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::DigitalOcean { .. } => "do",
        }
    }
}

/// Public file serving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicFiles {
    /// CDN domain files are served from.
    pub custom_domain: String,
    /// ACL applied to uploaded objects.
    pub default_acl: String,
    /// `Cache-Control` header set on uploaded objects.
    pub cache_control: String,
}

/// Object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSettings {
    /// Selected provider.
    pub provider: ResolvedMode<StorageProvider>,
    /// Bucket name.
    pub bucket: String,
    /// Overwrite files uploaded under an existing name.
    pub file_overwrite: bool,
    /// Present when files are publicly readable.
    pub public_files: Option<PublicFiles>,
}

/// Email transports.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmailTransport {
    /// Print messages to the console.
    Console,
    /// Keep messages in memory (tests).
    Memory,
    /// Mailjet API.
    Mailjet {
        /// Public API key.
        api_key_public: String,
        /// Private API key.
        api_key_private: String,
    },
    /// Mandrill API.
    Mandrill {
        /// API key.
        api_key: String,
    },
}

impl EmailTransport {
    /// The `EMAIL_MODE` variant that builds this transport.
    pub fn variant(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Memory => "memory",
            Self::Mailjet { .. } => "mailjet",
            Self::Mandrill { .. } => "mandrill",
        }
    }
}

impl fmt::Debug for EmailTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => f.write_str("Console"),
            Self::Memory => f.write_str("Memory"),
            Self::Mailjet { api_key_public, .. } => f
                .debug_struct("Mailjet")
                .field("api_key_public", api_key_public)
                .field("api_key_private", &"***")
                .finish(),
            Self::Mandrill { .. } => f.debug_struct("Mandrill").field("api_key", &"***").finish(),
        }
    }
}

/// SMS transports.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmsTransport {
    /// Print messages to the console.
    Console,
    /// Keep messages in memory (tests).
    Memory,
    /// Mailjet SMS API.
    Mailjet {
        /// API token.
        api_token: String,
    },
}

impl SmsTransport {
    /// The `SMS_MODE` variant that builds this transport.
    pub fn variant(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Memory => "memory",
            Self::Mailjet { .. } => "mailjet",
        }
    }
}

impl fmt::Debug for SmsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => f.write_str("Console"),
            Self::Memory => f.write_str("Memory"),
            Self::Mailjet { .. } => f.debug_struct("Mailjet").field("api_token", &"***").finish(),
        }
    }
}

/// Outbound email.
pub type EmailSettings = ResolvedMode<EmailTransport>;

/// Outbound SMS.
pub type SmsSettings = ResolvedMode<SmsTransport>;

/// Content management layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CmsSettings {
    /// Base URL used in admin notifications and previews.
    pub admin_base_url: ResourceUrl,
    /// Translatable content.
    pub i18n_enabled: bool,
    /// Allow non-ASCII characters in slugs.
    pub allow_unicode_slugs: bool,
    /// Phone home for new releases.
    pub update_check: bool,
    /// Case-insensitive tags.
    pub tags_case_insensitive: bool,
}

/// Health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthCheckSettings {
    /// Minimum free memory in megabytes before reporting unhealthy.
    pub memory_min_mb: u64,
    /// Queue worker ping timeout in milliseconds, when the queue is enabled.
    pub queue_ping_timeout_ms: Option<u64>,
}

/// Error reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorReportingSettings {
    /// Reporting endpoint.
    pub dsn: ResourceUrl,
    /// Share of transactions traced, between 0 and 1.
    pub traces_sample_rate: f64,
    /// Environment reported with every event.
    pub environment: String,
    /// Attach user identity to events.
    pub send_default_pii: bool,
    /// Report task-queue failures too.
    pub queue_integration: bool,
}

/// A record of any subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubsystemSettings {
    /// Site-wide settings.
    Site(SiteSettings),
    /// Security.
    Security(SecuritySettings),
    /// Database.
    Database(DatabaseSettings),
    /// Cache.
    Cache(CacheSettings),
    /// Task queue.
    Queue(QueueSettings),
    /// Pub/sub.
    PubSub(PubSubSettings),
    /// Object storage.
    Storage(StorageSettings),
    /// Email.
    Email(EmailSettings),
    /// SMS.
    Sms(SmsSettings),
    /// Content management.
    Cms(CmsSettings),
    /// Health checks.
    HealthCheck(HealthCheckSettings),
    /// Error reporting.
    ErrorReporting(ErrorReportingSettings),
}

impl SubsystemSettings {
    /// The subsystem this record belongs to.
    pub fn subsystem(&self) -> Subsystem {
        match self {
            Self::Site(_) => Subsystem::Site,
            Self::Security(_) => Subsystem::Security,
            Self::Database(_) => Subsystem::Database,
            Self::Cache(_) => Subsystem::Cache,
            Self::Queue(_) => Subsystem::Queue,
            Self::PubSub(_) => Subsystem::PubSub,
            Self::Storage(_) => Subsystem::Storage,
            Self::Email(_) => Subsystem::Email,
            Self::Sms(_) => Subsystem::Sms,
            Self::Cms(_) => Subsystem::Cms,
            Self::HealthCheck(_) => Subsystem::HealthCheck,
            Self::ErrorReporting(_) => Subsystem::ErrorReporting,
        }
    }

    /// Check that a mode-backed record names the variant its settings
    /// were built by.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch.
    pub(crate) fn check_variant(&self) -> Result<(), String> {
        let (selected, built) = match self {
            Self::Email(mode) => (mode.variant.as_str(), mode.settings.variant()),
            Self::Sms(mode) => (mode.variant.as_str(), mode.settings.variant()),
            Self::Storage(storage) => (
                storage.provider.variant.as_str(),
                storage.provider.settings.variant(),
            ),
            _ => return Ok(()),
        };

        if selected == built {
            Ok(())
        } else {
            Err(format!(
                "variant {selected:?} does not match settings built by {built:?}"
            ))
        }
    }

    /// The record as a JSON value.
    pub fn to_value(&self) -> ConfigResult<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| ConfigError::invalid_value(self.subsystem().as_str(), e.to_string()))
    }

    /// Rebuild a record of `subsystem` from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the value does not have the
    /// record's shape.
    pub fn from_value(subsystem: Subsystem, value: serde_json::Value) -> ConfigResult<Self> {
        fn parse<T: serde::de::DeserializeOwned>(
            subsystem: Subsystem,
            value: serde_json::Value,
        ) -> ConfigResult<T> {
            serde_json::from_value(value)
                .map_err(|e| ConfigError::invalid_value(subsystem.as_str(), e.to_string()))
        }

        Ok(match subsystem {
            Subsystem::Site => Self::Site(parse(subsystem, value)?),
            Subsystem::Security => Self::Security(parse(subsystem, value)?),
            Subsystem::Database => Self::Database(parse(subsystem, value)?),
            Subsystem::Cache => Self::Cache(parse(subsystem, value)?),
            Subsystem::Queue => Self::Queue(parse(subsystem, value)?),
            Subsystem::PubSub => Self::PubSub(parse(subsystem, value)?),
            Subsystem::Storage => Self::Storage(parse(subsystem, value)?),
            Subsystem::Email => Self::Email(parse(subsystem, value)?),
            Subsystem::Sms => Self::Sms(parse(subsystem, value)?),
            Subsystem::Cms => Self::Cms(parse(subsystem, value)?),
            Subsystem::HealthCheck => Self::HealthCheck(parse(subsystem, value)?),
            Subsystem::ErrorReporting => Self::ErrorReporting(parse(subsystem, value)?),
        })
    }
}
