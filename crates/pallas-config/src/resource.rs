//! Structured connection URLs.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ConfigError, ConfigResult};

/// A parsed connection string (database, cache, broker, DSN, base URL...).
///
/// Equality is exact string equality of the normalized URL, which is what
/// decides whether two subsystems share one backing resource.
///
/// `Display` and `Debug` redact the password; use [`ResourceUrl::as_str`] to
/// get the full connection string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceUrl(Url);

impl ResourceUrl {
    /// Parse `raw`, reporting failures against the variable `name`.
    ///
    /// # Example
    ///
    /// ```
    /// use pallas_config::ResourceUrl;
    ///
    /// let url = ResourceUrl::parse("DATABASE_URL", "postgres://u:p@db:5433/app").unwrap();
    /// assert_eq!(url.scheme(), "postgres");
    /// assert_eq!(url.port(), Some(5433));
    /// assert_eq!(url.database_name(), Some("app"));
    /// assert_eq!(url.to_string(), "postgres://u:***@db:5433/app");
    /// ```
    pub fn parse(name: &str, raw: &str) -> ConfigResult<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| ConfigError::invalid_value(name, format!("malformed URL: {e}")))?;

        if url.cannot_be_a_base() {
            return Err(ConfigError::invalid_value(
                name,
                format!("expected a scheme://host URL, got {:?}", url.scheme()),
            ));
        }

        Ok(Self(url))
    }

    /// URL scheme, lowercase.
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// User name, if one is set.
    pub fn username(&self) -> Option<&str> {
        Some(self.0.username()).filter(|u| !u.is_empty())
    }

    /// Password, if one is set.
    pub fn password(&self) -> Option<&str> {
        self.0.password()
    }

    /// Host name or address.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Explicit port, if one is given.
    pub fn port(&self) -> Option<u16> {
        self.0.port()
    }

    /// Path component; empty for URLs without one.
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// Query string without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }

    /// First path segment, which database URLs use as the database name.
    pub fn database_name(&self) -> Option<&str> {
        self.0
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|s| !s.is_empty())
    }

    /// The full connection string, credentials included.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.password().is_none() {
            return f.write_str(self.0.as_str());
        }

        let mut redacted = self.0.clone();
        match redacted.set_password(Some("***")) {
            Ok(()) => f.write_str(redacted.as_str()),
            Err(()) => write!(f, "{}://***", self.0.scheme()),
        }
    }
}

impl fmt::Debug for ResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceUrl").field(&self.to_string()).finish()
    }
}
