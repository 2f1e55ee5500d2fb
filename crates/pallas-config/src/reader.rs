//! Typed access to an [`EnvironmentSnapshot`].
//!
//! The reader is the only component that looks at raw variable values. It
//! parses them into typed values, applies required/optional semantics, and
//! keeps a ledger of every variable it was asked about so the host can list
//! the configuration surface it actually depends on.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{vars, ConfigError, ConfigResult, EnvironmentSnapshot, ResourceUrl};

/// The situation the configuration is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveContext {
    /// Normal process startup. Every required variable must be set.
    #[default]
    Runtime,
    /// Image build (asset collection, compilation). Secrets are not available,
    /// so required variables that have a build default fall back to it.
    Build,
    /// Automated tests. Outbound transports are forced to in-memory variants.
    Test,
}

/// What the reader recorded about one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableUsage {
    /// Whether any read treated the variable as required.
    pub required: bool,
    /// Whether the variable had a non-empty value.
    pub present: bool,
}

/// Typed, recording reader over an environment snapshot.
///
/// Empty values are treated as absent.
///
/// # Example
///
/// ```
/// use pallas_config::{EnvReader, EnvironmentSnapshot, ResolveContext};
///
/// let snapshot = EnvironmentSnapshot::from_pairs([("DEBUG", "Yes")]);
/// let env = EnvReader::new(&snapshot, ResolveContext::Runtime);
///
/// assert!(env.boolean("DEBUG", false).unwrap());
/// assert_eq!(env.optional("TIME_ZONE", "UTC"), "UTC");
/// assert!(env.required("SECRET_KEY").is_err());
/// ```
#[derive(Debug)]
pub struct EnvReader<'a> {
    snapshot: &'a EnvironmentSnapshot,
    context: ResolveContext,
    used: RefCell<BTreeMap<String, VariableUsage>>,
}

impl<'a> EnvReader<'a> {
    /// Create a reader over `snapshot` for the given context.
    pub fn new(snapshot: &'a EnvironmentSnapshot, context: ResolveContext) -> Self {
        Self {
            snapshot,
            context,
            used: RefCell::new(BTreeMap::new()),
        }
    }

    /// The context this reader resolves for.
    pub fn context(&self) -> ResolveContext {
        self.context
    }

    /// Read a required string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVariable` if the variable is absent or empty.
    pub fn required(&self, name: &str) -> ConfigResult<String> {
        self.lookup(name, true)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::missing_variable(name))
    }

    /// Read a required string that falls back to `build_default` in the
    /// build context only.
    pub fn required_or_build(&self, name: &str, build_default: &str) -> ConfigResult<String> {
        match self.lookup(name, true) {
            Some(value) => Ok(value.to_string()),
            None if self.context == ResolveContext::Build => {
                tracing::debug!(variable = name, "Using build default");
                Ok(build_default.to_string())
            }
            None => Err(ConfigError::missing_variable(name)),
        }
    }

    /// Read an optional string, returning `default` when absent.
    pub fn optional(&self, name: &str, default: &str) -> String {
        self.lookup(name, false).unwrap_or(default).to_string()
    }

    /// Read an optional string without a default.
    pub fn get(&self, name: &str) -> Option<String> {
        self.lookup(name, false).map(str::to_string)
    }

    /// Read an optional boolean.
    ///
    /// Accepts `true/false/yes/no/1/0` in any case.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for any other token.
    pub fn boolean(&self, name: &str, default: bool) -> ConfigResult<bool> {
        match self.lookup(name, false) {
            None => Ok(default),
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                ConfigError::invalid_value(name, format!("expected a boolean, got {raw:?}"))
            }),
        }
    }

    /// Read an optional signed integer.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the value is not an integer.
    pub fn integer(&self, name: &str, default: i64) -> ConfigResult<i64> {
        match self.lookup(name, false) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::invalid_value(name, format!("expected an integer, got {raw:?}"))
            }),
        }
    }

    /// Read a required URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVariable` if absent and
    /// `ConfigError::InvalidValue` if malformed.
    pub fn url(&self, name: &str) -> ConfigResult<ResourceUrl> {
        let raw = self.required(name)?;
        ResourceUrl::parse(name, &raw)
    }

    /// Read a required URL with a build-context fallback.
    pub fn url_or_build(&self, name: &str, build_default: &str) -> ConfigResult<ResourceUrl> {
        let raw = self.required_or_build(name, build_default)?;
        ResourceUrl::parse(name, &raw)
    }

    /// Read an optional URL with a default.
    pub fn url_or(&self, name: &str, default: &str) -> ConfigResult<ResourceUrl> {
        let raw = self.optional(name, default);
        ResourceUrl::parse(name, &raw)
    }

    /// Read an optional URL without a default.
    pub fn optional_url(&self, name: &str) -> ConfigResult<Option<ResourceUrl>> {
        self.get(name)
            .map(|raw| ResourceUrl::parse(name, &raw))
            .transpose()
    }

    /// Determine the deployment environment name.
    ///
    /// `ENVIRONMENT` wins when set. Otherwise:
    /// - in the build context the name is `_build`;
    /// - when `HOME` lives under `/home/` and `USER` is set, the process is
    ///   assumed to run on a developer machine and the name becomes
    ///   `{user}_{db_name}`, which keeps per-developer key prefixes apart as
    ///   long as local database names are.
    ///
    /// The developer-machine detection is a best-effort heuristic. It does not
    /// hold on every substrate (CI runners and some containers also use
    /// `/home/...`), so deployments must set `ENVIRONMENT` explicitly.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVariable` when no rule applies.
    pub fn environment_name(&self, db_name: Option<&str>) -> ConfigResult<String> {
        if let Some(name) = self.lookup(vars::ENVIRONMENT, true) {
            return Ok(name.to_string());
        }

        if self.context == ResolveContext::Build {
            return Ok("_build".to_string());
        }

        let home = self.optional(vars::HOME, "");
        if home.starts_with("/home/") {
            if let (Some(user), Some(db)) = (self.get(vars::USER), db_name) {
                let derived = format!("{user}_{db}");
                tracing::warn!(
                    environment = %derived,
                    "ENVIRONMENT is not set, derived a developer environment name"
                );
                return Ok(derived);
            }
        }

        Err(ConfigError::missing_variable(vars::ENVIRONMENT))
    }

    /// Snapshot of the usage ledger so far.
    pub fn usage(&self) -> BTreeMap<String, VariableUsage> {
        self.used.borrow().clone()
    }

    fn lookup(&self, name: &str, required: bool) -> Option<&'a str> {
        let value = self.snapshot.get(name).filter(|v| !v.is_empty());

        let mut used = self.used.borrow_mut();
        let entry = used.entry(name.to_string()).or_insert(VariableUsage {
            required: false,
            present: false,
        });
        entry.required |= required;
        entry.present = value.is_some();

        value
    }
}

/// Parse a boolean token.
///
/// Accepts `true`, `yes`, `1` and `false`, `no`, `0`, case-insensitively and
/// ignoring surrounding whitespace.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
