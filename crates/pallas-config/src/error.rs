//! Configuration resolution error types.

use thiserror::Error;

/// Result type for configuration resolution.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while resolving a configuration tree.
///
/// Every variant is fatal: resolution stops at the first error and no tree
/// is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("missing required environment variable: {name}")]
    MissingVariable {
        /// The variable name.
        name: String,
    },

    /// A variable is present but cannot be parsed.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// The variable (or field) name.
        name: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },

    /// A mode selector does not match any known backend.
    #[error("unknown variant {value:?} for {mode} (expected one of: {})", .expected.join(", "))]
    UnknownVariant {
        /// The mode selector variable.
        mode: String,
        /// The value that was read.
        value: String,
        /// The known variant names.
        expected: Vec<String>,
    },

    /// A feature was explicitly requested but a component it needs is not installed.
    #[error("feature {feature} requires {dependency}, which is not available")]
    MissingDependency {
        /// The requested feature.
        feature: String,
        /// The unavailable component.
        dependency: String,
    },

    /// Zero or several database drivers are available and nothing picks one.
    #[error("cannot choose a database driver: {reason} (candidates: [{}])", .candidates.join(", "))]
    AmbiguousDriver {
        /// The drivers that were available.
        candidates: Vec<String>,
        /// Why no single driver could be chosen.
        reason: String,
    },

    /// A write was attempted on a sealed configuration tree.
    #[error("configuration is sealed; cannot modify {target}")]
    ImmutableConfig {
        /// What the caller tried to modify.
        target: String,
    },
}

impl ConfigError {
    /// Create a new missing variable error.
    pub fn missing_variable(name: impl Into<String>) -> Self {
        Self::MissingVariable { name: name.into() }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new unknown variant error.
    pub fn unknown_variant<I, S>(mode: impl Into<String>, value: impl Into<String>, expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UnknownVariant {
            mode: mode.into(),
            value: value.into(),
            expected: expected.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a new missing dependency error.
    pub fn missing_dependency(feature: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::MissingDependency {
            feature: feature.into(),
            dependency: dependency.into(),
        }
    }

    /// Create a new ambiguous driver error.
    pub fn ambiguous_driver<I, S>(candidates: I, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AmbiguousDriver {
            candidates: candidates.into_iter().map(Into::into).collect(),
            reason: reason.into(),
        }
    }

    /// Create a new immutable configuration error.
    pub fn immutable(target: impl Into<String>) -> Self {
        Self::ImmutableConfig {
            target: target.into(),
        }
    }

    /// The environment variable (or mode selector) this error points at, if any.
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::MissingVariable { name } | Self::InvalidValue { name, .. } => Some(name),
            Self::UnknownVariant { mode, .. } => Some(mode),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_variable_error() {
        let err = ConfigError::missing_variable("DATABASE_URL");
        assert!(err.to_string().contains("DATABASE_URL"));
        assert_eq!(err.variable(), Some("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("DEBUG", "expected a boolean, got \"maybe\"");
        assert!(err.to_string().contains("DEBUG"));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_unknown_variant_error() {
        let err = ConfigError::unknown_variant("STORAGES_MODE", "azure", ["s3", "do"]);
        let msg = err.to_string();
        assert!(msg.contains("STORAGES_MODE"));
        assert!(msg.contains("azure"));
        assert!(msg.contains("s3, do"));
        assert_eq!(err.variable(), Some("STORAGES_MODE"));
    }

    #[test]
    fn test_missing_dependency_error() {
        let err = ConfigError::missing_dependency("task-queue", "redis");
        assert!(err.to_string().contains("task-queue"));
        assert!(err.to_string().contains("redis"));
        assert_eq!(err.variable(), None);
    }

    #[test]
    fn test_ambiguous_driver_error() {
        let err = ConfigError::ambiguous_driver(["postgres", "postgis"], "several drivers installed");
        assert!(err.to_string().contains("postgres, postgis"));
    }

    #[test]
    fn test_immutable_error() {
        let err = ConfigError::immutable("database.conn_max_age");
        assert!(err.to_string().contains("sealed"));
        assert!(err.to_string().contains("database.conn_max_age"));
    }
}
