//! Point-in-time capture of the process environment.
//!
//! Resolution never reads the live environment. The host captures an
//! [`EnvironmentSnapshot`] once at startup and hands it to the resolver; from
//! then on every component reads from the snapshot only.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use crate::{ConfigError, ConfigResult};

/// Immutable mapping of environment variable names to raw values.
///
/// # Example
///
/// ```
/// use pallas_config::EnvironmentSnapshot;
///
/// let snapshot = EnvironmentSnapshot::from_pairs([("DEBUG", "yes")]);
/// assert_eq!(snapshot.get("DEBUG"), Some("yes"));
/// assert_eq!(snapshot.get("MISSING"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvironmentSnapshot {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    #[must_use]
    pub fn capture() -> Self {
        let vars = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();

        Self { vars }
    }

    /// Capture the process environment layered over the nearest `.env` file.
    ///
    /// Process variables win over `.env` entries. A missing `.env` file is not
    /// an error.
    pub fn capture_with_dotenv() -> ConfigResult<Self> {
        let snapshot = Self::capture();

        match dotenvy::dotenv_iter() {
            Ok(iter) => snapshot.layer_dotenv(iter, ".env"),
            Err(e) if e.not_found() => Ok(snapshot),
            Err(e) => Err(ConfigError::invalid_value(".env", e.to_string())),
        }
    }

    /// Build a snapshot from explicit name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Layer the entries of a `.env` file under this snapshot.
    ///
    /// Entries already present in the snapshot are kept as they are.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the file cannot be read or parsed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| ConfigError::invalid_value(label.clone(), e.to_string()))?;

        self.layer_dotenv(iter, &label)
    }

    fn layer_dotenv<I>(mut self, iter: I, label: &str) -> ConfigResult<Self>
    where
        I: Iterator<Item = Result<(String, String), dotenvy::Error>>,
    {
        let mut layered = 0usize;
        for item in iter {
            let (key, value) = item.map_err(|e| ConfigError::invalid_value(label, e.to_string()))?;
            if !self.vars.contains_key(&key) {
                self.vars.insert(key, value);
                layered += 1;
            }
        }

        tracing::debug!(source = label, layered, "Layered dotenv entries into snapshot");
        Ok(self)
    }

    /// Raw value of a variable, exactly as captured.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Whether the variable was captured (even if empty).
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Number of captured variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the snapshot holds no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentSnapshot {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_pairs() {
        let snapshot = EnvironmentSnapshot::from_pairs([("A", "1"), ("B", "")]);
        assert_eq!(snapshot.get("A"), Some("1"));
        assert_eq!(snapshot.get("B"), Some(""));
        assert!(snapshot.contains("B"));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_collect() {
        let snapshot: EnvironmentSnapshot = vec![("X", "y")].into_iter().collect();
        assert_eq!(snapshot.get("X"), Some("y"));
    }

    #[test]
    fn test_capture_is_detached_from_process() {
        let snapshot = EnvironmentSnapshot::capture();
        let again = EnvironmentSnapshot::capture();
        // Nothing in this test mutates the environment.
        assert_eq!(snapshot, again);
    }

    #[test]
    fn test_dotenv_file_layers_under_existing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "SECRET_KEY=from-file").unwrap();
        writeln!(file, "DEBUG=true").unwrap();

        let snapshot = EnvironmentSnapshot::from_pairs([("SECRET_KEY", "from-process")])
            .with_dotenv_file(file.path())
            .unwrap();

        assert_eq!(snapshot.get("SECRET_KEY"), Some("from-process"));
        assert_eq!(snapshot.get("DEBUG"), Some("true"));
    }

    #[test]
    fn test_dotenv_file_missing() {
        let result = EnvironmentSnapshot::default().with_dotenv_file("/nonexistent/.env");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
