//! Exclusive backend selection.
//!
//! A [`ModeSwitch`] covers settings that admit exactly one of several named
//! backends (storage provider, email transport...). Each backend registers a
//! builder that reads only the variables that backend needs. Selection and
//! building are separate steps:
//!
//! ```text
//! ModeSwitch ──select()──▶ SelectedVariant ──build()──▶ ResolvedMode
//!  (unresolved)              (variant chosen)            (validated)
//!        └───────────────────────┴──── Err(ConfigError) (failed)
//! ```
//!
//! Only the selected builder ever runs, so credentials of backends that are
//! not in use are never read and never cause failures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult, EnvReader};

type Builder<'a, T> = Box<dyn FnOnce(&EnvReader<'_>) -> ConfigResult<T> + 'a>;

/// A mode that has not been resolved yet.
///
/// # Example
///
/// ```
/// use pallas_config::{EnvReader, EnvironmentSnapshot, ModeSwitch, ResolveContext};
///
/// let snapshot = EnvironmentSnapshot::from_pairs([("CACHE_MODE", "Remote"), ("CACHE_HOST", "c1")]);
/// let env = EnvReader::new(&snapshot, ResolveContext::Runtime);
///
/// let mode = ModeSwitch::new("CACHE_MODE", "local")
///     .variant("local", |_| Ok(String::from("in-process")))
///     .variant("remote", |env| env.required("CACHE_HOST"))
///     .resolve(&env)
///     .unwrap();
///
/// assert_eq!(mode.variant, "remote");
/// assert_eq!(mode.settings, "c1");
/// ```
pub struct ModeSwitch<'a, T> {
    variable: &'static str,
    default: &'static str,
    forced: Option<&'static str>,
    variants: Vec<(&'static str, Builder<'a, T>)>,
}

impl<'a, T> ModeSwitch<'a, T> {
    /// A switch read from `variable`, falling back to `default` when unset.
    pub fn new(variable: &'static str, default: &'static str) -> Self {
        Self {
            variable,
            default,
            forced: None,
            variants: Vec::new(),
        }
    }

    /// Register a variant and the builder for its settings.
    ///
    /// Variant names are matched case-insensitively.
    pub fn variant<F>(mut self, name: &'static str, builder: F) -> Self
    where
        F: FnOnce(&EnvReader<'_>) -> ConfigResult<T> + 'a,
    {
        self.variants.push((name, Box::new(builder)));
        self
    }

    /// Select `name` without consulting the environment.
    pub fn force(mut self, name: &'static str) -> Self {
        self.forced = Some(name);
        self
    }

    /// Names of the registered variants, in registration order.
    pub fn variant_names(&self) -> Vec<&'static str> {
        self.variants.iter().map(|(name, _)| *name).collect()
    }

    /// Choose the variant.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownVariant` if the selector (or the default,
    /// or the forced name) is not a registered variant.
    pub fn select(self, env: &EnvReader<'_>) -> ConfigResult<SelectedVariant<'a, T>> {
        let (wanted, forced) = match self.forced {
            Some(name) => (name.to_string(), true),
            None => (env.optional(self.variable, self.default), false),
        };
        let normalized = wanted.trim().to_lowercase();

        let names = self.variant_names();
        let Some((name, builder)) = self
            .variants
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&normalized))
        else {
            return Err(ConfigError::unknown_variant(self.variable, wanted, names));
        };

        Ok(SelectedVariant {
            variable: self.variable,
            name,
            forced,
            builder,
        })
    }

    /// Select the variant and build its settings.
    pub fn resolve(self, env: &EnvReader<'_>) -> ConfigResult<ResolvedMode<T>> {
        self.select(env)?.build(env)
    }
}

impl<T> fmt::Debug for ModeSwitch<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeSwitch")
            .field("variable", &self.variable)
            .field("default", &self.default)
            .field("forced", &self.forced)
            .field("variants", &self.variant_names())
            .finish()
    }
}

/// A mode whose variant is chosen but whose settings are not built yet.
pub struct SelectedVariant<'a, T> {
    variable: &'static str,
    name: &'static str,
    forced: bool,
    builder: Builder<'a, T>,
}

impl<T> SelectedVariant<'_, T> {
    /// The chosen variant.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the variant was forced rather than read.
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// Run the chosen variant's builder.
    ///
    /// # Errors
    ///
    /// Propagates whatever the builder reports, typically
    /// `ConfigError::MissingVariable` or `ConfigError::InvalidValue`.
    pub fn build(self, env: &EnvReader<'_>) -> ConfigResult<ResolvedMode<T>> {
        let settings = (self.builder)(env)?;

        tracing::debug!(
            mode = self.variable,
            variant = self.name,
            forced = self.forced,
            "Mode resolved"
        );

        Ok(ResolvedMode {
            variant: self.name.to_string(),
            settings,
        })
    }
}

impl<T> fmt::Debug for SelectedVariant<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedVariant")
            .field("variable", &self.variable)
            .field("name", &self.name)
            .field("forced", &self.forced)
            .finish_non_exhaustive()
    }
}

/// The chosen variant and its settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMode<T> {
    /// Name of the chosen variant.
    pub variant: String,
    /// Settings built by that variant.
    pub settings: T,
}
