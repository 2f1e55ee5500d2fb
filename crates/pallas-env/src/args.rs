//! Command-line arguments.

use std::path::PathBuf;

use pallas_config::{
    ConfigResult, DatabaseDriver, EnvironmentSnapshot, Feature, FeatureOverrides, ResolveContext,
    StaticProbe,
};
use pallas_telemetry::{LogConfig, LogFormat};

use crate::error::{CliError, CliResult};

/// What to do after resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Resolve and report success or the first error.
    Check,
    /// List every variable the resolution consulted.
    Vars(OutputFormat),
    /// Print the resolved tree as JSON, secrets redacted.
    Show,
}

/// Output format of the `vars` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Table,
    /// JSON array.
    Json,
}

/// Where the environment comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSource {
    /// Process environment plus `.env` in the working directory, if any.
    ProcessAndDotenv,
    /// Process environment plus the given file.
    ProcessAndFile(PathBuf),
    /// Process environment only.
    Process,
}

/// Parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Subcommand.
    pub command: Command,
    /// Resolution context; `None` means the command's default.
    pub context: Option<ResolveContext>,
    /// Features forced on.
    pub enable: Vec<Feature>,
    /// Features forced off.
    pub disable: Vec<Feature>,
    /// Explicit database driver.
    pub driver: Option<DatabaseDriver>,
    /// Installed components; empty means every known component.
    pub components: Vec<String>,
    /// Environment source.
    pub source: EnvSource,
    /// Log output format.
    pub log_format: LogFormat,
    /// Log at debug level.
    pub verbose: bool,
}

/// Outcome of parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// Run a command.
    Run(Args),
    /// Print help and exit.
    Help,
    /// Print the version and exit.
    Version,
}

impl Args {
    /// Parse arguments, not including the program name.
    pub fn parse_from<I, S>(args: I) -> CliResult<Parsed>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let mut command = None;
        let mut format = OutputFormat::default();
        let mut parsed = Self {
            command: Command::Check,
            context: None,
            enable: Vec::new(),
            disable: Vec::new(),
            driver: None,
            components: Vec::new(),
            source: EnvSource::ProcessAndDotenv,
            log_format: LogFormat::Compact,
            verbose: false,
        };

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| args.next().ok_or_else(|| CliError::missing_value(flag));

            match arg.as_str() {
                "check" if command.is_none() => command = Some("check"),
                "vars" if command.is_none() => command = Some("vars"),
                "show" if command.is_none() => command = Some("show"),
                "--build" => parsed.context = Some(ResolveContext::Build),
                "--test" => parsed.context = Some(ResolveContext::Test),
                "--enable" => parsed.enable.push(parse_feature("--enable", &value("--enable")?)?),
                "--disable" => {
                    parsed.disable.push(parse_feature("--disable", &value("--disable")?)?);
                }
                "--driver" => {
                    let raw = value("--driver")?;
                    let driver = raw.parse().map_err(|e: pallas_config::ConfigError| {
                        CliError::invalid_value("--driver", e.to_string())
                    })?;
                    parsed.driver = Some(driver);
                }
                "--component" => parsed.components.push(value("--component")?),
                "--no-dotenv" => parsed.source = EnvSource::Process,
                "--env-file" => {
                    parsed.source = EnvSource::ProcessAndFile(PathBuf::from(value("--env-file")?));
                }
                "--format" => {
                    format = match value("--format")?.to_lowercase().as_str() {
                        "table" => OutputFormat::Table,
                        "json" => OutputFormat::Json,
                        other => {
                            return Err(CliError::invalid_value(
                                "--format",
                                format!("{other} (expected table or json)"),
                            ))
                        }
                    };
                }
                "--log-format" => {
                    parsed.log_format = value("--log-format")?
                        .parse()
                        .map_err(|e: pallas_telemetry::TelemetryError| {
                            CliError::invalid_value("--log-format", e.to_string())
                        })?;
                }
                "--verbose" | "-V" => parsed.verbose = true,
                "--help" | "-h" => return Ok(Parsed::Help),
                "--version" | "-v" => return Ok(Parsed::Version),
                other => return Err(CliError::unknown_argument(other)),
            }
        }

        parsed.command = match command {
            None | Some("check") => Command::Check,
            Some("vars") => Command::Vars(format),
            _ => Command::Show,
        };

        Ok(Parsed::Run(parsed))
    }

    /// Effective resolution context.
    ///
    /// `vars` defaults to the build context so it can list variables on a
    /// machine that has none of the secrets.
    pub fn context(&self) -> ResolveContext {
        self.context.unwrap_or(match self.command {
            Command::Vars(_) => ResolveContext::Build,
            Command::Check | Command::Show => ResolveContext::Runtime,
        })
    }

    /// Feature overrides from `--enable`, `--disable` and `--driver`.
    pub fn overrides(&self) -> FeatureOverrides {
        let mut overrides = FeatureOverrides::new();
        for feature in &self.enable {
            overrides = overrides.enable(*feature);
        }
        for feature in &self.disable {
            overrides = overrides.disable(*feature);
        }
        if let Some(driver) = self.driver {
            overrides = overrides.driver(driver);
        }
        overrides
    }

    /// The probe describing installed components.
    ///
    /// Without `--component`, every feature component is assumed installed
    /// along with the requested driver (postgres by default).
    pub fn probe(&self) -> StaticProbe {
        if !self.components.is_empty() {
            return StaticProbe::new(self.components.iter().cloned());
        }

        let driver = self.driver.unwrap_or(DatabaseDriver::Postgres);
        let mut components: Vec<&str> = Feature::ALL
            .iter()
            .flat_map(|f| f.components().iter().copied())
            .collect();
        components.push(driver.as_str());
        StaticProbe::new(components)
    }

    /// Take the environment snapshot.
    pub fn snapshot(&self) -> ConfigResult<EnvironmentSnapshot> {
        match &self.source {
            EnvSource::ProcessAndDotenv => EnvironmentSnapshot::capture_with_dotenv(),
            EnvSource::ProcessAndFile(path) => EnvironmentSnapshot::capture().with_dotenv_file(path),
            EnvSource::Process => Ok(EnvironmentSnapshot::capture()),
        }
    }

    /// Logging setup for this run.
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::cli();
        config.format = self.log_format;
        if self.verbose {
            config.level = "debug".to_string();
        }
        config
    }
}

fn parse_feature(flag: &str, raw: &str) -> CliResult<Feature> {
    raw.parse()
        .map_err(|e: pallas_config::ConfigError| CliError::invalid_value(flag, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pallas_config::DependencyProbe;
    use std::io::Write;

    fn run(args: &[&str]) -> Args {
        match Args::parse_from(args.iter().copied()).unwrap() {
            Parsed::Run(args) => args,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let args = run(&[]);
        assert_eq!(args.command, Command::Check);
        assert_eq!(args.context(), ResolveContext::Runtime);
        assert_eq!(args.source, EnvSource::ProcessAndDotenv);
        assert_eq!(args.overrides(), FeatureOverrides::new());
    }

    #[test]
    fn test_vars_with_format() {
        let args = run(&["vars", "--format", "json"]);
        assert_eq!(args.command, Command::Vars(OutputFormat::Json));
        assert_eq!(args.context(), ResolveContext::Build);

        let args = run(&["--test", "vars"]);
        assert_eq!(args.command, Command::Vars(OutputFormat::Table));
        assert_eq!(args.context(), ResolveContext::Test);
    }

    #[test]
    fn test_feature_flags() {
        let args = run(&["check", "--enable", "task_queue", "--disable", "cms", "--driver", "postgis"]);
        let overrides = args.overrides();
        assert_eq!(overrides.get(Feature::TaskQueue), Some(true));
        assert_eq!(overrides.get(Feature::Cms), Some(false));
        assert_eq!(args.driver, Some(DatabaseDriver::Postgis));
    }

    #[test]
    fn test_default_probe() {
        let args = run(&["show"]);
        let probe = args.probe();
        assert!(probe.is_installed("redis"));
        assert!(probe.is_installed("cms"));
        assert!(probe.is_installed("postgres"));
        assert!(!probe.is_installed("postgis"));
    }

    #[test]
    fn test_explicit_components() {
        let args = run(&["--component", "postgres", "--component", "redis"]);
        let probe = args.probe();
        assert!(probe.is_installed("redis"));
        assert!(!probe.is_installed("task-queue"));
    }

    #[test]
    fn test_env_sources() {
        assert_eq!(run(&["--no-dotenv"]).source, EnvSource::Process);
        assert_eq!(
            run(&["--env-file", "/tmp/app.env"]).source,
            EnvSource::ProcessAndFile(PathBuf::from("/tmp/app.env"))
        );
    }

    #[test]
    fn test_env_file_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "PALLAS_ENV_ARGS_FILE_ONLY=from-file").unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let snapshot = run(&["--env-file", path.as_str()]).snapshot().unwrap();
        assert_eq!(snapshot.get("PALLAS_ENV_ARGS_FILE_ONLY"), Some("from-file"));

        let missing = run(&["--env-file", "/nonexistent/pallas.env"]).snapshot();
        assert!(missing.is_err());
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(Args::parse_from(["--help"]).unwrap(), Parsed::Help);
        assert_eq!(Args::parse_from(["check", "-v"]).unwrap(), Parsed::Version);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Args::parse_from(["--frobnicate"]),
            Err(CliError::UnknownArgument { .. })
        ));
        assert!(matches!(
            Args::parse_from(["--enable"]),
            Err(CliError::MissingValue { .. })
        ));
        assert!(matches!(
            Args::parse_from(["--enable", "teleport"]),
            Err(CliError::InvalidValue { .. })
        ));
        assert!(matches!(
            Args::parse_from(["vars", "--format", "yaml"]),
            Err(CliError::InvalidValue { .. })
        ));
        // A second subcommand is not accepted.
        assert!(matches!(
            Args::parse_from(["check", "show"]),
            Err(CliError::UnknownArgument { .. })
        ));
    }

    #[test]
    fn test_verbose_logging() {
        let args = run(&["--verbose", "--log-format", "json"]);
        let config = args.log_config();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
    }
}
