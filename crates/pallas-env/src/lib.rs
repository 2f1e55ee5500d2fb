//! `pallas-env`: check a deployment environment before starting a server.
//!
//! The command resolves the same configuration tree a Pallas server would
//! build at startup and either reports success, lists the variables the
//! resolution consulted, or prints the tree with secrets masked.
//!
//! # Example Usage
//!
//! ```bash
//! # Fail fast in a deploy pipeline
//! $ pallas-env check
//! ok: environment production, 14 variables, subsystems: cache, database, email, ...
//!
//! # Document the configuration surface without any secrets at hand
//! $ pallas-env vars --format json
//!
//! # Inspect what a server would see, with the queue forced off
//! $ pallas-env show --disable task-queue
//! ```
//!
//! On failure the command prints `error: <message>` naming the offending
//! variable or mode and exits with status 1.

#![warn(missing_docs)]

pub mod args;
pub mod error;
pub mod report;

pub use args::{Args, Command, EnvSource, OutputFormat, Parsed};
pub use error::{CliError, CliResult};

use pallas_config::{ConfigResolver, EnvironmentSnapshot};

/// Command version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve `snapshot` as described by `args` and render the command output.
pub fn execute(args: &Args, snapshot: &EnvironmentSnapshot) -> CliResult<String> {
    let probe = args.probe();
    let tree = ConfigResolver::new(snapshot, args.overrides(), &probe)
        .context(args.context())
        .resolve()?;

    match args.command {
        Command::Check => Ok(report::render_check(&tree)),
        Command::Vars(format) => report::render_vars(tree.used_variables(), format),
        Command::Show => report::render_tree(&tree),
    }
}
