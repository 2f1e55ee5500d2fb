//! `pallas-env` entry point.

use tracing::debug;

use pallas_env::{Args, CliResult, Parsed};
use pallas_telemetry::init_logging;

fn print_help() {
    println!(
        r"pallas-env - check a Pallas deployment environment

USAGE:
    pallas-env [COMMAND] [OPTIONS]

COMMANDS:
    check                   Resolve the configuration and report the outcome (default)
    vars                    List every environment variable the configuration reads
    show                    Print the resolved configuration as JSON, secrets masked

OPTIONS:
    --build                 Resolve as an image build (placeholders for secrets)
    --test                  Resolve for automated tests (in-memory transports)
    --enable <FEATURE>      Force a feature on
    --disable <FEATURE>     Force a feature off
    --driver <DRIVER>       Database driver: postgres or postgis
    --component <NAME>      Declare an installed component (repeatable)
    --no-dotenv             Ignore .env in the working directory
    --env-file <PATH>       Read variables from PATH as well
    --format <FORMAT>       Output of vars: table or json (default: table)
    --log-format <FORMAT>   Log output: compact, pretty or json (default: compact)
    -V, --verbose           Debug logging
    -h, --help              Print help information
    -v, --version           Print version information

FEATURES:
    cache, task-queue, pub-sub, cms, storage, health-check

ENVIRONMENT VARIABLES:
    PALLAS_LOG              Log filter directives (e.g. pallas_config=debug)

EXAMPLES:
    # Fail a deploy early when the environment is incomplete
    pallas-env check

    # List configuration variables without any secrets available
    pallas-env vars --format json
"
    );
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        if e.is_usage() {
            eprintln!("Use --help for usage information");
        }
        std::process::exit(1);
    }
}

fn run() -> CliResult<()> {
    let args = match Args::parse_from(std::env::args().skip(1))? {
        Parsed::Run(args) => args,
        Parsed::Help => {
            print_help();
            return Ok(());
        }
        Parsed::Version => {
            println!("pallas-env {}", pallas_env::VERSION);
            return Ok(());
        }
    };

    init_logging(&args.log_config())?;

    let snapshot = args.snapshot()?;
    debug!(variables = snapshot.len(), context = ?args.context(), "Captured environment");

    let output = pallas_env::execute(&args, &snapshot)?;
    println!("{}", output.trim_end());
    Ok(())
}
