//! autoscript CLI entry point.

use autoscript::cli::commands::{self, Output};
use autoscript::cli::{Cli, Commands};
use autoscript::config::Overrides;
use autoscript::error::Error;
use autoscript::sync::Verbosity;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let verbosity = Verbosity::from_flags(cli.silent, cli.verbose);
    init_tracing(verbosity);

    match run(&cli, verbosity) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                eprintln!("{}", e.to_structured_json());
            } else {
                report(&e, verbosity);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn report(e: &Error, verbosity: Verbosity) {
    let message = if verbosity == Verbosity::Detailed {
        e.detailed()
    } else {
        e.to_string()
    };
    match e.hint() {
        Some(hint) if verbosity > Verbosity::Silent => eprintln!("Error: {message}\n  Hint: {hint}"),
        _ => eprintln!("Error: {message}"),
    }
}

fn init_tracing(verbosity: Verbosity) {
    use tracing_subscriber::EnvFilter;

    // Honor RUST_LOG if set, otherwise use verbosity flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbosity {
            Verbosity::Silent => EnvFilter::new("error"),
            Verbosity::Normal => EnvFilter::new("warn"),
            Verbosity::Detailed => EnvFilter::new("debug,rusqlite=info"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, verbosity: Verbosity) -> Result<(), Error> {
    let overrides = Overrides {
        config: cli.config.as_deref(),
        db: cli.db.as_deref(),
        script_dir: cli.script_dir.as_deref(),
    };
    let output = Output {
        json: cli.json,
        verbosity,
    };

    match &cli.command {
        Commands::Deploy(args) => commands::deploy::execute(args, overrides, output),
        Commands::Fetch(args) => commands::fetch::execute(args, overrides, output),
        Commands::Diff(target) => commands::diff::execute(target, overrides, output),
        Commands::List => commands::list::execute(overrides, output),
        Commands::Version => commands::version::execute(cli.json),
        Commands::Completions { shell } => commands::completions::execute(*shell),
    }
}
