//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Sync automation scripts between a local directory and the database
#[derive(Parser, Debug)]
#[command(name = "autoscript", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (default: ./autoscript.json, then ~/.autoscript/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database path, overrides DATABASE from the settings file
    #[arg(long, global = true, env = "AUTOSCRIPT_DB")]
    pub db: Option<PathBuf>,

    /// Script directory, overrides scriptDir from the settings file
    #[arg(long, global = true, env = "AUTOSCRIPT_SCRIPT_DIR")]
    pub script_dir: Option<PathBuf>,

    /// Verbosity: 1 = summary, 2 = detailed
    #[arg(
        short,
        long,
        global = true,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..=2)
    )]
    pub verbose: u8,

    /// Print nothing except errors
    #[arg(short, long, global = true)]
    pub silent: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy local scripts into the database
    Deploy(DeployArgs),

    /// Fetch scripts from the database into the script directory
    Fetch(FetchArgs),

    /// Compare local scripts against the database
    Diff(Target),

    /// List scripts stored in the database
    List,

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Which scripts a command applies to.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Script name (case-insensitive)
    #[arg(long, value_parser = parse_script_name)]
    pub script: Option<String>,

    /// Every script
    #[arg(short, long)]
    pub all: bool,
}

impl Target {
    /// The named script, or `None` for `--all`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.script.as_deref()
    }
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: Target,

    /// Show what would change without writing to the database
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub target: Target,

    /// Rewrite local files even when unchanged
    #[arg(short, long)]
    pub force: bool,
}

/// Script names are stored upper-case.
fn parse_script_name(value: &str) -> Result<String, String> {
    let name = value.trim();
    if name.is_empty() {
        return Err("script name must not be empty".to_string());
    }
    Ok(name.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("autoscript").chain(args.iter().copied()))
    }

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_script_is_upper_cased() {
        let cli = parse(&["deploy", "--script", "test1", "--dry-run"]).unwrap();
        let Commands::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.target.name(), Some("TEST1"));
        assert!(args.dry_run);
    }

    #[test]
    fn test_script_and_all_are_exclusive() {
        assert!(parse(&["fetch", "--script", "A", "--all"]).is_err());
    }

    #[test]
    fn test_target_is_required() {
        assert!(parse(&["diff"]).is_err());
        let cli = parse(&["diff", "-a"]).unwrap();
        assert!(matches!(cli.command, Commands::Diff(Target { all: true, .. })));
    }

    #[test]
    fn test_verbose_range() {
        assert!(parse(&["list", "-v", "3"]).is_err());
        assert_eq!(parse(&["list", "-v", "2"]).unwrap().verbose, 2);
        assert_eq!(parse(&["list"]).unwrap().verbose, 1);
    }

    #[test]
    fn test_fetch_force_short_flag() {
        let cli = parse(&["fetch", "-a", "-f"]).unwrap();
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert!(args.force);
        assert_eq!(args.target.name(), None);
    }
}
