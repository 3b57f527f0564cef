//! storylogic - consistency checking for narrative facts
//!
//! Command-line driver: replay scripted turns, parse single formulas, or
//! print a starter configuration.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use storylogic::{init_logging, parse_formula_with, LogLevel, ParseOptions, Session, StoryConfig, TurnInput};

#[derive(Parser)]
#[command(name = "storylogic")]
#[command(version)]
#[command(about = "Incremental first-order consistency checking for narrative facts", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the usual search path)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Solver profile (default, fast, thorough, or a custom profile)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a JSON list of turns through one session
    Run {
        /// JSON file holding an array of turn objects
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Write the session log to this file
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,

        /// Keep going after a turn fails to translate or solve
        #[arg(long)]
        keep_going: bool,
    },
    /// Parse a formula and print it back in normalised form
    Parse {
        formula: String,

        /// Do not append missing closing parentheses
        #[arg(long)]
        no_balance: bool,
    },
    /// Print a commented default configuration file
    InitConfig,
}

fn load_config(cli: &Cli) -> Result<StoryConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = StoryConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            config.apply_env_overrides()?;
            config
        }
        None => StoryConfig::load()?,
    };
    if let Some(profile) = &cli.profile {
        config.apply_profile(profile)?;
    }
    if cli.quiet {
        config.general.log_level = LogLevel::Quiet;
    } else if cli.verbose {
        config.general.log_level = LogLevel::Verbose;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.general.log_level);
    debug!(profile = config.solver.profile.as_str(), "configuration loaded");

    match &cli.command {
        Command::Run { script, export, keep_going } => {
            let content = fs::read_to_string(script)
                .with_context(|| format!("Failed to read script: {}", script.display()))?;
            let turns: Vec<TurnInput> = serde_json::from_str(&content)
                .with_context(|| format!("Invalid turn script: {}", script.display()))?;

            let mut session = Session::with_config(config);
            let mut failures = 0;
            for (i, turn) in turns.iter().enumerate() {
                match session.process_turn(turn) {
                    Ok(report) => println!("{}", report),
                    Err(err) if *keep_going => {
                        failures += 1;
                        eprintln!("Turn {} rejected [{}]: {}", i + 1, err.code().code(), err);
                    }
                    Err(err) => {
                        return Err(err).with_context(|| format!("Turn {} failed", i + 1));
                    }
                }
            }

            if let Some(path) = export {
                session
                    .export_logs(path)
                    .with_context(|| format!("Failed to export logs: {}", path.display()))?;
            }
            if failures > 0 {
                eprintln!("{} of {} turns rejected", failures, turns.len());
            }
        }
        Command::Parse { formula, no_balance } => {
            let options = ParseOptions { balance_parens: !no_balance };
            let parsed = parse_formula_with(formula, options)
                .map_err(|e| anyhow::anyhow!("Parse error: {}", e))?;
            println!("{}", parsed);
        }
        Command::InitConfig => {
            print!("{}", StoryConfig::default_config_content());
        }
    }

    Ok(())
}
