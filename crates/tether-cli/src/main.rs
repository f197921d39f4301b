//! Tether CLI - drive the native binding from a shell.
//!
//! Useful for checking that a build of the native module is where the host
//! expects it, carries the pinned hash, and honors the declared operations.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod theme;

use commands::{greeting, hello, inspect};

/// Tether - typed host binding for a native module
#[derive(Parser)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Load the native module from this file instead of the configured location
    #[arg(long, global = true, value_name = "PATH")]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the host-side greeting (never loads the native module)
    Greeting,
    /// Call the native `hello` operation
    Hello,
    /// Show where the native module is, what it exports, and whether it matches
    Inspect,
}

/// How command results are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text.
    Text,
    /// One JSON document on stdout.
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let workspace_root = std::env::current_dir().ok();
    let resolved = tether_config::Config::load(workspace_root.as_deref());

    // Set up logging from config, with --verbose override.
    let log_config = match &resolved {
        Ok(r) => {
            let mut lc = tether_telemetry::LogConfig::try_from(&r.config.logging)?;
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        Err(_) => {
            let level = if cli.verbose { "debug" } else { "warn" };
            tether_telemetry::LogConfig::new(level)
        },
    };
    if let Err(e) = tether_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Greeting => greeting::run(cli.format),
        Commands::Hello => {
            let section =
                commands::native_section(resolved.map(|r| r.config.native), cli.library.as_ref())?;
            hello::run(commands::native_source(&section, cli.library), cli.format)
        },
        Commands::Inspect => {
            let section =
                commands::native_section(resolved.map(|r| r.config.native), cli.library.as_ref())?;
            inspect::run(commands::native_source(&section, cli.library), cli.format)
        },
    }
}
