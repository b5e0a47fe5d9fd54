//! Crossway command-line explorer
//!
//! Resolves names and inspects classes of a host classpath through the same
//! bridge a guest runtime would use. The host is the in-memory reference
//! runtime, optionally extended with a TOML host manifest.

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use crossway_core::config::{LogFormat, LogLevel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crossway")]
#[command(about = "Explore a host classpath through the Crossway bridge", long_about = None)]
#[command(version)]
struct Cli {
    /// Host manifest declaring extra classes and archives
    #[arg(short, long, global = true)]
    manifest: Option<PathBuf>,

    /// Bridge configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides the config
    #[arg(long, global = true, value_parser = logging::parse_level)]
    log_level: Option<LogLevel>,

    /// Log format (text, json); overrides the config
    #[arg(long, global = true, value_parser = logging::parse_format)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve dotted names or guest paths to packages and classes
    Resolve {
        /// Names such as `java.util.zip` or `Java::JavaUtil::StringTokenizer`
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Describe a class: modifiers, supertypes, annotations and methods
    Describe {
        /// Fully-qualified class name
        class: String,
    },

    /// List the guest protocols a class gains from its foreign interfaces
    Capabilities {
        /// Fully-qualified class name
        class: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;
    logging::init(logging::LogOptions::merge(
        config.logging,
        cli.log_level,
        cli.log_format,
    ));
    tracing::debug!(config = ?cli.config, manifest = ?cli.manifest, "starting");

    let bridge = commands::build_bridge(cli.manifest.as_deref(), config)?;

    match cli.command {
        Commands::Resolve { names } => commands::resolve::execute(&bridge, &names),
        Commands::Describe { class } => commands::describe::execute(&bridge, &class),
        Commands::Capabilities { class } => commands::capabilities::execute(&bridge, &class),
    }
}
