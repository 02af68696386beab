//! schemarpc - Schema-typed RPC dispatcher tooling
//!
//! Inspects protocol declarations and shows how their messages resolve to
//! native handler signatures.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use schemarpc_core::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemarpc")]
#[command(about = "Inspect schema-typed RPC protocols and their handler signatures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List every message of a protocol with its resolved handler signature
    Inspect {
        /// Protocol declaration file (JSON)
        protocol: String,

        /// Unwrap nested arrays and maps down to their element type
        #[arg(short, long)]
        recursive: bool,
    },

    /// Print the native type identifier of a schema
    Resolve {
        /// Schema JSON (or @file.json to read from file)
        schema: String,

        /// Unwrap nested arrays and maps down to their element type
        #[arg(short, long)]
        recursive: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration (from file if SCHEMARPC_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    match commands::execute(&config, cli.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
