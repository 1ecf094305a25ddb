//! Coffre CLI — author, verify, and open encrypted document vaults.
//!
//! `seal` is the one-time offline authoring step; `verify` and `open`
//! exercise the same unlock path the embedding UI uses. No network I/O
//! happens anywhere in this binary.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

mod commands;
mod input;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Coffre — client-side encrypted document vault.
#[derive(Parser)]
#[command(name = "coffre", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose tracing output (to stderr)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Seal a directory of documents into an encrypted manifest
    Seal {
        /// Directory of input documents (.md, .markdown, .txt)
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Output manifest path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Check a manifest's schema and integrity digest against a passphrase
    Verify {
        /// Manifest file to verify
        #[arg(short, long, value_name = "FILE")]
        manifest: PathBuf,
    },

    /// Unlock a manifest and browse, list, or print its documents
    Open {
        /// Manifest file to unlock
        #[arg(short, long, value_name = "FILE")]
        manifest: PathBuf,

        /// Print this document's body instead of browsing
        #[arg(long, value_name = "ID")]
        id: Option<String>,

        /// Directory holding preferences.json (defaults to the manifest's
        /// directory)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(msg) = coffre_crypto_core::disable_core_dumps() {
        tracing::warn!(%msg, "core dumps remain enabled");
    }

    let result = match cli.command {
        Commands::Seal { input, output } => commands::seal::run(&input, &output),
        Commands::Verify { manifest } => commands::verify::run(&manifest),
        Commands::Open {
            manifest,
            id,
            data_dir,
        } => commands::open::run(&manifest, id.as_deref(), data_dir.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "coffre=debug,coffre_vault=debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
