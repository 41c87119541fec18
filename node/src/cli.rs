//! # CLI Interface
//!
//! Defines the command-line argument structure for `strongbox-node` using
//! `clap` derive. Supports two subcommands: `simulate` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use strongbox_protocol::ExcessValuePolicy;

/// Strongbox vault simulator.
///
/// Runs scripted deposit, withdraw, wrap and unwrap sequences against an
/// in-memory host and reports every event, balance and audit as JSON.
#[derive(Parser, Debug)]
#[command(
    name = "strongbox-node",
    about = "Strongbox vault simulator",
    version,
    propagate_version = true
)]
pub struct StrongboxNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Strongbox binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a JSON scenario against a fresh sandbox.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Path to the scenario file (JSON).
    pub scenario: PathBuf,

    /// Write the final vault state to this file as JSON.
    #[arg(long, short = 's')]
    pub snapshot: Option<PathBuf>,

    /// Stop at the first failing step instead of reporting and moving on.
    #[arg(long)]
    pub fail_fast: bool,

    /// Admin account label. Overrides the scenario's `admin`.
    #[arg(long, env = "VAULT_ADMIN")]
    pub admin: Option<String>,

    /// How surplus attached value is handled: refund, reject or retain.
    /// Overrides the scenario's `excess_value`.
    #[arg(long, env = "VAULT_EXCESS_VALUE")]
    pub excess_value: Option<ExcessValuePolicy>,

    /// Log output format: pretty or json.
    #[arg(long, env = "VAULT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}
