// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Strongbox Simulator
//!
//! Entry point for the `strongbox-node` binary. Parses CLI arguments,
//! initializes logging, and runs vault scenarios against an in-memory host.
//!
//! The binary supports two subcommands:
//!
//! - `simulate` — run a JSON scenario and print per-step results, final
//!   balances and the custody audit
//! - `version`  — print build version information

mod cli;
mod logging;
mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;

use cli::{Commands, SimulateArgs, StrongboxNodeCli};
use logging::LogFormat;
use scenario::Scenario;

fn main() -> Result<()> {
    let cli = StrongboxNodeCli::parse();

    match cli.command {
        Commands::Simulate(args) => simulate(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Loads the scenario, applies CLI overrides and runs it.
fn simulate(args: SimulateArgs) -> Result<()> {
    logging::init_logging(
        "strongbox_node=info,strongbox_protocol=info,strongbox_contracts=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let mut scenario = Scenario::load(&args.scenario)?;
    if let Some(admin) = args.admin {
        scenario.admin = admin;
    }
    if let Some(policy) = args.excess_value {
        scenario.excess_value = policy;
    }

    tracing::info!(
        scenario = %args.scenario.display(),
        steps = scenario.steps.len(),
        excess_value = %scenario.excess_value,
        fail_fast = args.fail_fast,
        "starting simulation"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let sim = scenario::run(&scenario, args.fail_fast, &mut out)?;
    out.flush()?;

    if let Some(path) = args.snapshot {
        let json = serde_json::to_string_pretty(sim.vault())
            .context("failed to serialize vault snapshot")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write snapshot: {}", path.display()))?;
        tracing::info!(path = %path.display(), "vault snapshot written");
    }

    Ok(())
}

/// Prints the binary version, protocol version, and build info.
fn print_version() {
    println!("strongbox-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", strongbox_protocol::config::PROTOCOL_VERSION);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
