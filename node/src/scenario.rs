//! # Scenario Runner
//!
//! A scenario is a JSON document describing a small world (funded
//! accounts, deployed tokens) and a list of vault calls to make in it.
//! Accounts and tokens are referred to by label; addresses are derived
//! from the labels so runs are reproducible.
//!
//! ```json
//! {
//!   "admin": "admin",
//!   "excess_value": "refund",
//!   "accounts": { "alice": 1000 },
//!   "tokens": [{ "symbol": "TST", "mint": { "alice": 500 } }],
//!   "steps": [
//!     { "op": "approve", "owner": "alice", "token": "TST", "amount": 100 },
//!     { "op": "deposit", "caller": "alice", "asset": "TST", "amount": 100 },
//!     { "op": "deposit", "caller": "alice", "asset": "native", "amount": 5, "value": 5 },
//!     { "op": "wrap", "caller": "alice", "amount": 5 }
//!   ]
//! }
//! ```
//!
//! Assets are `"native"`, `"wrapped"`, or a token symbol. Output is JSON
//! lines: one per step, then a last line with balances and the custody
//! audit.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use strongbox_contracts::sandbox::Sandbox;
use strongbox_protocol::config::NATIVE_SYMBOL;
use strongbox_protocol::{
    Address, Asset, AssetAudit, ExcessValuePolicy, Vault, VaultError, VaultEvent,
};

const WRAPPED_NAME: &str = "Wrapped Native";
const WRAPPED_SYMBOL: &str = "WNAT";

// ---------------------------------------------------------------------------
// Scenario format
// ---------------------------------------------------------------------------

fn default_admin() -> String {
    "admin".to_string()
}

fn default_decimals() -> u8 {
    18
}

/// A scripted simulation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Label of the vault's admin account.
    #[serde(default = "default_admin")]
    pub admin: String,
    /// Surplus attached-value handling.
    #[serde(default)]
    pub excess_value: ExcessValuePolicy,
    /// Native funding per account label.
    #[serde(default)]
    pub accounts: BTreeMap<String, u64>,
    /// Tokens to deploy, in order.
    #[serde(default)]
    pub tokens: Vec<TokenSpec>,
    /// Calls to make.
    pub steps: Vec<Step>,
}

/// A token deployed before the first step.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSpec {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Initial balances per account label.
    #[serde(default)]
    pub mint: BTreeMap<String, u64>,
}

/// One call.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// `owner` approves the vault to pull `amount` of `token`.
    Approve {
        owner: String,
        token: String,
        amount: u64,
    },
    /// Deposit with `value` of native currency attached.
    Deposit {
        caller: String,
        asset: String,
        amount: u64,
        #[serde(default)]
        value: u64,
    },
    Withdraw {
        caller: String,
        asset: String,
        amount: u64,
    },
    Wrap {
        caller: String,
        amount: u64,
    },
    Unwrap {
        caller: String,
        amount: u64,
    },
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Step::Approve { .. } => "approve",
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::Wrap { .. } => "wrap",
            Step::Unwrap { .. } => "unwrap",
        }
    }
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse scenario: {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of one step, printed as a JSON line.
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<VaultEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One non-zero ledger entry, labelled.
#[derive(Debug, Serialize)]
pub struct BalanceLine {
    pub owner: String,
    pub asset: Asset,
    pub amount: u64,
}

/// Printed after the last step.
#[derive(Debug, Serialize)]
pub struct FinalReport {
    pub vault: Address,
    pub wrapped_native: Address,
    pub tokens: BTreeMap<String, Address>,
    pub failures: usize,
    pub balances: Vec<BalanceLine>,
    pub audit: Vec<AssetAudit>,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// A sandbox with a deployed vault and the label tables to address it.
pub struct Simulation {
    chain: Sandbox,
    vault: Vault,
    tokens: BTreeMap<String, Address>,
    labels: HashMap<Address, String>,
}

impl Simulation {
    /// Deploys the wrapped-native contract, the vault and the scenario's
    /// tokens, and funds its accounts.
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let mut chain = Sandbox::new();
        let mut labels = HashMap::new();
        let mut account = |label: &str| {
            let address = Address::derive(label);
            labels.insert(address, label.to_string());
            address
        };

        chain.deploy_wrapped_native(WRAPPED_NAME, WRAPPED_SYMBOL)?;
        let admin = account(&scenario.admin);
        let vault = chain.deploy_vault(&admin, scenario.excess_value)?;

        for (label, amount) in &scenario.accounts {
            chain
                .fund(&account(label), *amount)
                .with_context(|| format!("failed to fund {label}"))?;
        }

        let mut tokens = BTreeMap::new();
        for spec in &scenario.tokens {
            if spec.symbol.eq_ignore_ascii_case(NATIVE_SYMBOL)
                || spec.symbol.eq_ignore_ascii_case("wrapped")
                || tokens.contains_key(&spec.symbol)
            {
                bail!("token symbol '{}' is reserved or already used", spec.symbol);
            }
            let name = spec.name.as_deref().unwrap_or(&spec.symbol);
            let token = chain.deploy_token(name, &spec.symbol, spec.decimals);
            for (label, amount) in &spec.mint {
                chain
                    .mint(&token, &account(label), *amount)
                    .with_context(|| format!("failed to mint {} to {label}", spec.symbol))?;
            }
            tokens.insert(spec.symbol.clone(), token);
        }

        info!(
            vault = %vault.address(),
            tokens = tokens.len(),
            accounts = scenario.accounts.len(),
            "simulation deployed"
        );
        Ok(Self {
            chain,
            vault,
            tokens,
            labels,
        })
    }

    /// The vault in its current state.
    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    fn caller(&mut self, label: &str) -> Address {
        let address = Address::derive(label);
        self.labels.entry(address).or_insert_with(|| label.to_string());
        address
    }

    fn token(&self, symbol: &str) -> Result<Address> {
        if symbol.eq_ignore_ascii_case("wrapped") {
            return Ok(self.vault.wrapped_native());
        }
        match self.tokens.get(symbol) {
            Some(address) => Ok(*address),
            None => bail!("unknown token '{symbol}'"),
        }
    }

    fn asset(&self, name: &str) -> Result<Asset> {
        if name.eq_ignore_ascii_case(NATIVE_SYMBOL) {
            return Ok(Asset::Native);
        }
        self.token(name).map(Asset::Token)
    }

    /// Applies one step.
    ///
    /// The outer error is a malformed step (unknown token or asset). The
    /// inner result is the vault's answer; approvals produce no event.
    pub fn apply(&mut self, step: &Step) -> Result<Result<Option<VaultEvent>, VaultError>> {
        let vault = self.vault.address();
        let outcome = match step {
            Step::Approve {
                owner,
                token,
                amount,
            } => {
                let token = self.token(token)?;
                let owner = self.caller(owner);
                self.chain.approve(&token, &owner, &vault, *amount)?;
                Ok(None)
            }
            Step::Deposit {
                caller,
                asset,
                amount,
                value,
            } => {
                let asset = self.asset(asset)?;
                let caller = self.caller(caller);
                self.chain
                    .call_deposit(&mut self.vault, &caller, asset, *amount, *value)
                    .map(Some)
            }
            Step::Withdraw {
                caller,
                asset,
                amount,
            } => {
                let asset = self.asset(asset)?;
                let caller = self.caller(caller);
                self.vault
                    .withdraw(&mut self.chain, &caller, asset, *amount)
                    .map(Some)
            }
            Step::Wrap { caller, amount } => {
                let caller = self.caller(caller);
                self.vault.wrap(&mut self.chain, &caller, *amount).map(Some)
            }
            Step::Unwrap { caller, amount } => {
                let caller = self.caller(caller);
                self.vault
                    .unwrap(&mut self.chain, &caller, *amount)
                    .map(Some)
            }
        };
        Ok(outcome)
    }

    /// Balances and audit after the last step.
    pub fn report(&self, failures: usize) -> Result<FinalReport> {
        let balances = self
            .vault
            .ledger()
            .entries()
            .filter(|(_, _, amount)| *amount > 0)
            .map(|(asset, owner, amount)| BalanceLine {
                owner: self
                    .labels
                    .get(&owner)
                    .cloned()
                    .unwrap_or_else(|| owner.to_hex()),
                asset,
                amount,
            })
            .collect();
        let audit = self
            .vault
            .audit(&self.chain)
            .context("failed to audit vault custody")?;
        Ok(FinalReport {
            vault: self.vault.address(),
            wrapped_native: self.vault.wrapped_native(),
            tokens: self.tokens.clone(),
            failures,
            balances,
            audit,
        })
    }
}

/// Runs every step of `scenario`, writing one JSON line per step and then
/// the final report to `out`. Returns the simulation for inspection.
///
/// With `fail_fast`, the first failing step aborts the run with an error.
pub fn run<W: Write>(scenario: &Scenario, fail_fast: bool, out: &mut W) -> Result<Simulation> {
    let mut sim = Simulation::new(scenario)?;
    let mut failures = 0;

    for (index, step) in scenario.steps.iter().enumerate() {
        let outcome = sim
            .apply(step)
            .with_context(|| format!("step {index} ({}) is malformed", step.op()))?;
        let report = match outcome {
            Ok(event) => {
                info!(step = index, op = step.op(), "step applied");
                StepReport {
                    step: index,
                    op: step.op(),
                    ok: true,
                    event,
                    error: None,
                }
            }
            Err(err) => {
                warn!(step = index, op = step.op(), error = %err, "step failed");
                failures += 1;
                StepReport {
                    step: index,
                    op: step.op(),
                    ok: false,
                    event: None,
                    error: Some(err.to_string()),
                }
            }
        };
        serde_json::to_writer(&mut *out, &report)?;
        writeln!(out)?;
        if fail_fast && !report.ok {
            bail!(
                "step {index} ({}) failed: {}",
                step.op(),
                report.error.unwrap_or_default()
            );
        }
    }

    serde_json::to_writer(&mut *out, &sim.report(failures)?)?;
    writeln!(out)?;
    Ok(sim)
}
