// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Strongbox Protocol — Vault Ledger Core
//!
//! Strongbox is a custodial multi-asset vault. Users deposit native currency
//! or fungible tokens, the vault tracks what each of them is owed per asset,
//! and they can withdraw up to that amount or swap tracked native currency
//! for a wrapped-token balance and back.
//!
//! Custody lives outside this crate: the host platform holds native currency
//! and token contracts hold token balances, both under the vault's address.
//! What lives here is the bookkeeping, and the rules that keep it honest.
//!
//! ## Architecture
//!
//! - **address** — 20-byte account and contract identifiers.
//! - **asset** — native currency vs. token contract, with the zero-address
//!   sentinel kept at the edges.
//! - **ledger** — the `(asset, owner) -> amount` table with staged,
//!   reversible postings.
//! - **environment** — the trait through which the vault reaches tokens,
//!   the wrapped-native contract and native transfers.
//! - **vault** — deposit, withdraw, wrap, unwrap.
//! - **events** / **error** — what callers observe.
//! - **config** — construction-time parameters and constants.
//!
//! ## Invariants
//!
//! 1. No balance is ever negative: debits that would underflow are refused.
//! 2. For every asset, the sum of tracked balances never exceeds what the
//!    vault actually holds. Debits land before funds leave; credits land
//!    only after funds arrive.
//! 3. Every operation is all-or-nothing. A failed external call rolls back
//!    the ledger and the host state together.

pub mod address;
pub mod asset;
pub mod config;
pub mod environment;
pub mod error;
pub mod events;
pub mod ledger;
pub mod vault;

pub use address::Address;
pub use asset::Asset;
pub use config::{ExcessValuePolicy, VaultConfig};
pub use environment::{Checkpoint, Environment, ExternalError};
pub use error::VaultError;
pub use events::VaultEvent;
pub use ledger::BalanceLedger;
pub use vault::{AssetAudit, Vault};
