//! # Strongbox Reference Contracts
//!
//! The collaborators a [`Vault`](strongbox_protocol::Vault) talks to, written
//! as plain Rust state machines so the vault can be exercised end to end
//! without a real chain:
//!
//! - **Fungible Token** — ERC-20-style balances and allowances.
//! - **Wrapped Native** — a token minted 1:1 against native currency.
//! - **Sandbox** — an in-memory host that owns native balances and deployed
//!   contracts and implements [`Environment`](strongbox_protocol::Environment)
//!   with checkpoint/revert semantics.
//!
//! ## Design Principles
//!
//! 1. Every monetary operation is checked: `checked_add` on the way in,
//!    explicit shortfall errors on the way out.
//! 2. A failed call changes nothing. Multi-step calls run under a sandbox
//!    checkpoint.
//! 3. Contract errors map onto [`ExternalError`](strongbox_protocol::ExternalError)
//!    so the vault sees one taxonomy whatever it calls.

pub mod fungible_token;
pub mod sandbox;
pub mod wrapped_native;
