//! # Vault Events
//!
//! One event per successful operation. Events are appended to the vault's
//! log only once an operation has fully applied, so a failed call never
//! leaves an event behind.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::asset::Asset;

/// Observable record of a committed vault operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    /// `owner` deposited `amount` of `asset`.
    Deposited {
        owner: Address,
        asset: Asset,
        amount: u64,
    },
    /// `owner` withdrew `amount` of `asset`.
    Withdrawn {
        owner: Address,
        asset: Asset,
        amount: u64,
    },
    /// `owner` converted `amount` of tracked native currency into wrapped
    /// tokens.
    NativeWrapped { owner: Address, amount: u64 },
    /// `owner` converted `amount` of tracked wrapped tokens back into native
    /// currency.
    NativeUnwrapped { owner: Address, amount: u64 },
}

impl VaultEvent {
    /// The account whose balance changed.
    pub fn owner(&self) -> Address {
        match self {
            VaultEvent::Deposited { owner, .. }
            | VaultEvent::Withdrawn { owner, .. }
            | VaultEvent::NativeWrapped { owner, .. }
            | VaultEvent::NativeUnwrapped { owner, .. } => *owner,
        }
    }

    /// The amount moved.
    pub fn amount(&self) -> u64 {
        match self {
            VaultEvent::Deposited { amount, .. }
            | VaultEvent::Withdrawn { amount, .. }
            | VaultEvent::NativeWrapped { amount, .. }
            | VaultEvent::NativeUnwrapped { amount, .. } => *amount,
        }
    }

    /// The asset the event is about. Wrap and unwrap imply an asset rather
    /// than carry one: the source side of the conversion, native for a wrap
    /// and the `wrapped` token for an unwrap.
    pub fn asset(&self, wrapped: Address) -> Asset {
        match self {
            VaultEvent::Deposited { asset, .. } | VaultEvent::Withdrawn { asset, .. } => *asset,
            VaultEvent::NativeWrapped { .. } => Asset::Native,
            VaultEvent::NativeUnwrapped { .. } => Asset::Token(wrapped),
        }
    }
}

impl fmt::Display for VaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultEvent::Deposited {
                owner,
                asset,
                amount,
            } => write!(f, "Deposited({}, {}, {})", owner, asset, amount),
            VaultEvent::Withdrawn {
                owner,
                asset,
                amount,
            } => write!(f, "Withdrawn({}, {}, {})", owner, asset, amount),
            VaultEvent::NativeWrapped { owner, amount } => {
                write!(f, "NativeWrapped({}, {})", owner, amount)
            }
            VaultEvent::NativeUnwrapped { owner, amount } => {
                write!(f, "NativeUnwrapped({}, {})", owner, amount)
            }
        }
    }
}
