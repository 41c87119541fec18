//! # Vault Errors
//!
//! Every failure is synchronous and final for the call that raised it: by
//! the time a [`VaultError`] reaches the caller, the vault's ledger is
//! exactly as it was before the call. The only recovery is to call again
//! with different parameters.

use thiserror::Error;

use crate::address::Address;
use crate::asset::Asset;
use crate::environment::ExternalError;
use crate::ledger::LedgerError;

/// Errors returned by vault operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// A native deposit attached less value than it asked to credit.
    #[error("insufficient funds: attached {attached}, deposit amount {amount}")]
    InsufficientFunds {
        /// Native value attached to the call.
        attached: u64,
        /// Amount the caller asked to credit.
        amount: u64,
    },

    /// Attached value beyond the credited amount, refused by the
    /// `reject` excess-value policy.
    #[error("unexpected attached value: attached {attached}, expected {expected}")]
    ExcessValue {
        /// Native value attached to the call.
        attached: u64,
        /// Value the deposit actually needed.
        expected: u64,
    },

    /// Withdrawal larger than the tracked balance.
    #[error("withdraw amount exceeds balance: {asset} available {available}, requested {requested}")]
    ExceedsBalance {
        /// Asset being withdrawn.
        asset: Asset,
        /// Tracked balance.
        available: u64,
        /// Amount requested.
        requested: u64,
    },

    /// Wrap larger than the tracked native balance.
    #[error("wrap amount exceeds deposited native: available {available}, requested {requested}")]
    ExceedsDepositedNative {
        /// Tracked native balance.
        available: u64,
        /// Amount requested.
        requested: u64,
    },

    /// Unwrap larger than the tracked wrapped balance.
    #[error("unwrap amount exceeds wrapped balance: available {available}, requested {requested}")]
    ExceedsWrappedBalance {
        /// Tracked wrapped balance.
        available: u64,
        /// Amount requested.
        requested: u64,
    },

    /// A credit would overflow the owner's entry.
    #[error("balance overflow for {owner} in {asset}: current {current}, credit {credit}")]
    BalanceOverflow {
        /// Asset of the entry.
        asset: Asset,
        /// Owner of the entry.
        owner: Address,
        /// Current amount.
        current: u64,
        /// Amount that caused the overflow.
        credit: u64,
    },

    /// A collaborator call failed; propagated unchanged.
    #[error(transparent)]
    External(#[from] ExternalError),

    /// The construction-time configuration is unusable.
    #[error("invalid vault configuration: {0}")]
    InvalidConfig(String),
}

impl VaultError {
    /// Maps a staging failure outside the debit path. Debit shortfalls are
    /// translated by each operation into its own error, so only overflow is
    /// expected here.
    pub(crate) fn from_credit(err: LedgerError) -> Self {
        match err {
            LedgerError::Overflow {
                asset,
                owner,
                current,
                credit,
            } => VaultError::BalanceOverflow {
                asset,
                owner,
                current,
                credit,
            },
            LedgerError::Insufficient {
                asset,
                available,
                requested,
                ..
            } => VaultError::ExceedsBalance {
                asset,
                available,
                requested,
            },
        }
    }
}
