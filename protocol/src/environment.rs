//! # Execution Environment
//!
//! The vault never holds funds itself in any Rust sense -- custody lives in
//! the host platform (native currency) and in external token contracts. The
//! [`Environment`] trait is the vault's only window onto that world: a
//! native-currency transfer primitive, the fungible-token calls
//! (`balanceOf`, `transfer`, `transferFrom`), and the wrapped-native
//! conversion pair.
//!
//! Contracts are resolved by address on every call; the vault keeps no
//! registry of token handles.
//!
//! ## Contract
//!
//! Every mutating method is atomic from the vault's point of view: it either
//! applies completely and returns `Ok`, or returns `Err` having changed
//! nothing. When one operation needs several calls, it brackets them with
//! [`Environment::checkpoint`] and either [`Environment::release`]s the
//! checkpoint or [`Environment::revert_to`]s it, the way a platform journal
//! discards a reverted call frame.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::asset::Asset;

/// Failures reported by external contracts or the native transfer primitive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExternalError {
    /// `transferFrom` was not pre-authorized for the requested amount.
    #[error("insufficient allowance: allowance {allowance}, needed {needed}")]
    InsufficientAllowance {
        /// Allowance currently granted to the spender.
        allowance: u64,
        /// Amount the transfer required.
        needed: u64,
    },

    /// The sender's external balance is too low.
    #[error("insufficient balance: balance {balance}, needed {needed}")]
    InsufficientBalance {
        /// Sender's balance.
        balance: u64,
        /// Amount the transfer required.
        needed: u64,
    },

    /// No contract is deployed at the given address.
    #[error("no contract deployed at {0}")]
    UnknownContract(Address),

    /// The recipient refused an incoming native-currency transfer.
    #[error("recipient {0} rejected native currency")]
    NativeTransferRejected(Address),

    /// Any other revert, with the contract's reason string.
    #[error("external call reverted: {0}")]
    Reverted(String),
}

/// Handle to a point in the host's state journal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checkpoint(pub usize);

/// Host-side capabilities the vault consumes.
pub trait Environment {
    /// Opens a revert scope over all external state.
    fn checkpoint(&mut self) -> Checkpoint;

    /// Discards every external change made since `checkpoint`, closing the
    /// scope and any scope opened after it.
    fn revert_to(&mut self, checkpoint: Checkpoint);

    /// Keeps the changes made since `checkpoint` and closes the scope.
    fn release(&mut self, checkpoint: Checkpoint);

    /// Native currency held by `account`.
    fn native_balance(&self, account: &Address) -> u64;

    /// Moves native currency from `from` to `to`.
    fn transfer_native(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), ExternalError>;

    /// `token.balanceOf(owner)`.
    fn token_balance_of(&self, token: &Address, owner: &Address) -> Result<u64, ExternalError>;

    /// `token.transfer(to, amount)` sent by `sender`.
    fn token_transfer(
        &mut self,
        token: &Address,
        sender: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), ExternalError>;

    /// `token.transferFrom(from, to, amount)` sent by `spender`.
    fn token_transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), ExternalError>;

    /// Converts `amount` of `holder`'s native currency into the same amount
    /// of `wrapper`'s token, credited to `holder`.
    fn wrap_native(
        &mut self,
        wrapper: &Address,
        holder: &Address,
        amount: u64,
    ) -> Result<(), ExternalError>;

    /// Converts `amount` of `holder`'s `wrapper` tokens back into the same
    /// amount of native currency, paid to `holder`.
    fn unwrap_native(
        &mut self,
        wrapper: &Address,
        holder: &Address,
        amount: u64,
    ) -> Result<(), ExternalError>;

    /// Actual holdings of `asset` by `holder`, whichever primitive backs it.
    fn custody_of(&self, asset: Asset, holder: &Address) -> Result<u64, ExternalError> {
        match asset {
            Asset::Native => Ok(self.native_balance(holder)),
            Asset::Token(token) => self.token_balance_of(&token, holder),
        }
    }
}
