//! # Wrapped-Native Contract
//!
//! A fungible token minted 1:1 against native currency. `deposit` mints
//! tokens for value received; `withdraw` burns tokens for value paid out.
//! The contract only keeps the token side of the books: moving the native
//! currency in and out is the host's job (see
//! [`Sandbox`](crate::sandbox::Sandbox)), which keeps the native reserve
//! under the contract's own address.

use serde::{Deserialize, Serialize};

use strongbox_protocol::Address;

use crate::fungible_token::{FungibleToken, TokenError};

/// Native currency in token form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedNative {
    token: FungibleToken,
}

impl WrappedNative {
    /// Creates the contract with zero supply.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            token: FungibleToken::new(name, symbol, 18),
        }
    }

    /// The token side, for `balanceOf`/`transfer` style calls.
    pub fn token(&self) -> &FungibleToken {
        &self.token
    }

    /// Mutable token side.
    pub fn token_mut(&mut self) -> &mut FungibleToken {
        &mut self.token
    }

    /// Mints `value` tokens to `holder` for `value` of native currency the
    /// host has already moved into the reserve.
    pub fn deposit(&mut self, holder: &Address, value: u64) -> Result<(), TokenError> {
        self.token.mint(holder, value)
    }

    /// Burns `amount` of `holder`'s tokens; the host pays out the same
    /// amount of native currency from the reserve.
    pub fn withdraw(&mut self, holder: &Address, amount: u64) -> Result<(), TokenError> {
        self.token.burn(holder, amount)
    }
}
