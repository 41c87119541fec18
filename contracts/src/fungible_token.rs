//! # Fungible Token Contract
//!
//! A plain ERC-20-style token: balances, allowances, `transfer`,
//! `transferFrom`, plus unrestricted `mint`/`burn` for test and simulation
//! setups. The vault treats tokens as opaque collaborators; this
//! implementation exists so the sandbox has something real to call.
//!
//! ## Semantics
//!
//! - `transfer_from` checks the allowance before the balance, so a caller
//!   who never approved sees [`TokenError::InsufficientAllowance`] even when
//!   their balance is also short.
//! - An allowance of `u64::MAX` is infinite and never decremented.
//! - Transfers to the zero address are refused.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use strongbox_protocol::{Address, ExternalError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by token operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The sender does not hold enough tokens.
    #[error("insufficient balance: account has {balance}, needs {needed}")]
    InsufficientBalance {
        /// Current balance of the account.
        balance: u64,
        /// Amount the operation needed.
        needed: u64,
    },

    /// The spender was not approved for enough tokens.
    #[error("insufficient allowance: spender has {allowance}, needs {needed}")]
    InsufficientAllowance {
        /// Current allowance.
        allowance: u64,
        /// Amount the operation needed.
        needed: u64,
    },

    /// Minting would push the supply past `u64::MAX`.
    #[error("supply overflow: minting {amount} would exceed u64::MAX")]
    SupplyOverflow {
        /// The amount that was attempted.
        amount: u64,
    },

    /// Tokens cannot be sent to the zero address.
    #[error("invalid receiver: {0}")]
    InvalidReceiver(Address),
}

impl From<TokenError> for ExternalError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InsufficientBalance { balance, needed } => {
                ExternalError::InsufficientBalance { balance, needed }
            }
            TokenError::InsufficientAllowance { allowance, needed } => {
                ExternalError::InsufficientAllowance { allowance, needed }
            }
            other => ExternalError::Reverted(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// FungibleToken
// ---------------------------------------------------------------------------

/// An ERC-20-style fungible token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FungibleToken {
    /// Human-readable name (e.g., "MyToken").
    pub name: String,
    /// Ticker symbol (e.g., "MYT").
    pub symbol: String,
    /// Display precision. Arithmetic never divides.
    pub decimals: u8,
    /// Sum of all balances.
    total_supply: u64,
    /// Per-holder balances.
    balances: HashMap<Address, u64>,
    /// `owner -> (spender -> allowance)`.
    allowances: HashMap<Address, HashMap<Address, u64>>,
}

impl FungibleToken {
    /// Creates a token with zero supply.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Total tokens in existence.
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Balance of `owner`, zero if unknown.
    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Amount `spender` may still pull from `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances
            .get(owner)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Creates `amount` new tokens for `to`.
    ///
    /// # Errors
    ///
    /// [`TokenError::InvalidReceiver`] for the zero address,
    /// [`TokenError::SupplyOverflow`] if the supply would overflow.
    pub fn mint(&mut self, to: &Address, amount: u64) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::InvalidReceiver(*to));
        }
        // Every balance is bounded by the supply, so checking the supply
        // covers the recipient too.
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::SupplyOverflow { amount })?;
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    /// Destroys `amount` of `from`'s tokens.
    ///
    /// # Errors
    ///
    /// [`TokenError::InsufficientBalance`] if `from` holds less than `amount`.
    pub fn burn(&mut self, from: &Address, amount: u64) -> Result<(), TokenError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                balance,
                needed: amount,
            });
        }
        self.balances.insert(*from, balance - amount);
        self.total_supply -= amount;
        Ok(())
    }

    /// Sets the allowance of `spender` over `owner`'s tokens, replacing any
    /// previous value.
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u64) {
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
    }

    /// Moves `amount` from `sender` to `to`.
    ///
    /// # Errors
    ///
    /// [`TokenError::InvalidReceiver`] for the zero address,
    /// [`TokenError::InsufficientBalance`] if `sender` is short.
    pub fn transfer(
        &mut self,
        sender: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::InvalidReceiver(*to));
        }
        let balance = self.balance_of(sender);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                balance,
                needed: amount,
            });
        }
        self.balances.insert(*sender, balance - amount);
        *self.balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    ///
    /// # Errors
    ///
    /// [`TokenError::InsufficientAllowance`] first, then the errors of
    /// [`transfer`](Self::transfer). Nothing changes on error.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), TokenError> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                allowance,
                needed: amount,
            });
        }
        self.transfer(from, to, amount)?;
        if allowance != u64::MAX {
            self.approve(from, spender, allowance - amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    fn funded(amount: u64) -> FungibleToken {
        let mut token = FungibleToken::new("MyToken", "MYT", 18);
        token.mint(&alice(), amount).unwrap();
        token
    }

    #[test]
    fn mint_increases_supply_and_balance() {
        let token = funded(1_000);
        assert_eq!(token.total_supply(), 1_000);
        assert_eq!(token.balance_of(&alice()), 1_000);
    }

    #[test]
    fn mint_overflow_rejected() {
        let mut token = funded(u64::MAX);
        assert_eq!(
            token.mint(&bob(), 1),
            Err(TokenError::SupplyOverflow { amount: 1 })
        );
        assert_eq!(token.balance_of(&bob()), 0);
    }

    #[test]
    fn transfer_moves_balance() {
        let mut token = funded(100);
        token.transfer(&alice(), &bob(), 40).unwrap();
        assert_eq!(token.balance_of(&alice()), 60);
        assert_eq!(token.balance_of(&bob()), 40);
        assert_eq!(token.total_supply(), 100);
    }

    #[test]
    fn transfer_to_zero_rejected() {
        let mut token = funded(100);
        assert!(matches!(
            token.transfer(&alice(), &Address::ZERO, 1),
            Err(TokenError::InvalidReceiver(_))
        ));
    }

    #[test]
    fn transfer_from_requires_allowance_first() {
        let mut token = funded(10);
        let err = token.transfer_from(&bob(), &alice(), &bob(), 100).unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientAllowance {
                allowance: 0,
                needed: 100
            }
        );
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let mut token = funded(100);
        token.approve(&alice(), &bob(), 60);
        token.transfer_from(&bob(), &alice(), &bob(), 50).unwrap();
        assert_eq!(token.allowance(&alice(), &bob()), 10);
        assert_eq!(token.balance_of(&bob()), 50);
    }

    #[test]
    fn transfer_from_short_balance_keeps_allowance() {
        let mut token = funded(10);
        token.approve(&alice(), &bob(), 100);
        let err = token.transfer_from(&bob(), &alice(), &bob(), 50).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientBalance { balance: 10, .. }));
        assert_eq!(token.allowance(&alice(), &bob()), 100);
    }

    #[test]
    fn infinite_allowance_not_decremented() {
        let mut token = funded(100);
        token.approve(&alice(), &bob(), u64::MAX);
        token.transfer_from(&bob(), &alice(), &bob(), 30).unwrap();
        assert_eq!(token.allowance(&alice(), &bob()), u64::MAX);
    }

    #[test]
    fn burn_decreases_supply() {
        let mut token = funded(100);
        token.burn(&alice(), 30).unwrap();
        assert_eq!(token.total_supply(), 70);
        assert!(token.burn(&alice(), 71).is_err());
    }

    #[test]
    fn errors_map_onto_external_taxonomy() {
        let err: ExternalError = TokenError::InsufficientAllowance {
            allowance: 1,
            needed: 2,
        }
        .into();
        assert_eq!(
            err,
            ExternalError::InsufficientAllowance {
                allowance: 1,
                needed: 2
            }
        );
        let err: ExternalError = TokenError::InvalidReceiver(Address::ZERO).into();
        assert!(matches!(err, ExternalError::Reverted(_)));
    }
}
