//! # Sandbox Host
//!
//! An in-memory stand-in for the platform the vault is deployed on. It owns
//! native-currency balances, the deployed token contracts and the single
//! wrapped-native contract, and implements
//! [`Environment`] so a [`Vault`] can be driven against it.
//!
//! ## Reverts
//!
//! The sandbox keeps a journal of full state copies. A checkpoint pushes
//! the current state; reverting pops back to it. This is crude next to a
//! real platform's per-slot journal but gives the same observable
//! semantics, which is all tests and simulations need.
//!
//! ## Payable calls
//!
//! [`Sandbox::call_deposit`] models a deposit with attached value the way a
//! platform does: the value moves from the caller to the vault before the
//! vault runs, and the whole call (value transfer included) is reverted if
//! the vault returns an error.

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, trace};

use strongbox_protocol::{
    Address, Asset, Checkpoint, Environment, ExcessValuePolicy, ExternalError, Vault, VaultConfig,
    VaultError, VaultEvent,
};

use crate::fungible_token::FungibleToken;
use crate::wrapped_native::WrappedNative;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by sandbox setup calls.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// No token is deployed at the address.
    #[error("no token deployed at {0}")]
    UnknownToken(Address),

    /// Only one wrapped-native contract may exist.
    #[error("wrapped-native contract already deployed at {0}")]
    WrappedNativeExists(Address),

    /// A vault needs a wrapped-native contract to point at.
    #[error("deploy the wrapped-native contract before the vault")]
    WrappedNativeMissing,

    /// Funding would overflow an account's native balance.
    #[error("native balance overflow for {0}")]
    NativeOverflow(Address),

    /// A token call failed during setup.
    #[error(transparent)]
    External(#[from] ExternalError),

    /// Vault construction failed.
    #[error(transparent)]
    Vault(#[from] VaultError),
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct ChainState {
    native: HashMap<Address, u64>,
    tokens: HashMap<Address, FungibleToken>,
    wrapped: Option<(Address, WrappedNative)>,
}

/// In-memory host implementing [`Environment`].
#[derive(Debug, Clone)]
pub struct Sandbox {
    /// Account that deploys every contract; feeds contract address
    /// derivation.
    deployer: Address,
    /// Deployment counter.
    nonce: u64,
    state: ChainState,
    journal: Vec<ChainState>,
    /// Accounts that refuse incoming native currency.
    rejecting: HashSet<Address>,
}

impl Sandbox {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            deployer: Address::derive("sandbox-deployer"),
            nonce: 0,
            state: ChainState::default(),
            journal: Vec::new(),
            rejecting: HashSet::new(),
        }
    }

    fn next_contract_address(&mut self) -> Address {
        let address = Address::contract(&self.deployer, self.nonce);
        self.nonce += 1;
        address
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Credits `amount` of native currency to `account` out of thin air.
    pub fn fund(&mut self, account: &Address, amount: u64) -> Result<(), SandboxError> {
        let balance = self.state.native.entry(*account).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(SandboxError::NativeOverflow(*account))?;
        trace!(account = %account, amount, "funded");
        Ok(())
    }

    /// Deploys a new fungible token and returns its address.
    pub fn deploy_token(&mut self, name: &str, symbol: &str, decimals: u8) -> Address {
        let address = self.next_contract_address();
        self.state
            .tokens
            .insert(address, FungibleToken::new(name, symbol, decimals));
        debug!(token = %address, symbol, "token deployed");
        address
    }

    /// Deploys the wrapped-native contract.
    pub fn deploy_wrapped_native(
        &mut self,
        name: &str,
        symbol: &str,
    ) -> Result<Address, SandboxError> {
        if let Some((existing, _)) = &self.state.wrapped {
            return Err(SandboxError::WrappedNativeExists(*existing));
        }
        let address = self.next_contract_address();
        self.state.wrapped = Some((address, WrappedNative::new(name, symbol)));
        debug!(wrapper = %address, symbol, "wrapped-native deployed");
        Ok(address)
    }

    /// Deploys a vault pointed at the wrapped-native contract.
    pub fn deploy_vault(
        &mut self,
        admin: &Address,
        excess_value: ExcessValuePolicy,
    ) -> Result<Vault, SandboxError> {
        let wrapped = self
            .wrapped_native_address()
            .ok_or(SandboxError::WrappedNativeMissing)?;
        let address = self.next_contract_address();
        let config = VaultConfig::new(wrapped, *admin).with_excess_value(excess_value);
        let vault = Vault::new(address, config)?;
        debug!(vault = %address, admin = %admin, "vault deployed");
        Ok(vault)
    }

    /// Mints `amount` of `token` to `to`.
    pub fn mint(
        &mut self,
        token: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), SandboxError> {
        self.token_mut(token)
            .map_err(|_| SandboxError::UnknownToken(*token))?
            .mint(to, amount)
            .map_err(|e| SandboxError::External(e.into()))
    }

    /// `owner` approves `spender` for `amount` of `token`.
    pub fn approve(
        &mut self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: u64,
    ) -> Result<(), SandboxError> {
        self.token_mut(token)
            .map_err(|_| SandboxError::UnknownToken(*token))?
            .approve(owner, spender, amount);
        Ok(())
    }

    /// Makes `account` refuse incoming native currency, like a contract
    /// without a receive hook.
    pub fn reject_native(&mut self, account: &Address) {
        self.rejecting.insert(*account);
    }

    /// Lets `account` receive native currency again.
    pub fn accept_native(&mut self, account: &Address) {
        self.rejecting.remove(account);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Address of the wrapped-native contract, if deployed.
    pub fn wrapped_native_address(&self) -> Option<Address> {
        self.state.wrapped.as_ref().map(|(address, _)| *address)
    }

    /// The token at `address`, wrapped-native included.
    pub fn token(&self, address: &Address) -> Option<&FungibleToken> {
        match &self.state.wrapped {
            Some((wrapped, contract)) if wrapped == address => Some(contract.token()),
            _ => self.state.tokens.get(address),
        }
    }

    /// Sum of every account's native balance. Constant under transfers.
    pub fn total_native(&self) -> u128 {
        self.state.native.values().map(|v| u128::from(*v)).sum()
    }

    /// Number of open checkpoints; zero between top-level calls.
    pub fn open_checkpoints(&self) -> usize {
        self.journal.len()
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Calls `vault.deposit` with `value` of native currency attached by
    /// `caller`.
    pub fn call_deposit(
        &mut self,
        vault: &mut Vault,
        caller: &Address,
        asset: Asset,
        amount: u64,
        value: u64,
    ) -> Result<VaultEvent, VaultError> {
        let checkpoint = self.checkpoint();
        let result = match self.transfer_native(caller, &vault.address(), value) {
            Ok(()) => vault.deposit(&mut *self, caller, asset, amount, value),
            Err(err) => Err(err.into()),
        };
        match result {
            Ok(_) => self.release(checkpoint),
            Err(_) => self.revert_to(checkpoint),
        }
        result
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn token_ref(&self, address: &Address) -> Result<&FungibleToken, ExternalError> {
        self.token(address)
            .ok_or(ExternalError::UnknownContract(*address))
    }

    fn token_mut(&mut self, address: &Address) -> Result<&mut FungibleToken, ExternalError> {
        match &mut self.state.wrapped {
            Some((wrapped, contract)) if wrapped == address => Ok(contract.token_mut()),
            _ => self
                .state
                .tokens
                .get_mut(address)
                .ok_or(ExternalError::UnknownContract(*address)),
        }
    }

    fn wrapper_mut(&mut self, address: &Address) -> Result<&mut WrappedNative, ExternalError> {
        match &mut self.state.wrapped {
            Some((wrapped, contract)) if wrapped == address => Ok(contract),
            _ => Err(ExternalError::UnknownContract(*address)),
        }
    }

    /// Runs `f` inside its own checkpoint so a multi-step call is atomic.
    fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ExternalError>,
    ) -> Result<T, ExternalError> {
        let checkpoint = self.checkpoint();
        let result = f(self);
        match result {
            Ok(_) => self.release(checkpoint),
            Err(_) => self.revert_to(checkpoint),
        }
        result
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for Sandbox {
    fn checkpoint(&mut self) -> Checkpoint {
        self.journal.push(self.state.clone());
        Checkpoint(self.journal.len() - 1)
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 >= self.journal.len() {
            return;
        }
        if let Some(saved) = self.journal.drain(checkpoint.0..).next() {
            self.state = saved;
        }
    }

    fn release(&mut self, checkpoint: Checkpoint) {
        self.journal.truncate(checkpoint.0);
    }

    fn native_balance(&self, account: &Address) -> u64 {
        self.state.native.get(account).copied().unwrap_or(0)
    }

    fn transfer_native(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), ExternalError> {
        if amount == 0 {
            return Ok(());
        }
        if self.rejecting.contains(to) {
            return Err(ExternalError::NativeTransferRejected(*to));
        }
        let balance = self.native_balance(from);
        if balance < amount {
            return Err(ExternalError::InsufficientBalance {
                balance,
                needed: amount,
            });
        }
        if from != to {
            let received = self
                .native_balance(to)
                .checked_add(amount)
                .ok_or_else(|| {
                    ExternalError::Reverted(format!("native balance overflow for {}", to))
                })?;
            self.state.native.insert(*from, balance - amount);
            self.state.native.insert(*to, received);
        }
        trace!(from = %from, to = %to, amount, "native transfer");
        Ok(())
    }

    fn token_balance_of(&self, token: &Address, owner: &Address) -> Result<u64, ExternalError> {
        Ok(self.token_ref(token)?.balance_of(owner))
    }

    fn token_transfer(
        &mut self,
        token: &Address,
        sender: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), ExternalError> {
        self.token_mut(token)?
            .transfer(sender, to, amount)
            .map_err(Into::into)
    }

    fn token_transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), ExternalError> {
        self.token_mut(token)?
            .transfer_from(spender, from, to, amount)
            .map_err(Into::into)
    }

    fn wrap_native(
        &mut self,
        wrapper: &Address,
        holder: &Address,
        amount: u64,
    ) -> Result<(), ExternalError> {
        self.wrapper_mut(wrapper)?;
        self.atomically(|chain| {
            chain.transfer_native(holder, wrapper, amount)?;
            chain.wrapper_mut(wrapper)?.deposit(holder, amount)?;
            Ok(())
        })
    }

    fn unwrap_native(
        &mut self,
        wrapper: &Address,
        holder: &Address,
        amount: u64,
    ) -> Result<(), ExternalError> {
        self.atomically(|chain| {
            chain.wrapper_mut(wrapper)?.withdraw(holder, amount)?;
            chain.transfer_native(wrapper, holder, amount)
        })
    }
}
