//! # The Vault
//!
//! A [`Vault`] takes custody of native currency and fungible tokens on
//! behalf of its users and keeps a per-user, per-asset entitlement in a
//! [`BalanceLedger`]. Four operations change that ledger:
//!
//! | operation  | debits                | credits               | external call                 |
//! |------------|-----------------------|-----------------------|-------------------------------|
//! | `deposit`  | --                    | `(asset, caller)`     | `transferFrom` (tokens only)  |
//! | `withdraw` | `(asset, caller)`     | --                    | native transfer / `transfer`  |
//! | `wrap`     | `(native, caller)`    | `(wrapped, caller)`   | wrapped-native deposit        |
//! | `unwrap`   | `(wrapped, caller)`   | `(native, caller)`    | wrapped-native withdraw       |
//!
//! ## Ordering
//!
//! Each operation runs in three phases:
//!
//! 1. **Checks** -- every movement is staged against the ledger. Shortfalls
//!    and overflows surface here, before anything changes.
//! 2. **Effects** -- staged debits are committed.
//! 3. **Interactions** -- the external calls run inside an environment
//!    checkpoint. On success the staged credits are committed (they cannot
//!    fail, having been staged in phase 1). On failure the environment is
//!    reverted and the debits are rolled back.
//!
//! Debits therefore always land before funds leave, credits only after the
//! receipt is confirmed, and no fallible step follows an external call. The
//! sum of tracked balances for an asset can never exceed what the vault
//! actually holds.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::Address;
use crate::asset::Asset;
use crate::config::{ExcessValuePolicy, VaultConfig};
use crate::environment::{Environment, ExternalError};
use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::ledger::{BalanceLedger, LedgerError, Movement, Posting};

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// Tracked entitlement versus actual custody for one asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAudit {
    /// The asset.
    pub asset: Asset,
    /// Sum of all owners' ledger balances.
    pub tracked: u128,
    /// What the vault actually holds, as reported by the environment.
    pub custody: u64,
}

impl AssetAudit {
    /// `true` if every tracked unit is backed by custody.
    pub fn is_solvent(&self) -> bool {
        self.tracked <= u128::from(self.custody)
    }

    /// Custody not claimed by any owner (retained surplus, direct transfers
    /// to the vault). Zero when insolvent.
    pub fn surplus(&self) -> u128 {
        u128::from(self.custody).saturating_sub(self.tracked)
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// The vault ledger and its operations.
///
/// The vault owns only bookkeeping. Funds sit with the host under the
/// vault's [`address`](Self::address); every operation therefore takes the
/// [`Environment`] it should act on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vault {
    /// Account under which the host holds the vault's custody.
    address: Address,

    /// Construction-time parameters.
    config: VaultConfig,

    /// Per-(asset, owner) entitlements.
    ledger: BalanceLedger,

    /// Events of committed operations, oldest first.
    #[serde(default)]
    events: Vec<VaultEvent>,
}

impl Vault {
    /// Creates an empty vault holding custody at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] if `config` fails validation.
    pub fn new(address: Address, config: VaultConfig) -> Result<Self, VaultError> {
        config.validate()?;
        debug!(
            vault = %address,
            wrapped_native = %config.wrapped_native,
            admin = %config.admin,
            excess_value = %config.excess_value,
            "vault created"
        );
        Ok(Self {
            address,
            config,
            ledger: BalanceLedger::new(),
            events: Vec::new(),
        })
    }

    /// The vault's custody account.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The administrative account. Reserved: no operation checks it.
    pub fn admin(&self) -> Address {
        self.config.admin
    }

    /// The wrapped-native contract.
    pub fn wrapped_native(&self) -> Address {
        self.config.wrapped_native
    }

    /// The asset under which wrapped balances are tracked.
    pub fn wrapped_asset(&self) -> Asset {
        Asset::Token(self.config.wrapped_native)
    }

    /// Construction-time parameters.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Read-only view of the entitlement table.
    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    /// Amount of `asset` that `owner` may withdraw.
    pub fn balance_of(&self, asset: Asset, owner: &Address) -> u64 {
        self.ledger.balance_of(asset, owner)
    }

    /// Sum of all owners' balances in `asset`.
    pub fn total_tracked(&self, asset: Asset) -> u128 {
        self.ledger.total_tracked(asset)
    }

    /// Events emitted so far, oldest first.
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Drains the event log.
    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Credits `amount` of `asset` to `caller`.
    ///
    /// `attached_value` is the native currency sent along with the call. The
    /// host moves it into the vault's custody before dispatching and hands
    /// it back if this returns an error.
    ///
    /// For native deposits the attached value must cover `amount`. For
    /// token deposits `amount` is pulled from `caller` with `transferFrom`,
    /// so the vault must have been approved beforehand. Attached value beyond
    /// what the deposit needs is handled by the configured
    /// [`ExcessValuePolicy`].
    ///
    /// # Errors
    ///
    /// - [`VaultError::InsufficientFunds`] if a native deposit attaches less
    ///   than `amount`.
    /// - [`VaultError::ExcessValue`] for surplus value under
    ///   [`ExcessValuePolicy::Reject`].
    /// - [`VaultError::External`] if `transferFrom` or the refund fails
    ///   (`InsufficientAllowance`, `InsufficientBalance`, ...).
    /// - [`VaultError::BalanceOverflow`] if the credit would overflow.
    pub fn deposit<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        asset: Asset,
        amount: u64,
        attached_value: u64,
    ) -> Result<VaultEvent, VaultError> {
        let required = match asset {
            Asset::Native => amount,
            Asset::Token(_) => 0,
        };
        if attached_value < required {
            return Err(VaultError::InsufficientFunds {
                attached: attached_value,
                amount,
            });
        }

        let excess = attached_value - required;
        let policy = self.config.excess_value;
        if excess > 0 && policy == ExcessValuePolicy::Reject {
            return Err(VaultError::ExcessValue {
                attached: attached_value,
                expected: required,
            });
        }

        let credits = self
            .ledger
            .stage(&[Movement::credit(asset, *caller, amount)])
            .map_err(VaultError::from_credit)?;

        let vault = self.address;
        self.interact(env, &[], &credits, |env| {
            if let Asset::Token(token) = asset {
                env.token_transfer_from(&token, &vault, caller, &vault, amount)?;
            }
            if excess > 0 && policy == ExcessValuePolicy::Refund {
                env.transfer_native(&vault, caller, excess)?;
            }
            Ok(())
        })?;

        debug!(owner = %caller, asset = %asset, amount, excess, "deposit committed");
        Ok(self.emit(VaultEvent::Deposited {
            owner: *caller,
            asset,
            amount,
        }))
    }

    /// Sends `amount` of `asset` back to `caller`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ExceedsBalance`] if the tracked balance is short.
    /// - [`VaultError::External`] if the transfer fails; the debit is
    ///   rolled back.
    pub fn withdraw<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        asset: Asset,
        amount: u64,
    ) -> Result<VaultEvent, VaultError> {
        let debits = self
            .ledger
            .stage(&[Movement::debit(asset, *caller, amount)])
            .map_err(|err| match err {
                LedgerError::Insufficient {
                    available,
                    requested,
                    ..
                } => VaultError::ExceedsBalance {
                    asset,
                    available,
                    requested,
                },
                other => VaultError::from_credit(other),
            })?;

        let vault = self.address;
        self.interact(env, &debits, &[], |env| match asset {
            Asset::Native => env.transfer_native(&vault, caller, amount),
            Asset::Token(token) => env.token_transfer(&token, &vault, caller, amount),
        })?;

        debug!(owner = %caller, asset = %asset, amount, "withdraw committed");
        Ok(self.emit(VaultEvent::Withdrawn {
            owner: *caller,
            asset,
            amount,
        }))
    }

    /// Converts `amount` of `caller`'s tracked native balance into wrapped
    /// tokens held by the vault.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ExceedsDepositedNative`] if the native balance is short.
    /// - [`VaultError::BalanceOverflow`] if the wrapped credit would overflow.
    /// - [`VaultError::External`] if the conversion fails.
    pub fn wrap<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        amount: u64,
    ) -> Result<VaultEvent, VaultError> {
        let debits = self
            .ledger
            .stage(&[Movement::debit(Asset::Native, *caller, amount)])
            .map_err(|err| match err {
                LedgerError::Insufficient {
                    available,
                    requested,
                    ..
                } => VaultError::ExceedsDepositedNative {
                    available,
                    requested,
                },
                other => VaultError::from_credit(other),
            })?;
        let credits = self
            .ledger
            .stage(&[Movement::credit(self.wrapped_asset(), *caller, amount)])
            .map_err(VaultError::from_credit)?;

        let vault = self.address;
        let wrapper = self.config.wrapped_native;
        self.interact(env, &debits, &credits, |env| {
            env.wrap_native(&wrapper, &vault, amount)
        })?;

        debug!(owner = %caller, amount, "wrap committed");
        Ok(self.emit(VaultEvent::NativeWrapped {
            owner: *caller,
            amount,
        }))
    }

    /// Converts `amount` of `caller`'s tracked wrapped balance back into
    /// native currency held by the vault.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ExceedsWrappedBalance`] if the wrapped balance is short.
    /// - [`VaultError::BalanceOverflow`] if the native credit would overflow.
    /// - [`VaultError::External`] if the conversion fails.
    pub fn unwrap<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        caller: &Address,
        amount: u64,
    ) -> Result<VaultEvent, VaultError> {
        let debits = self
            .ledger
            .stage(&[Movement::debit(self.wrapped_asset(), *caller, amount)])
            .map_err(|err| match err {
                LedgerError::Insufficient {
                    available,
                    requested,
                    ..
                } => VaultError::ExceedsWrappedBalance {
                    available,
                    requested,
                },
                other => VaultError::from_credit(other),
            })?;
        let credits = self
            .ledger
            .stage(&[Movement::credit(Asset::Native, *caller, amount)])
            .map_err(VaultError::from_credit)?;

        let vault = self.address;
        let wrapper = self.config.wrapped_native;
        self.interact(env, &debits, &credits, |env| {
            env.unwrap_native(&wrapper, &vault, amount)
        })?;

        debug!(owner = %caller, amount, "unwrap committed");
        Ok(self.emit(VaultEvent::NativeUnwrapped {
            owner: *caller,
            amount,
        }))
    }

    /// Compares tracked balances with actual custody for every asset the
    /// ledger has seen, plus native currency.
    ///
    /// This is an observer's check; operations never consult it.
    pub fn audit<E: Environment + ?Sized>(
        &self,
        env: &E,
    ) -> Result<Vec<AssetAudit>, ExternalError> {
        let mut assets = self.ledger.assets();
        if !assets.contains(&Asset::Native) {
            assets.insert(0, Asset::Native);
        }
        assets
            .into_iter()
            .map(|asset| {
                Ok(AssetAudit {
                    asset,
                    tracked: self.ledger.total_tracked(asset),
                    custody: env.custody_of(asset, &self.address)?,
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Commits `debits`, runs `calls` inside an environment checkpoint, then
    /// commits `credits` or undoes everything.
    fn interact<E, F>(
        &mut self,
        env: &mut E,
        debits: &[Posting],
        credits: &[Posting],
        calls: F,
    ) -> Result<(), VaultError>
    where
        E: Environment + ?Sized,
        F: FnOnce(&mut E) -> Result<(), ExternalError>,
    {
        self.ledger.commit(debits);
        let checkpoint = env.checkpoint();
        match calls(env) {
            Ok(()) => {
                env.release(checkpoint);
                self.ledger.commit(credits);
                Ok(())
            }
            Err(err) => {
                env.revert_to(checkpoint);
                self.ledger.rollback(debits);
                warn!(
                    vault = %self.address,
                    error = %err,
                    "external call failed, operation reverted"
                );
                Err(err.into())
            }
        }
    }

    fn emit(&mut self, event: VaultEvent) -> VaultEvent {
        self.events.push(event.clone());
        event
    }
}
