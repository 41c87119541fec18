//! # Balance Ledger
//!
//! The bookkeeping table at the centre of the vault: `(asset, owner) -> u64`.
//! Entries are implicit zeros until first credited and are never removed,
//! so an entry that drops back to zero simply stays at zero.
//!
//! ## Staging
//!
//! Changes go through a two-phase protocol so that the vault can validate an
//! entire operation before touching anything:
//!
//! 1. [`BalanceLedger::stage`] turns a set of [`Movement`]s into
//!    [`Posting`]s, each carrying the entry's value before and after. This
//!    is a pure check -- underflow and overflow are reported here and
//!    nothing is mutated.
//! 2. [`BalanceLedger::commit`] writes the `after` values;
//!    [`BalanceLedger::rollback`] restores the `before` values.
//!
//! Because postings carry absolute values rather than deltas, a rollback
//! is exact even if it runs after a commit of the same postings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::address::Address;
use crate::asset::Asset;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while staging ledger changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// A debit exceeds the entry's current amount.
    #[error("insufficient ledger balance for {owner} in {asset}: available {available}, requested {requested}")]
    Insufficient {
        /// Asset of the entry.
        asset: Asset,
        /// Owner of the entry.
        owner: Address,
        /// Current amount.
        available: u64,
        /// Amount the debit asked for.
        requested: u64,
    },

    /// A credit would push the entry past `u64::MAX`.
    #[error("ledger overflow for {owner} in {asset}: current {current}, credit {credit}")]
    Overflow {
        /// Asset of the entry.
        asset: Asset,
        /// Owner of the entry.
        owner: Address,
        /// Current amount.
        current: u64,
        /// Amount that caused the overflow.
        credit: u64,
    },
}

// ---------------------------------------------------------------------------
// Movements & Postings
// ---------------------------------------------------------------------------

/// Direction of a balance change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Increase the entry.
    Credit,
    /// Decrease the entry.
    Debit,
}

/// A requested change to one balance entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Movement {
    /// Asset of the entry.
    pub asset: Asset,
    /// Owner of the entry.
    pub owner: Address,
    /// Credit or debit.
    pub direction: Direction,
    /// Size of the change.
    pub amount: u64,
}

impl Movement {
    /// A credit of `amount` to `(asset, owner)`.
    pub fn credit(asset: Asset, owner: Address, amount: u64) -> Self {
        Self {
            asset,
            owner,
            direction: Direction::Credit,
            amount,
        }
    }

    /// A debit of `amount` from `(asset, owner)`.
    pub fn debit(asset: Asset, owner: Address, amount: u64) -> Self {
        Self {
            asset,
            owner,
            direction: Direction::Debit,
            amount,
        }
    }
}

/// A validated change: the entry's value before and after.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Posting {
    /// Asset of the entry.
    pub asset: Asset,
    /// Owner of the entry.
    pub owner: Address,
    /// Value before the change.
    pub before: u64,
    /// Value after the change.
    pub after: u64,
}

// ---------------------------------------------------------------------------
// BalanceLedger
// ---------------------------------------------------------------------------

/// The vault's entitlement table.
///
/// A `BTreeMap` keeps iteration order deterministic, which makes audits and
/// snapshots reproducible.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLedger {
    #[serde(with = "entry_list")]
    entries: BTreeMap<(Asset, Address), u64>,
}

impl BalanceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount of `asset` that `owner` is entitled to, zero if never credited.
    pub fn balance_of(&self, asset: Asset, owner: &Address) -> u64 {
        self.entries.get(&(asset, *owner)).copied().unwrap_or(0)
    }

    /// Sum of every owner's entitlement in `asset`.
    pub fn total_tracked(&self, asset: Asset) -> u128 {
        self.entries
            .iter()
            .filter(|((a, _), _)| *a == asset)
            .map(|(_, amount)| u128::from(*amount))
            .sum()
    }

    /// Every asset that has at least one entry, zero or not.
    pub fn assets(&self) -> Vec<Asset> {
        let mut assets: Vec<Asset> = self.entries.keys().map(|(asset, _)| *asset).collect();
        assets.dedup();
        assets
    }

    /// Iterates over `(asset, owner, amount)` in key order, zero entries
    /// included.
    pub fn entries(&self) -> impl Iterator<Item = (Asset, Address, u64)> + '_ {
        self.entries
            .iter()
            .map(|((asset, owner), amount)| (*asset, *owner, *amount))
    }

    /// Number of physical entries, including those sitting at zero.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has ever been credited.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validates `movements` against the current table without mutating it.
    ///
    /// Each movement must address a distinct entry; the vault never moves the
    /// same entry twice within one operation.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Insufficient`] for a debit larger than the entry,
    /// [`LedgerError::Overflow`] for a credit past `u64::MAX`. The first
    /// failing movement wins.
    pub fn stage(&self, movements: &[Movement]) -> Result<Vec<Posting>, LedgerError> {
        debug_assert!(
            movements.iter().enumerate().all(|(i, m)| movements[..i]
                .iter()
                .all(|p| (p.asset, p.owner) != (m.asset, m.owner))),
            "movements must touch distinct entries"
        );

        movements
            .iter()
            .map(|movement| {
                let before = self.balance_of(movement.asset, &movement.owner);
                let after = match movement.direction {
                    Direction::Credit => {
                        before
                            .checked_add(movement.amount)
                            .ok_or(LedgerError::Overflow {
                                asset: movement.asset,
                                owner: movement.owner,
                                current: before,
                                credit: movement.amount,
                            })?
                    }
                    Direction::Debit => {
                        before
                            .checked_sub(movement.amount)
                            .ok_or(LedgerError::Insufficient {
                                asset: movement.asset,
                                owner: movement.owner,
                                available: before,
                                requested: movement.amount,
                            })?
                    }
                };
                Ok(Posting {
                    asset: movement.asset,
                    owner: movement.owner,
                    before,
                    after,
                })
            })
            .collect()
    }

    /// Applies the `after` side of staged postings.
    pub fn commit(&mut self, postings: &[Posting]) {
        for posting in postings {
            self.entries
                .insert((posting.asset, posting.owner), posting.after);
        }
    }

    /// Restores the `before` side of postings, in reverse order.
    pub fn rollback(&mut self, postings: &[Posting]) {
        for posting in postings.iter().rev() {
            self.entries
                .insert((posting.asset, posting.owner), posting.before);
        }
    }
}

/// Serde helper: JSON objects need string keys, so the `(asset, owner)`
/// table is written as a list of `{asset, owner, amount}` records instead.
mod entry_list {
    use super::*;
    use serde::{Deserializer, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Entry {
        asset: Asset,
        owner: Address,
        amount: u64,
    }

    pub fn serialize<S>(
        entries: &BTreeMap<(Asset, Address), u64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(entries.len()))?;
        for ((asset, owner), amount) in entries {
            seq.serialize_element(&Entry {
                asset: *asset,
                owner: *owner,
                amount: *amount,
            })?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<(Asset, Address), u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let list: Vec<Entry> = Vec::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for entry in list {
            if entries
                .insert((entry.asset, entry.owner), entry.amount)
                .is_some()
            {
                return Err(serde::de::Error::custom(format!(
                    "duplicate ledger entry for {} in {}",
                    entry.owner, entry.asset
                )));
            }
        }
        Ok(entries)
    }
}
