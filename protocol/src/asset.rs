//! # Asset Identifiers
//!
//! The vault tracks two kinds of asset: the platform's native currency and
//! fungible tokens living in external contracts. On the wire both are plain
//! addresses, with the zero address standing in for native currency. The
//! sentinel stays at the edges; everywhere else an enum is used, so a
//! `match` can never forget the native case.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::address::Address;
use crate::config::NATIVE_SYMBOL;
use crate::config::NATIVE_SENTINEL;

/// An asset the vault can hold on behalf of its users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Asset {
    /// The platform's built-in currency.
    Native,
    /// A fungible token identified by its contract address.
    Token(Address),
}

impl Asset {
    /// Interprets an address as an asset: the sentinel means native currency,
    /// anything else names a token contract.
    pub fn from_address(address: Address) -> Self {
        if address == NATIVE_SENTINEL {
            Asset::Native
        } else {
            Asset::Token(address)
        }
    }

    /// Returns the address form, the sentinel for [`Asset::Native`].
    pub fn address(&self) -> Address {
        match self {
            Asset::Native => NATIVE_SENTINEL,
            Asset::Token(address) => *address,
        }
    }

    /// Returns `true` for native currency.
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

impl From<Address> for Asset {
    fn from(address: Address) -> Self {
        Asset::from_address(address)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str(NATIVE_SYMBOL),
            Asset::Token(address) => write!(f, "{}", address),
        }
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.address().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Address::deserialize(deserializer).map(Asset::from_address)
    }
}
