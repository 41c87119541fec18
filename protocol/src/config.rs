//! # Vault Configuration & Constants
//!
//! Construction-time parameters for a [`Vault`](crate::vault::Vault) and the
//! handful of protocol constants that other modules share. A vault's
//! configuration is fixed at deployment: there is no operation that changes
//! it afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::error::VaultError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The address that stands for native currency wherever an asset is given
/// as an address.
pub const NATIVE_SENTINEL: Address = Address::ZERO;

/// Display symbol for native currency in logs and reports. Also the asset
/// name scenario files use for it.
pub const NATIVE_SYMBOL: &str = "native";

/// Ledger format version, bumped whenever the serialized vault layout changes.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// ExcessValuePolicy
// ---------------------------------------------------------------------------

/// What a deposit does with attached native value beyond the credited amount.
///
/// A deposit always credits exactly the stated `amount`. The attached value
/// can be larger (for token deposits, any attached value is surplus), and
/// this policy decides the fate of the difference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcessValuePolicy {
    /// Send the surplus back to the caller within the same operation.
    #[default]
    Refund,
    /// Fail the deposit with [`VaultError::ExcessValue`].
    Reject,
    /// Keep the surplus in custody without crediting anyone.
    Retain,
}

impl fmt::Display for ExcessValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcessValuePolicy::Refund => write!(f, "refund"),
            ExcessValuePolicy::Reject => write!(f, "reject"),
            ExcessValuePolicy::Retain => write!(f, "retain"),
        }
    }
}

impl FromStr for ExcessValuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "refund" => Ok(ExcessValuePolicy::Refund),
            "reject" => Ok(ExcessValuePolicy::Reject),
            "retain" => Ok(ExcessValuePolicy::Retain),
            other => Err(format!(
                "unknown excess value policy '{}': expected refund, reject or retain",
                other
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Parameters supplied when a vault is deployed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Address of the wrapped-native contract used by wrap/unwrap. Its token
    /// is also the asset under which wrapped balances are tracked.
    pub wrapped_native: Address,

    /// Administrative account. Recorded and exposed, but no operation is
    /// gated on it.
    pub admin: Address,

    /// Handling of surplus attached value on deposits.
    #[serde(default)]
    pub excess_value: ExcessValuePolicy,
}

impl VaultConfig {
    /// Builds a configuration with the default excess-value policy.
    pub fn new(wrapped_native: Address, admin: Address) -> Self {
        Self {
            wrapped_native,
            admin,
            excess_value: ExcessValuePolicy::default(),
        }
    }

    /// Overrides the excess-value policy.
    pub fn with_excess_value(mut self, policy: ExcessValuePolicy) -> Self {
        self.excess_value = policy;
        self
    }

    /// Checks the configuration before a vault is built from it.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] if the wrapped-native address is
    /// the native sentinel, since the wrapped balance would then collide
    /// with the native balance.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.wrapped_native == NATIVE_SENTINEL {
            return Err(VaultError::InvalidConfig(
                "wrapped-native contract cannot be the native sentinel address".into(),
            ));
        }
        Ok(())
    }
}
