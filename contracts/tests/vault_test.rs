//! Integration tests for the vault running against the sandbox host.
//!
//! These tests drive real token and wrapped-native contracts through the
//! [`Environment`] seam and check both sides of the books after every
//! call: what the vault tracks, and what the host says it actually holds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use strongbox_contracts::sandbox::Sandbox;
use strongbox_protocol::{
    Address, Asset, Environment, ExcessValuePolicy, ExternalError, Vault, VaultError, VaultEvent,
};

/// A deployed world: sandbox, vault, one plain token.
struct World {
    chain: Sandbox,
    vault: Vault,
    token: Address,
    wrapped: Address,
}

fn user(label: &str) -> Address {
    Address::derive(label)
}

/// Helper: deploys the wrapped-native contract, a token and a vault, then
/// funds `users` with native currency and tokens.
fn world(policy: ExcessValuePolicy, users: &[&str]) -> World {
    let mut chain = Sandbox::new();
    let wrapped = chain
        .deploy_wrapped_native("Wrapped Native", "WNAT")
        .unwrap();
    let token = chain.deploy_token("Test Token", "TST", 18);
    let vault = chain.deploy_vault(&user("admin"), policy).unwrap();
    for label in users {
        chain.fund(&user(label), 1_000).unwrap();
        chain.mint(&token, &user(label), 1_000).unwrap();
    }
    World {
        chain,
        vault,
        token,
        wrapped,
    }
}

impl World {
    fn token_balance(&self, token: &Address, owner: &Address) -> u64 {
        self.chain.token(token).map_or(0, |t| t.balance_of(owner))
    }

    /// Checks that every asset the vault tracks is fully backed.
    fn assert_solvent(&self) {
        for audit in self.vault.audit(&self.chain).unwrap() {
            assert!(
                audit.is_solvent(),
                "{} tracked {} but custody {}",
                audit.asset,
                audit.tracked,
                audit.custody
            );
        }
        assert_eq!(self.chain.open_checkpoints(), 0);
    }
}

// ---------------------------------------------------------------------------
// Token flows
// ---------------------------------------------------------------------------

#[test]
fn token_deposit_then_full_withdraw() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let vault = w.vault.address();
    let token = Asset::Token(w.token);

    w.chain.approve(&w.token, &alice, &vault, 100).unwrap();
    let event = w
        .chain
        .call_deposit(&mut w.vault, &alice, token, 100, 0)
        .unwrap();
    assert_eq!(
        event,
        VaultEvent::Deposited {
            owner: alice,
            asset: token,
            amount: 100
        }
    );
    assert_eq!(w.vault.balance_of(token, &alice), 100);
    assert_eq!(w.token_balance(&w.token, &vault), 100);
    assert_eq!(w.token_balance(&w.token, &alice), 900);
    w.assert_solvent();

    let event = w.vault.withdraw(&mut w.chain, &alice, token, 100).unwrap();
    assert_eq!(
        event,
        VaultEvent::Withdrawn {
            owner: alice,
            asset: token,
            amount: 100
        }
    );
    assert_eq!(w.vault.balance_of(token, &alice), 0);
    assert_eq!(w.token_balance(&w.token, &vault), 0);
    assert_eq!(w.token_balance(&w.token, &alice), 1_000);
    assert_eq!(w.vault.events().len(), 2);
    w.assert_solvent();
}

#[test]
fn token_deposit_without_approval_fails_on_allowance() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let token = Asset::Token(w.token);

    let err = w
        .chain
        .call_deposit(&mut w.vault, &alice, token, 100, 0)
        .unwrap_err();
    assert_eq!(
        err,
        VaultError::External(ExternalError::InsufficientAllowance {
            allowance: 0,
            needed: 100
        })
    );
    assert_eq!(w.vault.balance_of(token, &alice), 0);
    assert!(w.vault.events().is_empty());
    w.assert_solvent();
}

#[test]
fn token_deposit_beyond_holdings_fails_and_keeps_allowance() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let vault = w.vault.address();

    w.chain.approve(&w.token, &alice, &vault, 5_000).unwrap();
    let err = w
        .chain
        .call_deposit(&mut w.vault, &alice, Asset::Token(w.token), 2_000, 0)
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::External(ExternalError::InsufficientBalance {
            balance: 1_000,
            needed: 2_000
        })
    ));
    let allowance = w.chain.token(&w.token).unwrap().allowance(&alice, &vault);
    assert_eq!(allowance, 5_000);
}

#[test]
fn token_deposit_with_attached_value_refunds_it() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let vault = w.vault.address();

    w.chain.approve(&w.token, &alice, &vault, 10).unwrap();
    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Token(w.token), 10, 7)
        .unwrap();
    assert_eq!(w.chain.native_balance(&alice), 1_000);
    assert_eq!(w.chain.native_balance(&vault), 0);
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 0);
    w.assert_solvent();
}

#[test]
fn withdraw_more_than_tracked_fails() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let vault = w.vault.address();
    let token = Asset::Token(w.token);

    w.chain.approve(&w.token, &alice, &vault, 50).unwrap();
    w.chain
        .call_deposit(&mut w.vault, &alice, token, 50, 0)
        .unwrap();
    let err = w.vault.withdraw(&mut w.chain, &alice, token, 51).unwrap_err();
    assert_eq!(
        err,
        VaultError::ExceedsBalance {
            asset: token,
            available: 50,
            requested: 51
        }
    );
    assert_eq!(w.vault.balance_of(token, &alice), 50);
}

#[test]
fn balances_are_isolated_per_owner() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice", "bob"]);
    let (alice, bob) = (user("alice"), user("bob"));
    let vault = w.vault.address();
    let token = Asset::Token(w.token);

    w.chain.approve(&w.token, &alice, &vault, 100).unwrap();
    w.chain
        .call_deposit(&mut w.vault, &alice, token, 100, 0)
        .unwrap();

    let err = w.vault.withdraw(&mut w.chain, &bob, token, 1).unwrap_err();
    assert!(matches!(err, VaultError::ExceedsBalance { available: 0, .. }));
    assert_eq!(w.vault.balance_of(token, &bob), 0);
    assert_eq!(w.vault.balance_of(token, &alice), 100);
}

// ---------------------------------------------------------------------------
// Native flows
// ---------------------------------------------------------------------------

#[test]
fn native_deposit_below_amount_is_insufficient_funds() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");

    let err = w
        .chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 10, 9)
        .unwrap_err();
    assert_eq!(
        err,
        VaultError::InsufficientFunds {
            attached: 9,
            amount: 10
        }
    );
    // The attached value went back with the revert.
    assert_eq!(w.chain.native_balance(&alice), 1_000);
    assert_eq!(w.chain.native_balance(&w.vault.address()), 0);
    w.assert_solvent();
}

#[test]
fn native_round_trip_restores_everything() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let total = w.chain.total_native();

    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 300, 300)
        .unwrap();
    assert_eq!(w.chain.native_balance(&alice), 700);
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 300);

    w.vault
        .withdraw(&mut w.chain, &alice, Asset::Native, 300)
        .unwrap();
    assert_eq!(w.chain.native_balance(&alice), 1_000);
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 0);
    assert_eq!(w.chain.total_native(), total);
    w.assert_solvent();
}

#[test]
fn excess_value_policies() {
    let alice = user("alice");

    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 10, 15)
        .unwrap();
    assert_eq!(w.chain.native_balance(&alice), 990);
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 10);

    let mut w = world(ExcessValuePolicy::Reject, &["alice"]);
    let err = w
        .chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 10, 15)
        .unwrap_err();
    assert_eq!(
        err,
        VaultError::ExcessValue {
            attached: 15,
            expected: 10
        }
    );
    assert_eq!(w.chain.native_balance(&alice), 1_000);

    let mut w = world(ExcessValuePolicy::Retain, &["alice"]);
    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 10, 15)
        .unwrap();
    assert_eq!(w.chain.native_balance(&alice), 985);
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 10);
    let native = w
        .vault
        .audit(&w.chain)
        .unwrap()
        .into_iter()
        .find(|a| a.asset == Asset::Native)
        .unwrap();
    assert_eq!(native.surplus(), 5);
    w.assert_solvent();
}

#[test]
fn refund_to_rejecting_caller_reverts_whole_deposit() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    w.chain.reject_native(&alice);

    let err = w
        .chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 10, 15)
        .unwrap_err();
    assert_eq!(
        err,
        VaultError::External(ExternalError::NativeTransferRejected(alice))
    );
    assert_eq!(w.chain.native_balance(&alice), 1_000);
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 0);
    w.assert_solvent();
}

#[test]
fn native_withdraw_to_rejecting_recipient_rolls_back() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 100, 100)
        .unwrap();

    w.chain.reject_native(&alice);
    let err = w
        .vault
        .withdraw(&mut w.chain, &alice, Asset::Native, 40)
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::External(ExternalError::NativeTransferRejected(_))
    ));
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 100);
    assert_eq!(w.chain.native_balance(&w.vault.address()), 100);
    w.assert_solvent();

    w.chain.accept_native(&alice);
    w.vault
        .withdraw(&mut w.chain, &alice, Asset::Native, 40)
        .unwrap();
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 60);
    assert_eq!(w.chain.native_balance(&alice), 940);
}

// ---------------------------------------------------------------------------
// Wrap / unwrap
// ---------------------------------------------------------------------------

#[test]
fn wrap_moves_native_into_wrapped_balance() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let wrapped = w.vault.wrapped_asset();
    assert_eq!(wrapped, Asset::Token(w.wrapped));

    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 1, 1)
        .unwrap();
    let event = w.vault.wrap(&mut w.chain, &alice, 1).unwrap();
    assert_eq!(
        event,
        VaultEvent::NativeWrapped {
            owner: alice,
            amount: 1
        }
    );
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 0);
    assert_eq!(w.vault.balance_of(wrapped, &alice), 1);
    assert_eq!(w.token_balance(&w.wrapped, &w.vault.address()), 1);
    assert_eq!(w.chain.native_balance(&w.vault.address()), 0);
    assert_eq!(w.chain.native_balance(&w.wrapped), 1);

    let err = w.vault.wrap(&mut w.chain, &alice, 1).unwrap_err();
    assert_eq!(
        err,
        VaultError::ExceedsDepositedNative {
            available: 0,
            requested: 1
        }
    );
    w.assert_solvent();
}

#[test]
fn unwrap_beyond_wrapped_balance_fails() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");

    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 5, 5)
        .unwrap();
    w.vault.wrap(&mut w.chain, &alice, 3).unwrap();

    let err = w.vault.unwrap(&mut w.chain, &alice, 4).unwrap_err();
    assert_eq!(
        err,
        VaultError::ExceedsWrappedBalance {
            available: 3,
            requested: 4
        }
    );
    assert_eq!(w.vault.balance_of(w.vault.wrapped_asset(), &alice), 3);
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 2);
}

#[test]
fn wrap_then_unwrap_round_trips() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let wrapped = w.vault.wrapped_asset();

    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 50, 50)
        .unwrap();
    w.vault.wrap(&mut w.chain, &alice, 20).unwrap();
    let event = w.vault.unwrap(&mut w.chain, &alice, 20).unwrap();
    assert_eq!(
        event,
        VaultEvent::NativeUnwrapped {
            owner: alice,
            amount: 20
        }
    );
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 50);
    assert_eq!(w.vault.balance_of(wrapped, &alice), 0);
    assert_eq!(w.chain.native_balance(&w.vault.address()), 50);
    assert_eq!(w.token_balance(&w.wrapped, &w.vault.address()), 0);
    w.assert_solvent();
}

#[test]
fn wrapped_balance_withdraws_as_token() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let wrapped = w.vault.wrapped_asset();

    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 8, 8)
        .unwrap();
    w.vault.wrap(&mut w.chain, &alice, 8).unwrap();
    w.vault.withdraw(&mut w.chain, &alice, wrapped, 8).unwrap();

    assert_eq!(w.token_balance(&w.wrapped, &alice), 8);
    assert_eq!(w.vault.balance_of(wrapped, &alice), 0);
    w.assert_solvent();
}

#[test]
fn failed_wrap_conversion_undoes_both_entries() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let vault = w.vault.address();
    let wrapped = w.vault.wrapped_asset();

    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 10, 10)
        .unwrap();
    w.chain.reject_native(&w.wrapped);

    let err = w.vault.wrap(&mut w.chain, &alice, 4).unwrap_err();
    assert_eq!(
        err,
        VaultError::External(ExternalError::NativeTransferRejected(w.wrapped))
    );
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 10);
    assert_eq!(w.vault.balance_of(wrapped, &alice), 0);
    assert_eq!(w.chain.native_balance(&vault), 10);
    assert_eq!(w.chain.native_balance(&w.wrapped), 0);
    assert_eq!(w.token_balance(&w.wrapped, &vault), 0);
    assert_eq!(w.vault.events().len(), 1);
    w.assert_solvent();
}

#[test]
fn failed_unwrap_conversion_undoes_both_entries() {
    let mut w = world(ExcessValuePolicy::Refund, &["alice"]);
    let alice = user("alice");
    let vault = w.vault.address();
    let wrapped = w.vault.wrapped_asset();

    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 10, 10)
        .unwrap();
    w.vault.wrap(&mut w.chain, &alice, 4).unwrap();
    w.chain.reject_native(&vault);

    let err = w.vault.unwrap(&mut w.chain, &alice, 4).unwrap_err();
    assert_eq!(
        err,
        VaultError::External(ExternalError::NativeTransferRejected(vault))
    );
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 6);
    assert_eq!(w.vault.balance_of(wrapped, &alice), 4);
    assert_eq!(w.chain.native_balance(&vault), 6);
    assert_eq!(w.chain.native_balance(&w.wrapped), 4);
    assert_eq!(w.token_balance(&w.wrapped, &vault), 4);
    assert_eq!(w.vault.events().len(), 2);
    w.assert_solvent();

    w.chain.accept_native(&vault);
    w.vault.unwrap(&mut w.chain, &alice, 4).unwrap();
    assert_eq!(w.vault.balance_of(Asset::Native, &alice), 10);
    assert_eq!(w.vault.balance_of(wrapped, &alice), 0);
}

// ---------------------------------------------------------------------------
// Invariants under random operation sequences
// ---------------------------------------------------------------------------

fn nonzero_entries(vault: &Vault) -> Vec<(Asset, Address, u64)> {
    vault
        .ledger()
        .entries()
        .filter(|(_, _, amount)| *amount > 0)
        .collect()
}

#[test]
fn random_sequences_never_break_solvency() {
    const USERS: [&str; 3] = ["alice", "bob", "carol"];

    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut w = world(ExcessValuePolicy::Refund, &USERS);
        let vault = w.vault.address();
        for label in USERS {
            w.chain
                .approve(&w.token, &user(label), &vault, u64::MAX)
                .unwrap();
        }
        let native_supply = w.chain.total_native();

        for _ in 0..200 {
            let caller = user(USERS[rng.gen_range(0..USERS.len())]);
            let amount = rng.gen_range(0..150u64);
            let before = nonzero_entries(&w.vault);
            let events_before = w.vault.events().len();

            let result = match rng.gen_range(0..6) {
                0 => {
                    let extra = rng.gen_range(0..5u64);
                    w.chain
                        .call_deposit(&mut w.vault, &caller, Asset::Native, amount, amount + extra)
                }
                1 => w
                    .chain
                    .call_deposit(&mut w.vault, &caller, Asset::Token(w.token), amount, 0),
                2 => w
                    .vault
                    .withdraw(&mut w.chain, &caller, Asset::Native, amount),
                3 => w
                    .vault
                    .withdraw(&mut w.chain, &caller, Asset::Token(w.token), amount),
                4 => w.vault.wrap(&mut w.chain, &caller, amount),
                _ => w.vault.unwrap(&mut w.chain, &caller, amount),
            };

            match result {
                Ok(_) => assert_eq!(w.vault.events().len(), events_before + 1),
                Err(_) => {
                    assert_eq!(nonzero_entries(&w.vault), before, "failed call changed ledger");
                    assert_eq!(w.vault.events().len(), events_before);
                }
            }
            w.assert_solvent();
            assert_eq!(w.chain.total_native(), native_supply);
        }
    }
}

#[test]
fn vault_snapshot_survives_json() {
    let mut w = world(ExcessValuePolicy::Retain, &["alice"]);
    let alice = user("alice");
    w.chain
        .call_deposit(&mut w.vault, &alice, Asset::Native, 30, 30)
        .unwrap();
    w.vault.wrap(&mut w.chain, &alice, 10).unwrap();

    let json = serde_json::to_string(&w.vault).unwrap();
    let mut restored: Vault = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.balance_of(Asset::Native, &alice), 20);
    assert_eq!(restored.balance_of(restored.wrapped_asset(), &alice), 10);
    assert_eq!(restored.events(), w.vault.events());

    // The restored copy keeps working against the same chain.
    restored.unwrap(&mut w.chain, &alice, 10).unwrap();
    assert_eq!(restored.balance_of(Asset::Native, &alice), 30);
}
