//! Shared fixtures for the integration suites.

use ebb_core::auth::RoleTable;
use ebb_core::epoch::{epoch, epoch_start};
use ebb_core::traits::DecayModel;
use ebb_core::types::{Address, Env};
use ebb_decay::LinearDecay;
use ebb_locking::{LockingConfig, LockingController, Token};

pub const GOVERNOR: Address = Address::from_seed(0x01);
pub const ENTRY_POINT: Address = Address::from_seed(0x02);
pub const FINANCE: Address = Address::from_seed(0x03);

pub const ALICE: Address = Address::from_seed(0xa1);
pub const BOB: Address = Address::from_seed(0xb0);
pub const CAROL: Address = Address::from_seed(0xc0);

/// Receipt tokens minted to the entry point and to the finance manager.
pub const FUNDING: u128 = 1_000_000_000_000;

pub type Controller = LockingController<RoleTable>;

pub fn roles() -> RoleTable {
    RoleTable::standard(GOVERNOR, ENTRY_POINT, FINANCE)
}

/// Controller with the thirteen standard buckets and funded callers.
pub fn setup() -> Controller {
    setup_with(&LockingConfig::standard())
}

pub fn setup_with(config: &LockingConfig) -> Controller {
    let mut receipt = Token::new("eUSD");
    receipt.mint(&ENTRY_POINT, FUNDING).expect("fund entry point");
    receipt.mint(&FINANCE, FUNDING).expect("fund finance");
    LockingController::with_config(roles(), receipt, config).expect("valid config")
}

/// A timestamp one hour into `epoch`.
pub fn at(epoch: u64) -> u64 {
    epoch_start(epoch) + 3_600
}

pub fn entry(timestamp: u64) -> Env {
    Env::new(ENTRY_POINT, timestamp)
}

pub fn finance(timestamp: u64) -> Env {
    Env::new(FINANCE, timestamp)
}

pub fn governor(timestamp: u64) -> Env {
    Env::new(GOVERNOR, timestamp)
}

/// Every account that can hold receipt tokens in these suites.
pub fn receipt_holders() -> [Address; 7] {
    [
        ENTRY_POINT,
        FINANCE,
        ALICE,
        BOB,
        CAROL,
        Address::LOCKING_CONTROLLER,
        Address::UNWINDING_LEDGER,
    ]
}

/// Assert the accounting invariants that must hold after every call.
pub fn assert_consistent(c: &Controller) {
    let state = c.state();

    let recomputed = state.recomputed_reward_weight().expect("reward weight");
    assert_eq!(c.global_reward_weight(), recomputed, "global reward weight drifted");

    let principal: u128 = c
        .enabled_buckets()
        .iter()
        .filter_map(|d| c.bucket(*d))
        .map(|b| b.total_principal)
        .sum();
    assert_eq!(c.global_principal(), principal, "global principal drifted");

    let receipt = c.receipt();
    assert_eq!(
        receipt.balance_of(&Address::LOCKING_CONTROLLER),
        c.global_principal(),
        "controller balance != locked principal"
    );
    assert_eq!(
        receipt.balance_of(&Address::UNWINDING_LEDGER),
        c.ledger().total_receipt_tokens(),
        "ledger balance != pooled principal"
    );

    let held: u128 = receipt_holders().iter().map(|a| receipt.balance_of(a)).sum();
    assert_eq!(held, receipt.total_supply(), "tokens outside known accounts");

    for duration in c.enabled_buckets() {
        let Some(bucket) = c.bucket(*duration) else {
            continue;
        };
        let claimable: u128 = [ALICE, BOB, CAROL]
            .iter()
            .map(|u| bucket.principal_for_shares(bucket.share_token.balance_of(u)).expect("claim"))
            .sum();
        assert!(
            claimable <= bucket.total_principal,
            "bucket {duration} over-committed: {claimable} > {}",
            bucket.total_principal
        );
    }
}

/// The ledger's rolled-forward aggregate weight must equal the sum of every
/// open position's own schedule at `now`.
pub fn assert_ledger_weights(c: &Controller, now: u64) {
    let current = epoch(now);
    let engine = LinearDecay::new();
    let summed: u128 = c
        .ledger()
        .positions()
        .map(|(_, p)| engine.weight_at(p, current))
        .sum();
    let point = c.ledger().global_point(now).expect("global point");
    assert_eq!(point.total_reward_weight, summed, "ledger weight drifted at epoch {current}");
}
