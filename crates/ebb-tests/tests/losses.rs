//! Slashing and catastrophic-loss handling.

use ebb_core::constants::WAD;
use ebb_core::error::LockingError;
use ebb_core::types::{Address, Capability};
use ebb_locking::{ControllerStatus, LossOutcome};
use ebb_tests::helpers::*;

/// ALICE locked 1000 for 1 epoch, BOB 1000 for 13, CAROL unwinding 1000
/// from the 5-epoch bucket.
fn three_pools() -> Controller {
    let mut c = setup();
    let now = at(10);
    c.create_position(&entry(now), 1000, 1, ALICE).unwrap();
    c.create_position(&entry(now), 1000, 13, BOB).unwrap();
    let shares = c.create_position(&entry(now), 1000, 5, CAROL).unwrap();
    c.start_unwinding(&entry(now), shares, 5, CAROL).unwrap();
    c
}

#[test]
fn half_loss_halves_every_pool() {
    let mut c = three_pools();
    assert_eq!(c.total_balance().unwrap(), 3000);
    let supply = c.receipt().total_supply();

    assert_eq!(c.apply_losses(&finance(at(10)), 1500).unwrap(), LossOutcome::Applied);

    assert_eq!(c.balance_of(&ALICE).unwrap(), 500);
    assert_eq!(c.balance_of(&BOB).unwrap(), 500);
    assert_eq!(c.unwinding_balance_of(CAROL, at(10), at(10)).unwrap(), 500);
    assert_eq!(c.ledger().slash_index(), WAD / 2);
    assert_eq!(c.unwinding_reward_weight(CAROL, at(10), at(10)).unwrap(), 550);
    assert_eq!(c.global_reward_weight(), 500 + 650);
    assert_eq!(c.exchange_rate(1).unwrap(), WAD / 2);
    assert_eq!(c.receipt().total_supply(), supply - 1500);
    assert_eq!(c.status(), ControllerStatus::Active);
    assert_consistent(&c);
}

#[test]
fn slashed_unwinding_still_decays_to_its_floor() {
    let mut c = three_pools();
    c.apply_losses(&finance(at(10)), 1500).unwrap();
    // 1100 -> 1000 over five epochs in nominal terms, halved.
    assert_eq!(c.unwinding_reward_weight(CAROL, at(10), at(13)).unwrap(), 520);
    assert_eq!(c.unwinding_reward_weight(CAROL, at(10), at(20)).unwrap(), 500);
    assert_eq!(c.withdraw(&entry(at(16)), CAROL, at(10)).unwrap(), 500);
    assert_consistent(&c);
}

#[test]
fn uneven_loss_is_fully_burned() {
    let mut c = setup();
    c.create_position(&entry(at(1)), 1000, 1, ALICE).unwrap();
    c.create_position(&entry(at(1)), 2000, 2, BOB).unwrap();
    c.apply_losses(&finance(at(1)), 100).unwrap();

    // Rounded up per bucket, capped by what is left.
    assert_eq!(c.bucket(1).unwrap().total_principal, 966);
    assert_eq!(c.bucket(2).unwrap().total_principal, 1934);
    assert_eq!(c.global_principal(), 2900);
    assert_consistent(&c);
}

#[test]
fn catastrophic_loss_burns_everything_and_pauses() {
    let mut c = three_pools();
    let supply = c.receipt().total_supply();

    assert_eq!(
        c.apply_losses(&finance(at(11)), 3000).unwrap(),
        LossOutcome::Catastrophic
    );
    assert_eq!(c.status(), ControllerStatus::Paused);
    assert_eq!(c.global_principal(), 0);
    assert_eq!(c.global_reward_weight(), 0);
    assert_eq!(c.ledger().total_receipt_tokens(), 0);
    assert_eq!(c.ledger().total_reward_weight(at(11)).unwrap(), 0);
    assert_eq!(c.balance_of(&ALICE).unwrap(), 0);
    assert_eq!(c.unwinding_balance_of(CAROL, at(10), at(11)).unwrap(), 0);
    assert_eq!(c.receipt().balance_of(&Address::LOCKING_CONTROLLER), 0);
    assert_eq!(c.receipt().balance_of(&Address::UNWINDING_LEDGER), 0);
    assert_eq!(c.receipt().total_supply(), supply - 3000);

    // Every mutator but pause/unpause is closed.
    assert_eq!(c.create_position(&entry(at(11)), 10, 1, ALICE), Err(LockingError::Paused));
    assert_eq!(c.start_unwinding(&entry(at(11)), 10, 1, ALICE), Err(LockingError::Paused));
    assert_eq!(c.withdraw(&entry(at(20)), CAROL, at(10)), Err(LockingError::Paused));
    assert_eq!(c.deposit_rewards(&finance(at(11)), 10), Err(LockingError::Paused));
    assert_eq!(c.apply_losses(&finance(at(11)), 10), Err(LockingError::Paused));
    assert_eq!(c.set_max_loss_percentage(&governor(at(11)), WAD), Err(LockingError::Paused));

    c.unpause(&governor(at(12))).unwrap();
    assert_eq!(c.status(), ControllerStatus::Active);
}

#[test]
fn threshold_is_inclusive() {
    let mut below = setup();
    below.create_position(&entry(at(1)), 1_000_000, 1, ALICE).unwrap();
    // 99.9999% of 1_000_000 is 999_999.
    assert_eq!(
        below.apply_losses(&finance(at(1)), 999_998).unwrap(),
        LossOutcome::Applied
    );
    assert_eq!(below.balance_of(&ALICE).unwrap(), 2);

    let mut at_limit = setup();
    at_limit.create_position(&entry(at(1)), 1_000_000, 1, ALICE).unwrap();
    assert_eq!(
        at_limit.apply_losses(&finance(at(1)), 999_999).unwrap(),
        LossOutcome::Catastrophic
    );
}

#[test]
fn wiped_ledger_pauses_below_threshold() {
    let mut c = setup();
    c.set_max_loss_percentage(&governor(at(1)), WAD).unwrap();
    c.create_position(&entry(at(1)), 1000, 1, ALICE).unwrap();
    c.create_position(&entry(at(1)), 1, 2, CAROL).unwrap();
    c.start_unwinding(&entry(at(1)), 1, 2, CAROL).unwrap();

    assert_eq!(c.apply_losses(&finance(at(1)), 1000).unwrap(), LossOutcome::Paused);
    assert_eq!(c.ledger().total_receipt_tokens(), 0);
    assert_eq!(c.ledger().slash_index(), 0);
    assert_eq!(c.balance_of(&ALICE).unwrap(), 1);
    assert_eq!(c.status(), ControllerStatus::Paused);
    assert_consistent(&c);
}

#[test]
fn wiped_bucket_pauses_below_threshold() {
    let mut c = setup();
    c.set_max_loss_percentage(&governor(at(1)), WAD).unwrap();
    c.create_position(&entry(at(1)), 1000, 1, ALICE).unwrap();
    c.create_position(&entry(at(1)), 1000, 2, BOB).unwrap();

    assert_eq!(c.apply_losses(&finance(at(1)), 1999).unwrap(), LossOutcome::Paused);
    assert!(c.bucket(1).unwrap().is_wiped());
    assert_eq!(c.bucket(2).unwrap().total_principal, 1);
    assert_consistent(&c);
}

#[test]
fn only_finance_reports_losses() {
    let mut c = three_pools();
    assert_eq!(
        c.apply_losses(&entry(at(10)), 1),
        Err(LockingError::Unauthorized(Capability::FinanceManager))
    );
    assert_eq!(c.apply_losses(&finance(at(10)), 0), Err(LockingError::ZeroAmount));
}
