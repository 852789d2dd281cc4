//! Accounting invariants under random operation sequences.
//!
//! After every call, successful or not:
//! - global reward weight equals the bucket-by-bucket recomputation exactly
//! - the ledger's aggregate weight equals the sum of its positions' schedules
//! - controller and ledger token balances match their aggregates
//! - receipt supply only shrinks by reported losses
//! - a rejected call leaves the state untouched

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ebb_core::constants::WAD;
use ebb_core::epoch::epoch_start;
use ebb_core::types::Address;
use ebb_locking::LossOutcome;
use ebb_tests::helpers::*;

#[derive(Debug, Clone)]
enum Op {
    Lock { user: usize, amount: u128, duration: u64 },
    Unwind { user: usize, percent: u128, duration: u64 },
    Extend { user: usize, percent: u128, from: u64, to: u64 },
    Cancel { slot: usize, new_duration: u64 },
    Withdraw { slot: usize },
    Reward { amount: u128 },
    Loss { per_mille: u128 },
    SetMultiplier { duration: u64, multiplier: u128 },
    Advance { secs: u64 },
}

const USERS: [Address; 3] = [ALICE, BOB, CAROL];

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..3usize, 1u128..1_000_000, 1u64..=13)
            .prop_map(|(user, amount, duration)| Op::Lock { user, amount, duration }),
        3 => (0..3usize, 1u128..=100, 1u64..=13)
            .prop_map(|(user, percent, duration)| Op::Unwind { user, percent, duration }),
        1 => (0..3usize, 1u128..=100, 1u64..=13, 1u64..=13)
            .prop_map(|(user, percent, from, to)| Op::Extend { user, percent, from, to }),
        2 => (0..16usize, 1u64..=13)
            .prop_map(|(slot, new_duration)| Op::Cancel { slot, new_duration }),
        2 => (0..16usize).prop_map(|slot| Op::Withdraw { slot }),
        3 => (1u128..500_000).prop_map(|amount| Op::Reward { amount }),
        1 => (1u128..=300).prop_map(|per_mille| Op::Loss { per_mille }),
        1 => (1u64..=13, WAD..=2 * WAD)
            .prop_map(|(duration, multiplier)| Op::SetMultiplier { duration, multiplier }),
        3 => (1u64..(3 * 604_800)).prop_map(|secs| Op::Advance { secs }),
    ]
}

/// Runs `ops` and checks every invariant after each step.
fn run(ops: Vec<Op>) {
    let mut c = setup();
    let mut now = epoch_start(5);
    let mut unwinding: Vec<(Address, u64)> = Vec::new();
    let mut burned = 0u128;
    let initial_supply = c.receipt().total_supply();

    for op in ops {
        let before = c.state().clone();
        let ok = match op {
            Op::Lock { user, amount, duration } => {
                c.create_position(&entry(now), amount, duration, USERS[user]).is_ok()
            }
            Op::Unwind { user, percent, duration } => {
                let held = c
                    .bucket(duration)
                    .map(|b| b.share_token.balance_of(&USERS[user]))
                    .unwrap_or(0);
                let shares = held * percent / 100;
                let ok = c.start_unwinding(&entry(now), shares, duration, USERS[user]).is_ok();
                if ok {
                    unwinding.push((USERS[user], now));
                }
                ok
            }
            Op::Extend { user, percent, from, to } => {
                let held = c
                    .bucket(from)
                    .map(|b| b.share_token.balance_of(&USERS[user]))
                    .unwrap_or(0);
                let shares = held * percent / 100;
                c.increase_unwinding_epochs(&entry(now), shares, from, to, USERS[user]).is_ok()
            }
            Op::Cancel { slot, new_duration } => match unwinding.get(slot).copied() {
                Some((user, ts)) => {
                    let ok = c.cancel_unwinding(&entry(now), user, ts, new_duration).is_ok();
                    if ok {
                        unwinding.remove(slot);
                    }
                    ok
                }
                None => false,
            },
            Op::Withdraw { slot } => match unwinding.get(slot).copied() {
                Some((user, ts)) => {
                    let ok = c.withdraw(&entry(now), user, ts).is_ok();
                    if ok {
                        unwinding.remove(slot);
                    }
                    ok
                }
                None => false,
            },
            Op::Reward { amount } => c.deposit_rewards(&finance(now), amount).is_ok(),
            Op::Loss { per_mille } => {
                let total = c.total_balance().unwrap();
                let amount = total * per_mille / 1000;
                match c.apply_losses(&finance(now), amount) {
                    Ok(LossOutcome::Catastrophic) => {
                        burned += total;
                        true
                    }
                    Ok(_) => {
                        burned += amount;
                        true
                    }
                    Err(_) => false,
                }
            }
            Op::SetMultiplier { duration, multiplier } => c
                .set_bucket_multiplier(&governor(now), duration, multiplier)
                .is_ok(),
            Op::Advance { secs } => {
                now += secs;
                true
            }
        };

        if !ok {
            assert_eq!(c.state(), &before, "rejected call changed state");
        }
        assert_consistent(&c);
        assert_ledger_weights(&c, now);
        assert_eq!(c.receipt().total_supply(), initial_supply - burned);
    }

    // Whatever is left in the ledger is enough to pay every open position.
    let owed: u128 = unwinding
        .iter()
        .map(|(user, ts)| c.unwinding_balance_of(*user, *ts, now).unwrap())
        .sum();
    assert!(owed <= c.ledger().total_receipt_tokens());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn random_sequences_keep_books_balanced(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        run(ops);
    }
}

#[test]
fn long_mixed_session() {
    let mut ops = Vec::new();
    for round in 0..20u128 {
        let user = (round % 3) as usize;
        let duration = 1 + (round as u64 % 13);
        ops.push(Op::Lock { user, amount: 10_000 + round, duration });
        ops.push(Op::Reward { amount: 777 });
        ops.push(Op::Unwind { user, percent: 40, duration });
        ops.push(Op::Advance { secs: 604_800 });
        ops.push(Op::Reward { amount: 333 });
        ops.push(Op::Cancel { slot: 0, new_duration: 13 });
        ops.push(Op::Withdraw { slot: 0 });
        if round % 5 == 4 {
            ops.push(Op::Loss { per_mille: 100 });
        }
        if round % 3 == 1 {
            ops.push(Op::SetMultiplier {
                duration,
                multiplier: WAD + WAD / 7 * (1 + round % 7),
            });
            ops.push(Op::Extend { user, percent: 50, from: duration, to: 13 });
            ops.push(Op::Reward { amount: 1_001 });
        }
    }
    run(ops);
}

/// One long deterministic run, longer than proptest cases go.
#[test]
fn seeded_soak() {
    let mut rng = StdRng::seed_from_u64(0xebb);
    let ops = (0..400)
        .map(|_| match rng.gen_range(0..9) {
            0 | 1 => Op::Lock {
                user: rng.gen_range(0..3),
                amount: rng.gen_range(1..5_000_000),
                duration: rng.gen_range(1..=13),
            },
            2 => Op::Unwind {
                user: rng.gen_range(0..3),
                percent: rng.gen_range(1..=100),
                duration: rng.gen_range(1..=13),
            },
            3 => Op::Cancel {
                slot: rng.gen_range(0..8),
                new_duration: rng.gen_range(1..=13),
            },
            4 => Op::Withdraw { slot: rng.gen_range(0..8) },
            5 => Op::Reward { amount: rng.gen_range(1..1_000_000) },
            6 if rng.gen_bool(0.1) => Op::Loss { per_mille: rng.gen_range(1..=50) },
            7 => Op::SetMultiplier {
                duration: rng.gen_range(1..=13),
                multiplier: rng.gen_range(WAD..=2 * WAD),
            },
            _ => Op::Advance { secs: rng.gen_range(3_600..1_209_600) },
        })
        .collect();
    run(ops);
}

/// Multiplier changes between partial extensions, deposits and losses keep
/// the global weight equal to the bucket-by-bucket sum.
#[test]
fn multiplier_changes_between_extensions_and_rewards() {
    let mut ops = Vec::new();
    for step in 0..12u64 {
        let user = (step % 3) as usize;
        let from = 1 + step % 6;
        ops.push(Op::Lock { user, amount: 333_333 + u128::from(step), duration: from });
        ops.push(Op::SetMultiplier { duration: from, multiplier: 2 * WAD - WAD / 3 });
        ops.push(Op::Extend { user, percent: 37, from, to: from + 5 });
        ops.push(Op::Reward { amount: 99_999 });
        ops.push(Op::SetMultiplier { duration: from + 5, multiplier: WAD + WAD / 9 });
        ops.push(Op::Loss { per_mille: 7 });
        ops.push(Op::Extend { user, percent: 63, from, to: 13 });
    }
    run(ops);
}
