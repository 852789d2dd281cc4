//! Per-position replay over the ledger's reward deposit history.
//!
//! A position's balance is never stored. It is recomputed by walking every
//! deposit made since the position joined and taking a pro-rata cut of each
//! by the position's weight in that epoch over the ledger weight recorded at
//! deposit time. The attributed shares do not feed back into the weight, so
//! unwinding rewards do not compound.

use std::collections::BTreeMap;

use ebb_core::error::MathError;
use ebb_core::traits::DecayModel;
use ebb_core::types::{RewardDeposit, UnwindingPosition};
use ebb_core::wad::mul_div_down;

/// Result of replaying one position up to an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PositionReplay {
    /// Creation shares plus every attributed reward share.
    pub shares: u128,
    /// Nominal weight in the final epoch.
    pub reward_weight: u128,
    /// Reward shares attributed in the final epoch alone.
    pub current_epoch_rewards: u128,
}

/// Replay `position` from its request epoch through `now_epoch`.
///
/// `deposits` holds every reward deposit of each epoch in order. Deposits
/// made in the creation epoch before the position joined are skipped.
pub fn replay_position<D: DecayModel + ?Sized>(
    engine: &D,
    position: &UnwindingPosition,
    deposits: &BTreeMap<u64, Vec<RewardDeposit>>,
    now_epoch: u64,
) -> Result<PositionReplay, MathError> {
    let start = position.creation_epoch();
    let mut out = PositionReplay {
        shares: position.shares,
        reward_weight: engine.weight_at(position, now_epoch),
        current_epoch_rewards: 0,
    };
    if now_epoch < start {
        return Ok(out);
    }

    for (e, epoch_deposits) in deposits.range(start..=now_epoch) {
        let skip = if *e == start {
            position.skipped_deposits as usize
        } else {
            0
        };
        let weight = engine.weight_at(position, *e);
        let mut earned = 0u128;
        for d in epoch_deposits.iter().skip(skip) {
            if d.total_reward_weight == 0 {
                continue;
            }
            earned = earned
                .checked_add(mul_div_down(d.shares, weight, d.total_reward_weight)?)
                .ok_or(MathError::ArithmeticOverflow)?;
        }
        out.shares = out
            .shares
            .checked_add(earned)
            .ok_or(MathError::ArithmeticOverflow)?;
        if *e == now_epoch {
            out.current_epoch_rewards = earned;
        }
    }

    Ok(out)
}
