//! Lazy rollforward of the unwinding ledger's aggregate checkpoint.
//!
//! Instead of touching every position on each epoch tick, the ledger records
//! two sparse maps: the decrement each position starts applying at its
//! `from_epoch`, and the same decrement released at its `to_epoch`. Reading
//! the aggregate at a later epoch replays those deltas epoch by epoch:
//!
//! ```text
//! decrease += decrease_at[e] - increase_at[e]
//! total    -= decrease
//! ```
//!
//! Cost is O(epochs with a nonzero slope since the checkpoint); spans with a
//! flat slope are skipped in one step.

use std::collections::BTreeMap;

use ebb_core::error::MathError;
use ebb_core::traits::SlopeSource;
use ebb_core::types::GlobalPoint;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Sparse per-epoch slope deltas.
///
/// # Invariants
///
/// * Every decrement registered in `decrease` at `from` has a matching
///   entry in `increase` at `to` until the position leaves.
/// * No zero values are stored.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct SlopeChanges {
    increase: BTreeMap<u64, u128>,
    decrease: BTreeMap<u64, u128>,
}

impl SlopeChanges {
    /// Create an empty slope map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a position decaying by `decrement` per epoch in
    /// `[from_epoch, to_epoch)`.
    pub fn schedule(
        &mut self,
        from_epoch: u64,
        to_epoch: u64,
        decrement: u128,
    ) -> Result<(), MathError> {
        if decrement == 0 {
            return Ok(());
        }
        add_at(&mut self.decrease, from_epoch, decrement)?;
        add_at(&mut self.increase, to_epoch, decrement)
    }

    /// Cancel the pending end-of-decay release of a position that leaves
    /// while still decaying. Its start entry has already been consumed.
    pub fn cancel_release(&mut self, to_epoch: u64, decrement: u128) -> Result<(), MathError> {
        if decrement == 0 {
            return Ok(());
        }
        sub_at(&mut self.increase, to_epoch, decrement)
    }

    pub fn is_empty(&self) -> bool {
        self.increase.is_empty() && self.decrease.is_empty()
    }

    /// First epoch strictly after `epoch` with any registered change.
    pub fn next_change_after(&self, epoch: u64) -> Option<u64> {
        let lo = epoch.checked_add(1)?;
        let inc = self.increase.range(lo..).next().map(|(e, _)| *e);
        let dec = self.decrease.range(lo..).next().map(|(e, _)| *e);
        match (inc, dec) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

fn add_at(map: &mut BTreeMap<u64, u128>, epoch: u64, v: u128) -> Result<(), MathError> {
    let slot = map.entry(epoch).or_insert(0);
    *slot = slot.checked_add(v).ok_or(MathError::ArithmeticOverflow)?;
    Ok(())
}

fn sub_at(map: &mut BTreeMap<u64, u128>, epoch: u64, v: u128) -> Result<(), MathError> {
    let cur = map.get(&epoch).copied().unwrap_or(0);
    let left = cur.checked_sub(v).ok_or(MathError::ArithmeticOverflow)?;
    if left == 0 {
        map.remove(&epoch);
    } else {
        map.insert(epoch, left);
    }
    Ok(())
}

impl SlopeSource for SlopeChanges {
    fn increase_at(&self, epoch: u64) -> u128 {
        self.increase.get(&epoch).copied().unwrap_or(0)
    }

    fn decrease_at(&self, epoch: u64) -> u128 {
        self.decrease.get(&epoch).copied().unwrap_or(0)
    }

    fn next_change_after(&self, epoch: u64) -> Option<u64> {
        SlopeChanges::next_change_after(self, epoch)
    }
}

/// Advance `point` to `target_epoch`.
///
/// Pure and allocation-free. `reward_shares` is reset because deposits are
/// recorded against the epoch they happen in. A target at or before the
/// checkpoint returns it unchanged.
pub fn roll_forward<S: SlopeSource + ?Sized>(
    point: GlobalPoint,
    target_epoch: u64,
    slopes: &S,
) -> Result<GlobalPoint, MathError> {
    if target_epoch <= point.epoch {
        return Ok(point);
    }

    let mut p = point;
    p.reward_shares = 0;
    while p.epoch < target_epoch {
        // Flat slope: jump straight to the next epoch that changes anything.
        if p.total_reward_weight_decrease == 0 {
            let next = slopes
                .next_change_after(p.epoch)
                .unwrap_or(target_epoch)
                .min(target_epoch);
            if next > p.epoch + 1 {
                p.epoch = next - 1;
            }
        }

        let e = p.epoch + 1;
        p.total_reward_weight_decrease = p
            .total_reward_weight_decrease
            .checked_add(slopes.decrease_at(e))
            .and_then(|d| d.checked_sub(slopes.increase_at(e)))
            .ok_or(MathError::ArithmeticOverflow)?;
        p.total_reward_weight = p
            .total_reward_weight
            .checked_sub(p.total_reward_weight_decrease)
            .ok_or(MathError::ArithmeticOverflow)?;
        p.epoch = e;
    }

    trace!(
        epoch = p.epoch,
        total = p.total_reward_weight,
        slope = p.total_reward_weight_decrease,
        "rolled global point forward"
    );
    Ok(p)
}
