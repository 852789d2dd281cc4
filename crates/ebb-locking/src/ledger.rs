//! The unwinding ledger: positions that left their bucket and are decaying
//! toward withdrawal.
//!
//! Pooled principal is tracked with ledger-internal shares
//! (`total_receipt_tokens / total_shares` is the share price). Reward weights
//! are stored nominally; the real weight is `nominal * slash_index`, so a
//! loss never rewrites individual positions.
//!
//! Each reward deposit is recorded with the aggregate weight present when it
//! was made, so a position only shares in deposits made after it joined.
//!
//! Every mutator may only be driven by the locking controller. The ledger
//! never calls back into the controller itself: [`UnwindingLedger::cancel_unwinding`]
//! hands out a [`RelockTicket`] which the controller redeems through its
//! trusted relock path.

use std::collections::BTreeMap;

use ebb_core::constants::WAD;
use ebb_core::epoch::epoch;
use ebb_core::error::{LockingError, MathError};
use ebb_core::traits::DecayModel;
use ebb_core::types::{
    Address, Capability, GlobalPoint, PositionKey, RewardDeposit, UnwindingPosition,
};
use ebb_core::wad::{mul_div_down, mul_wad_down};
use ebb_decay::{replay_position, roll_forward, LinearDecay, PositionReplay, SlopeChanges};
use tracing::{debug, info, warn};

use crate::token::Token;

const CONTROLLER: Address = Address::LOCKING_CONTROLLER;
const LEDGER: Address = Address::UNWINDING_LEDGER;

/// Proof that a position was cancelled and its balance must be relocked.
///
/// Only the ledger can construct one; the controller consumes it to create
/// the replacement position.
#[derive(Debug, PartialEq, Eq)]
pub struct RelockTicket {
    user: Address,
    amount: u128,
    new_duration: u64,
}

impl RelockTicket {
    pub fn user(&self) -> Address {
        self.user
    }

    /// Receipt tokens released by the cancelled position.
    pub fn amount(&self) -> u128 {
        self.amount
    }

    pub fn new_duration(&self) -> u64 {
        self.new_duration
    }
}

/// State of the unwinding pool.
///
/// # Invariants
///
/// * The last point's `total_reward_weight` equals the sum of every
///   position's nominal weight at that epoch.
/// * `total_receipt_tokens` equals the ledger account's receipt balance.
/// * `slash_index` never increases.
#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct UnwindingLedger {
    positions: BTreeMap<PositionKey, UnwindingPosition>,
    points: BTreeMap<u64, GlobalPoint>,
    slopes: SlopeChanges,
    deposits: BTreeMap<u64, Vec<RewardDeposit>>,
    total_shares: u128,
    total_receipt_tokens: u128,
    slash_index: u128,
}

impl Default for UnwindingLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl UnwindingLedger {
    pub fn new() -> Self {
        Self {
            positions: BTreeMap::new(),
            points: BTreeMap::new(),
            slopes: SlopeChanges::new(),
            deposits: BTreeMap::new(),
            total_shares: 0,
            total_receipt_tokens: 0,
            slash_index: WAD,
        }
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn total_receipt_tokens(&self) -> u128 {
        self.total_receipt_tokens
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn slash_index(&self) -> u128 {
        self.slash_index
    }

    pub fn position(&self, key: &PositionKey) -> Option<&UnwindingPosition> {
        self.positions.get(key)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&PositionKey, &UnwindingPosition)> {
        self.positions.iter()
    }

    /// The aggregate checkpoint as of `now` (rolled forward, not stored).
    pub fn global_point(&self, now: u64) -> Result<GlobalPoint, MathError> {
        self.point_at(epoch(now))
    }

    /// Real reward weight of all unwinding positions.
    pub fn total_reward_weight(&self, now: u64) -> Result<u128, MathError> {
        let p = self.point_at(epoch(now))?;
        mul_wad_down(p.total_reward_weight, self.slash_index)
    }

    /// Receipt tokens a position would withdraw at `now`.
    pub fn balance_of(&self, user: Address, start_timestamp: u64, now: u64) -> Result<u128, LockingError> {
        let key = PositionKey::new(user, start_timestamp);
        let replay = self.replay(&key, epoch(now))?;
        Ok(self.shares_to_receipt(replay.shares)?)
    }

    /// Real reward weight of a position at `now`.
    pub fn reward_weight(&self, user: Address, start_timestamp: u64, now: u64) -> Result<u128, LockingError> {
        let key = PositionKey::new(user, start_timestamp);
        let position = self.positions.get(&key).ok_or(LockingError::UserNotUnwinding)?;
        let nominal = LinearDecay::new().weight_at(position, epoch(now));
        Ok(mul_wad_down(nominal, self.slash_index)?)
    }

    // ------------------------------------------------------------------
    // Mutators (controller only)
    // ------------------------------------------------------------------

    /// Open a position for `user` with `principal` receipt tokens already
    /// held by the controller. `reward_weight` is the real boosted weight the
    /// decay starts from.
    #[allow(clippy::too_many_arguments)]
    pub fn start_unwinding(
        &mut self,
        caller: &Address,
        receipt: &mut Token,
        user: Address,
        timestamp: u64,
        principal: u128,
        unwinding_epochs: u64,
        reward_weight: u128,
    ) -> Result<(), LockingError> {
        only_controller(caller)?;
        if principal == 0 {
            return Err(LockingError::ZeroAmount);
        }
        let key = PositionKey::new(user, timestamp);
        if self.positions.contains_key(&key) {
            return Err(LockingError::UserUnwindingInProgress);
        }

        let shares = if self.total_shares == 0 {
            principal
        } else {
            mul_div_down(principal, self.total_shares, self.total_receipt_tokens)?
        };
        if shares == 0 {
            return Err(LockingError::ZeroAmount);
        }

        let now = epoch(timestamp);
        let mut position = LinearDecay::new().position(
            shares,
            principal,
            reward_weight,
            self.slash_index,
            now,
            unwinding_epochs,
        )?;
        let already_deposited = self.deposits.get(&now).map_or(0, Vec::len);
        position.skipped_deposits =
            u32::try_from(already_deposited).map_err(|_| MathError::ArithmeticOverflow)?;

        let mut point = self.point_at(now)?;
        point.total_reward_weight = point
            .total_reward_weight
            .checked_add(position.from_reward_weight)
            .ok_or(MathError::ArithmeticOverflow)?;
        self.points.insert(now, point);
        self.slopes.schedule(
            position.from_epoch,
            position.to_epoch,
            position.reward_weight_decrease,
        )?;

        receipt.transfer(&CONTROLLER, &LEDGER, principal)?;
        self.total_shares = add(self.total_shares, shares)?;
        self.total_receipt_tokens = add(self.total_receipt_tokens, principal)?;

        info!(
            position = %key,
            principal,
            shares,
            from_epoch = position.from_epoch,
            to_epoch = position.to_epoch,
            from_reward_weight = position.from_reward_weight,
            decrease = position.reward_weight_decrease,
            skipped_deposits = position.skipped_deposits,
            "unwinding started"
        );
        self.positions.insert(key, position);
        Ok(())
    }

    /// Abort a decaying position so its balance can be relocked for at least
    /// the epochs it still had to go.
    pub fn cancel_unwinding(
        &mut self,
        caller: &Address,
        user: Address,
        start_timestamp: u64,
        now: u64,
        new_duration: u64,
    ) -> Result<RelockTicket, LockingError> {
        only_controller(caller)?;
        let key = PositionKey::new(user, start_timestamp);
        let position = self.positions.get(&key).ok_or(LockingError::UserNotUnwinding)?;

        let current = epoch(now);
        if current < position.from_epoch {
            return Err(LockingError::UserUnwindingNotStarted);
        }
        if current >= position.to_epoch {
            return Err(LockingError::UserNotUnwinding);
        }
        let remaining = position.to_epoch - current;
        if new_duration < remaining {
            return Err(LockingError::InvalidUnwindingEpochs(new_duration));
        }

        let amount = self.settle(&key, current)?;
        info!(position = %key, amount, new_duration, remaining, "unwinding cancelled");
        Ok(RelockTicket {
            user,
            amount,
            new_duration,
        })
    }

    /// Close a finished position and pay its balance to the user.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        receipt: &mut Token,
        user: Address,
        start_timestamp: u64,
        now: u64,
    ) -> Result<u128, LockingError> {
        only_controller(caller)?;
        let key = PositionKey::new(user, start_timestamp);
        let position = self.positions.get(&key).ok_or(LockingError::UserNotUnwinding)?;
        let current = epoch(now);
        if current < position.to_epoch {
            return Err(LockingError::UserUnwindingInProgress);
        }

        let amount = self.settle(&key, current)?;
        receipt.transfer(&LEDGER, &user, amount)?;
        info!(position = %key, amount, "unwinding withdrawn");
        Ok(amount)
    }

    /// Add `amount` receipt tokens of yield, minting pool shares at the
    /// current price into this epoch's reward bucket.
    pub fn deposit_rewards(
        &mut self,
        caller: &Address,
        receipt: &mut Token,
        amount: u128,
        now: u64,
    ) -> Result<(), LockingError> {
        only_controller(caller)?;
        if amount == 0 {
            return Ok(());
        }
        let shares = if self.total_shares == 0 {
            amount
        } else {
            mul_div_down(amount, self.total_shares, self.total_receipt_tokens)?
        };

        let current = epoch(now);
        let mut point = self.point_at(current)?;
        point.reward_shares = add(point.reward_shares, shares)?;
        self.deposits.entry(current).or_default().push(RewardDeposit {
            shares,
            total_reward_weight: point.total_reward_weight,
        });
        self.points.insert(current, point);

        receipt.transfer(&CONTROLLER, &LEDGER, amount)?;
        self.total_shares = add(self.total_shares, shares)?;
        self.total_receipt_tokens = add(self.total_receipt_tokens, amount)?;
        debug!(amount, shares, epoch = current, "unwinding rewards deposited");
        Ok(())
    }

    /// Burn `amount` of pooled principal and discount every position through
    /// the slash index.
    pub fn apply_losses(
        &mut self,
        caller: &Address,
        receipt: &mut Token,
        amount: u128,
    ) -> Result<(), LockingError> {
        only_controller(caller)?;
        if amount == 0 {
            return Ok(());
        }
        let total = self.total_receipt_tokens;
        let left = total.checked_sub(amount).ok_or(MathError::ArithmeticOverflow)?;
        self.slash_index = mul_div_down(self.slash_index, left, total)?;
        receipt.burn(&LEDGER, amount)?;
        self.total_receipt_tokens = left;
        debug!(amount, slash_index = self.slash_index, "unwinding losses applied");
        Ok(())
    }

    /// Burn the whole pool after a catastrophic loss. The slash index drops
    /// to zero, so every real reward weight and balance reads as zero while
    /// the nominal bookkeeping stays consistent for later exits.
    pub fn wipe(&mut self, caller: &Address, receipt: &mut Token) -> Result<u128, LockingError> {
        only_controller(caller)?;
        let burned = self.total_receipt_tokens;
        receipt.burn(&LEDGER, burned)?;
        self.total_receipt_tokens = 0;
        self.slash_index = 0;
        warn!(burned, positions = self.positions.len(), "unwinding ledger wiped");
        Ok(burned)
    }

    /// Whether outstanding pool shares are left with nothing to claim.
    pub fn is_wiped(&self) -> bool {
        self.total_receipt_tokens == 0 && self.total_shares > 0
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Latest checkpoint rolled forward to `target`.
    fn point_at(&self, target: u64) -> Result<GlobalPoint, MathError> {
        match self.points.range(..=target).next_back() {
            Some((_, p)) => roll_forward(*p, target, &self.slopes),
            None => Ok(GlobalPoint {
                epoch: target,
                ..GlobalPoint::default()
            }),
        }
    }

    fn replay(&self, key: &PositionKey, current: u64) -> Result<PositionReplay, LockingError> {
        let position = self.positions.get(key).ok_or(LockingError::UserNotUnwinding)?;
        Ok(replay_position(&LinearDecay::new(), position, &self.deposits, current)?)
    }

    fn shares_to_receipt(&self, shares: u128) -> Result<u128, MathError> {
        if self.total_shares == 0 {
            return Ok(0);
        }
        mul_div_down(shares, self.total_receipt_tokens, self.total_shares)
    }

    /// Remove a position's weight and slope from the aggregates, burn its
    /// pool shares and return its balance. Deposits later in this epoch are
    /// split without it.
    fn settle(&mut self, key: &PositionKey, current: u64) -> Result<u128, LockingError> {
        let replay = self.replay(key, current)?;
        let position = self
            .positions
            .remove(key)
            .ok_or(LockingError::UserNotUnwinding)?;

        let mut point = self.point_at(current)?;
        point.total_reward_weight = sub(point.total_reward_weight, replay.reward_weight)?;
        if LinearDecay::new().is_decaying(&position, current) {
            point.total_reward_weight_decrease =
                sub(point.total_reward_weight_decrease, position.reward_weight_decrease)?;
            self.slopes
                .cancel_release(position.to_epoch, position.reward_weight_decrease)?;
        }
        self.points.insert(current, point);
        self.prune_deposits();

        let amount = self.shares_to_receipt(replay.shares)?;
        self.total_shares = sub(self.total_shares, replay.shares)?;
        self.total_receipt_tokens = sub(self.total_receipt_tokens, amount)?;
        debug!(
            position = %key,
            shares = replay.shares,
            reward_weight = replay.reward_weight,
            current_epoch_rewards = replay.current_epoch_rewards,
            amount,
            "position settled"
        );
        Ok(amount)
    }

    /// Deposits older than every open position's creation epoch are never
    /// replayed again.
    fn prune_deposits(&mut self) {
        match self.positions.values().map(UnwindingPosition::creation_epoch).min() {
            Some(oldest) => self.deposits = self.deposits.split_off(&oldest),
            None => self.deposits.clear(),
        }
    }
}

fn only_controller(caller: &Address) -> Result<(), LockingError> {
    if *caller == CONTROLLER {
        Ok(())
    } else {
        Err(LockingError::Unauthorized(Capability::LockedTokenManager))
    }
}

fn add(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::ArithmeticOverflow)
}

fn sub(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_sub(b).ok_or(MathError::ArithmeticOverflow)
}
