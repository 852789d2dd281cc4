//! The locking controller: bucket bookkeeping, reward and loss routing, and
//! the entry point for every user-facing lock operation.
//!
//! Every mutating call runs against a cloned draft of [`ControllerState`] and
//! is committed only when it returns `Ok`, so a failed call leaves no trace.

use std::collections::BTreeMap;
use std::fmt;

use ebb_core::constants::{
    MAX_MULTIPLIER, MAX_UNWINDING_EPOCHS, MIN_MULTIPLIER, MIN_UNWINDING_EPOCHS, WAD,
};
use ebb_core::error::{LockingError, MathError};
use ebb_core::traits::Authorizer;
use ebb_core::types::{Address, Capability, Env};
use ebb_core::wad::{format_wad, mul_div_down, mul_div_up, mul_wad_down};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bucket::Bucket;
use crate::config::LockingConfig;
use crate::ledger::{RelockTicket, UnwindingLedger};
use crate::metric::Metric;
use crate::token::{ShareToken, Token};

const CONTROLLER: Address = Address::LOCKING_CONTROLLER;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum ControllerStatus {
    Active,
    Paused,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerStatus::Active => write!(f, "active"),
            ControllerStatus::Paused => write!(f, "paused"),
        }
    }
}

/// What `apply_losses` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossOutcome {
    /// Loss absorbed pro-rata.
    Applied,
    /// Loss absorbed, but a sub-pool was wiped and the controller paused.
    Paused,
    /// Loss at or above the catastrophic threshold. Everything burned.
    Catastrophic,
}

/// Who funds a new lock.
enum Payer {
    /// Tokens come from the entry-point caller.
    EntryPoint(Address),
    /// Tokens released by a cancelled unwinding, pulled from the ledger.
    Relock(RelockTicket),
}

/// Everything the controller persists.
///
/// # Invariants
///
/// * `global_principal == Σ bucket.total_principal`
/// * `global_reward_weight == Σ bucket.reward_weight()`
/// * The controller's receipt balance equals `global_principal` and the
///   ledger's equals `ledger.total_receipt_tokens()`.
#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct ControllerState {
    receipt: Token,
    buckets: BTreeMap<u64, Bucket>,
    enabled: Vec<u64>,
    global_principal: u128,
    global_reward_weight: u128,
    max_loss_percentage: u128,
    status: ControllerStatus,
    ledger: UnwindingLedger,
}

impl ControllerState {
    pub fn new(receipt: Token, max_loss_percentage: u128) -> Self {
        Self {
            receipt,
            buckets: BTreeMap::new(),
            enabled: Vec::new(),
            global_principal: 0,
            global_reward_weight: 0,
            max_loss_percentage,
            status: ControllerStatus::Active,
            ledger: UnwindingLedger::new(),
        }
    }

    pub fn receipt(&self) -> &Token {
        &self.receipt
    }

    pub fn ledger(&self) -> &UnwindingLedger {
        &self.ledger
    }

    pub fn bucket(&self, duration: u64) -> Option<&Bucket> {
        self.buckets.get(&duration)
    }

    /// Enabled durations in the order they were enabled.
    pub fn enabled_buckets(&self) -> &[u64] {
        &self.enabled
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    pub fn global_principal(&self) -> u128 {
        self.global_principal
    }

    pub fn global_reward_weight(&self) -> u128 {
        self.global_reward_weight
    }

    pub fn max_loss_percentage(&self) -> u128 {
        self.max_loss_percentage
    }

    /// Principal held by locked buckets plus the unwinding pool.
    pub fn total_balance(&self) -> Result<u128, MathError> {
        self.global_principal
            .checked_add(self.ledger.total_receipt_tokens())
            .ok_or(MathError::ArithmeticOverflow)
    }

    /// Global reward weight summed bucket by bucket.
    pub fn recomputed_reward_weight(&self) -> Result<u128, MathError> {
        self.buckets.values().try_fold(0u128, |acc, b| {
            acc.checked_add(b.reward_weight()?)
                .ok_or(MathError::ArithmeticOverflow)
        })
    }

    /// Sum `metric` over every enabled bucket `user` holds shares in.
    fn aggregate(&self, user: &Address, metric: Metric) -> Result<u128, MathError> {
        let mut total = 0u128;
        for duration in &self.enabled {
            let Some(bucket) = self.buckets.get(duration) else {
                continue;
            };
            let shares = bucket.share_token.balance_of(user);
            if shares == 0 {
                continue;
            }
            total = total
                .checked_add(metric.of(bucket, shares)?)
                .ok_or(MathError::ArithmeticOverflow)?;
        }
        Ok(total)
    }

    fn require_active(&self) -> Result<(), LockingError> {
        match self.status {
            ControllerStatus::Active => Ok(()),
            ControllerStatus::Paused => Err(LockingError::Paused),
        }
    }

    fn bucket_mut(&mut self, duration: u64) -> Result<&mut Bucket, LockingError> {
        self.buckets
            .get_mut(&duration)
            .ok_or(LockingError::InvalidBucket(duration))
    }

    // ------------------------------------------------------------------
    // Governor
    // ------------------------------------------------------------------

    fn enable_bucket(
        &mut self,
        duration: u64,
        share_token: ShareToken,
        multiplier: u128,
    ) -> Result<(), LockingError> {
        if !(MIN_UNWINDING_EPOCHS..=MAX_UNWINDING_EPOCHS).contains(&duration) {
            return Err(LockingError::InvalidUnwindingEpochs(duration));
        }
        check_multiplier(multiplier)?;
        if self.buckets.contains_key(&duration) || share_token.total_supply() != 0 {
            return Err(LockingError::InvalidBucket(duration));
        }
        info!(
            duration,
            multiplier = %format_wad(multiplier),
            share_token = share_token.symbol(),
            "bucket enabled"
        );
        self.buckets.insert(duration, Bucket::new(share_token, multiplier));
        self.enabled.push(duration);
        Ok(())
    }

    fn set_bucket_multiplier(&mut self, duration: u64, multiplier: u128) -> Result<(), LockingError> {
        check_multiplier(multiplier)?;
        let bucket = self.bucket_mut(duration)?;
        let before = bucket.reward_weight()?;
        bucket.multiplier = multiplier;
        let after = bucket.reward_weight()?;
        self.global_reward_weight = replace_part(self.global_reward_weight, before, after)?;
        info!(duration, before, after, "bucket multiplier updated");
        Ok(())
    }

    fn set_max_loss_percentage(&mut self, percentage: u128) -> Result<(), LockingError> {
        if percentage == 0 || percentage > WAD {
            return Err(LockingError::InvalidPercentage(percentage));
        }
        self.max_loss_percentage = percentage;
        info!(percentage = %format_wad(percentage), "max loss percentage set");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry point
    // ------------------------------------------------------------------

    fn create_position(
        &mut self,
        auth: &dyn Authorizer,
        payer: Payer,
        amount: u128,
        duration: u64,
        recipient: Address,
    ) -> Result<u128, LockingError> {
        if amount == 0 {
            return Err(LockingError::ZeroAmount);
        }
        let source = match &payer {
            Payer::EntryPoint(caller) => *caller,
            Payer::Relock(_) => Address::UNWINDING_LEDGER,
        };

        let bucket = self
            .buckets
            .get_mut(&duration)
            .ok_or(LockingError::InvalidBucket(duration))?;
        let shares = bucket.shares_for_deposit(amount)?;
        if shares == 0 {
            return Err(LockingError::ZeroAmount);
        }
        self.receipt.transfer(&source, &CONTROLLER, amount)?;

        let before = bucket.reward_weight()?;
        bucket.share_token.mint(auth, &CONTROLLER, &recipient, shares)?;
        bucket.total_principal = add(bucket.total_principal, amount)?;
        let after = bucket.reward_weight()?;

        self.global_principal = add(self.global_principal, amount)?;
        self.global_reward_weight = replace_part(self.global_reward_weight, before, after)?;
        info!(
            %recipient,
            amount,
            duration,
            shares,
            relock = matches!(payer, Payer::Relock(_)),
            "position created"
        );
        Ok(shares)
    }

    fn start_unwinding(
        &mut self,
        auth: &dyn Authorizer,
        timestamp: u64,
        shares: u128,
        duration: u64,
        recipient: Address,
    ) -> Result<(), LockingError> {
        if shares == 0 {
            return Err(LockingError::ZeroAmount);
        }
        let bucket = self
            .buckets
            .get_mut(&duration)
            .ok_or(LockingError::InvalidBucket(duration))?;
        let principal = bucket.principal_for_shares(shares)?;
        if principal == 0 {
            return Err(LockingError::ZeroAmount);
        }

        let before = bucket.reward_weight()?;
        bucket.share_token.burn(auth, &CONTROLLER, &recipient, shares)?;
        bucket.total_principal = sub(bucket.total_principal, principal)?;
        let after = bucket.reward_weight()?;
        let target = mul_wad_down(principal, bucket.multiplier)?;

        self.global_principal = sub(self.global_principal, principal)?;
        self.global_reward_weight = replace_part(self.global_reward_weight, before, after)?;
        self.ledger.start_unwinding(
            &CONTROLLER,
            &mut self.receipt,
            recipient,
            timestamp,
            principal,
            duration,
            target,
        )
    }

    fn increase_unwinding_epochs(
        &mut self,
        auth: &dyn Authorizer,
        shares: u128,
        old_duration: u64,
        new_duration: u64,
        recipient: Address,
    ) -> Result<u128, LockingError> {
        if new_duration <= old_duration {
            return Err(LockingError::BucketMustBeLongerDuration {
                old: old_duration,
                new: new_duration,
            });
        }
        if shares == 0 {
            return Err(LockingError::ZeroAmount);
        }
        if !self.buckets.contains_key(&new_duration) {
            return Err(LockingError::InvalidBucket(new_duration));
        }

        let old = self.bucket_mut(old_duration)?;
        let principal = old.principal_for_shares(shares)?;
        if principal == 0 {
            return Err(LockingError::ZeroAmount);
        }
        let old_before = old.reward_weight()?;
        old.share_token.burn(auth, &CONTROLLER, &recipient, shares)?;
        old.total_principal = sub(old.total_principal, principal)?;
        let old_after = old.reward_weight()?;

        let new = self.bucket_mut(new_duration)?;
        let new_shares = new.shares_for_deposit(principal)?;
        if new_shares == 0 {
            return Err(LockingError::ZeroAmount);
        }
        let new_before = new.reward_weight()?;
        new.share_token.mint(auth, &CONTROLLER, &recipient, new_shares)?;
        new.total_principal = add(new.total_principal, principal)?;
        let new_after = new.reward_weight()?;

        let before = add(old_before, new_before)?;
        let after = add(old_after, new_after)?;
        self.global_reward_weight = replace_part(self.global_reward_weight, before, after)?;
        info!(
            %recipient,
            principal,
            old_duration,
            new_duration,
            new_shares,
            "unwinding epochs increased"
        );
        Ok(new_shares)
    }

    fn cancel_unwinding(
        &mut self,
        auth: &dyn Authorizer,
        now: u64,
        user: Address,
        start_timestamp: u64,
        new_duration: u64,
    ) -> Result<u128, LockingError> {
        let ticket = self
            .ledger
            .cancel_unwinding(&CONTROLLER, user, start_timestamp, now, new_duration)?;
        let (amount, duration, recipient) = (ticket.amount(), ticket.new_duration(), ticket.user());
        self.create_position(auth, Payer::Relock(ticket), amount, duration, recipient)
    }

    // ------------------------------------------------------------------
    // Finance manager
    // ------------------------------------------------------------------

    fn deposit_rewards(&mut self, caller: Address, now: u64, amount: u128) -> Result<(), LockingError> {
        if amount == 0 {
            return Err(LockingError::ZeroAmount);
        }
        let ledger_weight = self.ledger.total_reward_weight(now)?;
        let total_weight = add(ledger_weight, self.global_reward_weight)?;
        if total_weight == 0 {
            info!(amount, "no reward weight, rewards not pulled");
            return Ok(());
        }

        self.receipt.transfer(&caller, &CONTROLLER, amount)?;
        let ledger_part = mul_div_down(amount, ledger_weight, total_weight)?;
        if ledger_part > 0 {
            self.ledger
                .deposit_rewards(&CONTROLLER, &mut self.receipt, ledger_part, now)?;
        }
        let locked_part = amount - ledger_part;
        self.distribute_rewards(locked_part)?;
        self.global_reward_weight = self.recomputed_reward_weight()?;
        info!(amount, ledger_part, locked_part, "rewards deposited");
        Ok(())
    }

    /// Spread `amount` over buckets by reward weight. Rounds down; the last
    /// weighted bucket takes the dust.
    fn distribute_rewards(&mut self, amount: u128) -> Result<(), LockingError> {
        if amount == 0 {
            return Ok(());
        }
        let mut weights = Vec::with_capacity(self.enabled.len());
        for duration in &self.enabled {
            if let Some(b) = self.buckets.get(duration) {
                let w = b.reward_weight()?;
                if w > 0 {
                    weights.push((*duration, w));
                }
            }
        }
        let total: u128 = weights.iter().map(|(_, w)| *w).sum();
        let mut left = amount;
        for (i, (duration, weight)) in weights.iter().enumerate() {
            let share = if i + 1 == weights.len() {
                left
            } else {
                mul_div_down(amount, *weight, total)?
            };
            left -= share;
            let bucket = self.bucket_mut(*duration)?;
            bucket.total_principal = add(bucket.total_principal, share)?;
            debug!(duration, share, "bucket rewarded");
        }
        self.global_principal = add(self.global_principal, amount - left)?;
        Ok(())
    }

    fn apply_losses(&mut self, now: u64, amount: u128) -> Result<LossOutcome, LockingError> {
        if amount == 0 {
            return Err(LockingError::ZeroAmount);
        }
        let total_balance = self.total_balance()?;
        if total_balance == 0 {
            warn!(amount, "loss reported against an empty system, ignored");
            return Ok(LossOutcome::Applied);
        }

        let maximum_allowed_loss = mul_wad_down(total_balance, self.max_loss_percentage)?;
        if amount >= maximum_allowed_loss {
            self.wipe_all()?;
            warn!(
                amount,
                total_balance,
                maximum_allowed_loss,
                "catastrophic loss, controller paused"
            );
            return Ok(LossOutcome::Catastrophic);
        }

        let ledger_balance = self.ledger.total_receipt_tokens();
        let ledger_loss = mul_div_up(amount, ledger_balance, total_balance)?.min(ledger_balance);
        if ledger_loss > 0 {
            self.ledger
                .apply_losses(&CONTROLLER, &mut self.receipt, ledger_loss)?;
        }

        let locked_loss = amount - ledger_loss;
        let mut left = locked_loss;
        if locked_loss > 0 {
            let global_principal = self.global_principal;
            for duration in self.enabled.clone() {
                if left == 0 {
                    break;
                }
                let bucket = self.bucket_mut(duration)?;
                let loss = mul_div_up(locked_loss, bucket.total_principal, global_principal)?
                    .min(bucket.total_principal)
                    .min(left);
                bucket.total_principal -= loss;
                left -= loss;
                debug!(duration, loss, "bucket slashed");
            }
        }
        let burned = locked_loss - left;
        self.receipt.burn(&CONTROLLER, burned)?;
        self.global_principal = sub(self.global_principal, burned)?;
        self.global_reward_weight = self.recomputed_reward_weight()?;
        info!(amount, ledger_loss, locked_loss = burned, "losses applied");

        if self.ledger.is_wiped() || self.buckets.values().any(Bucket::is_wiped) {
            self.status = ControllerStatus::Paused;
            warn!(now, "sub-pool wiped by loss, controller paused");
            return Ok(LossOutcome::Paused);
        }
        Ok(LossOutcome::Applied)
    }

    /// Burn every principal token and zero every aggregate.
    fn wipe_all(&mut self) -> Result<(), LockingError> {
        self.ledger.wipe(&CONTROLLER, &mut self.receipt)?;
        for bucket in self.buckets.values_mut() {
            bucket.total_principal = 0;
        }
        let held = self.receipt.balance_of(&CONTROLLER);
        self.receipt.burn(&CONTROLLER, held)?;
        self.global_principal = 0;
        self.global_reward_weight = 0;
        self.status = ControllerStatus::Paused;
        Ok(())
    }
}

/// Locks receipt tokens into duration buckets and routes yield and losses.
pub struct LockingController<A: Authorizer> {
    authorizer: A,
    state: ControllerState,
}

impl<A: Authorizer> LockingController<A> {
    /// An empty, active controller with the default loss threshold.
    pub fn new(authorizer: A, receipt: Token) -> Self {
        Self::from_snapshot(
            authorizer,
            ControllerState::new(receipt, LockingConfig::default().max_loss_percentage),
        )
    }

    /// Build a controller and enable every bucket in `config`.
    pub fn with_config(
        authorizer: A,
        receipt: Token,
        config: &LockingConfig,
    ) -> Result<Self, LockingError> {
        let mut state = ControllerState::new(receipt, config.max_loss_percentage);
        state.set_max_loss_percentage(config.max_loss_percentage)?;
        for b in &config.buckets {
            let token = ShareToken::new(LockingConfig::share_symbol(b.duration));
            state.enable_bucket(b.duration, token, b.multiplier)?;
        }
        Ok(Self::from_snapshot(authorizer, state))
    }

    /// Resume from persisted state.
    pub fn from_snapshot(authorizer: A, state: ControllerState) -> Self {
        Self { authorizer, state }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Run `f` against a draft of the state; commit only on success.
    fn transact<T>(
        &mut self,
        f: impl FnOnce(&dyn Authorizer, &mut ControllerState) -> Result<T, LockingError>,
    ) -> Result<T, LockingError> {
        let mut draft = self.state.clone();
        let out = f(&self.authorizer, &mut draft)?;
        self.state = draft;
        Ok(out)
    }

    fn require(&self, capability: Capability, env: &Env) -> Result<(), LockingError> {
        if self.authorizer.has(capability, &env.caller) {
            Ok(())
        } else {
            Err(LockingError::Unauthorized(capability))
        }
    }

    // ------------------------------------------------------------------
    // Governor
    // ------------------------------------------------------------------

    pub fn enable_bucket(
        &mut self,
        env: &Env,
        duration: u64,
        share_token: ShareToken,
        multiplier: u128,
    ) -> Result<(), LockingError> {
        self.require(Capability::Governor, env)?;
        self.transact(|_, s| {
            s.require_active()?;
            s.enable_bucket(duration, share_token, multiplier)
        })
    }

    pub fn set_bucket_multiplier(
        &mut self,
        env: &Env,
        duration: u64,
        multiplier: u128,
    ) -> Result<(), LockingError> {
        self.require(Capability::Governor, env)?;
        self.transact(|_, s| {
            s.require_active()?;
            s.set_bucket_multiplier(duration, multiplier)
        })
    }

    pub fn set_max_loss_percentage(&mut self, env: &Env, percentage: u128) -> Result<(), LockingError> {
        self.require(Capability::Governor, env)?;
        self.transact(|_, s| {
            s.require_active()?;
            s.set_max_loss_percentage(percentage)
        })
    }

    pub fn pause(&mut self, env: &Env) -> Result<(), LockingError> {
        self.require(Capability::Governor, env)?;
        self.state.status = ControllerStatus::Paused;
        warn!(caller = %env.caller, "controller paused");
        Ok(())
    }

    pub fn unpause(&mut self, env: &Env) -> Result<(), LockingError> {
        self.require(Capability::Governor, env)?;
        self.state.status = ControllerStatus::Active;
        info!(caller = %env.caller, "controller unpaused");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Entry point
    // ------------------------------------------------------------------

    /// Lock `amount` receipt tokens from the caller for `duration` epochs.
    /// Returns the bucket shares minted to `recipient`.
    pub fn create_position(
        &mut self,
        env: &Env,
        amount: u128,
        duration: u64,
        recipient: Address,
    ) -> Result<u128, LockingError> {
        self.require(Capability::EntryPoint, env)?;
        let caller = env.caller;
        self.transact(|auth, s| {
            s.require_active()?;
            s.create_position(auth, Payer::EntryPoint(caller), amount, duration, recipient)
        })
    }

    /// Move `shares` of the `duration` bucket into the unwinding ledger. The
    /// position is keyed by `(recipient, env.timestamp)`.
    pub fn start_unwinding(
        &mut self,
        env: &Env,
        shares: u128,
        duration: u64,
        recipient: Address,
    ) -> Result<(), LockingError> {
        self.require(Capability::EntryPoint, env)?;
        let now = env.timestamp;
        self.transact(|auth, s| {
            s.require_active()?;
            s.start_unwinding(auth, now, shares, duration, recipient)
        })
    }

    /// Move `shares` to a longer bucket without unwinding.
    pub fn increase_unwinding_epochs(
        &mut self,
        env: &Env,
        shares: u128,
        old_duration: u64,
        new_duration: u64,
        recipient: Address,
    ) -> Result<u128, LockingError> {
        self.require(Capability::EntryPoint, env)?;
        self.transact(|auth, s| {
            s.require_active()?;
            s.increase_unwinding_epochs(auth, shares, old_duration, new_duration, recipient)
        })
    }

    /// Abort an unwinding and relock its balance into `new_duration`.
    /// Returns the bucket shares minted.
    pub fn cancel_unwinding(
        &mut self,
        env: &Env,
        user: Address,
        start_timestamp: u64,
        new_duration: u64,
    ) -> Result<u128, LockingError> {
        self.require(Capability::EntryPoint, env)?;
        let now = env.timestamp;
        self.transact(|auth, s| {
            s.require_active()?;
            s.cancel_unwinding(auth, now, user, start_timestamp, new_duration)
        })
    }

    /// Pay out a finished unwinding. Returns the amount sent to `user`.
    pub fn withdraw(&mut self, env: &Env, user: Address, start_timestamp: u64) -> Result<u128, LockingError> {
        self.require(Capability::EntryPoint, env)?;
        let now = env.timestamp;
        self.transact(|_, s| {
            s.require_active()?;
            s.ledger
                .withdraw(&CONTROLLER, &mut s.receipt, user, start_timestamp, now)
        })
    }

    // ------------------------------------------------------------------
    // Finance manager
    // ------------------------------------------------------------------

    pub fn deposit_rewards(&mut self, env: &Env, amount: u128) -> Result<(), LockingError> {
        self.require(Capability::FinanceManager, env)?;
        let (caller, now) = (env.caller, env.timestamp);
        self.transact(|_, s| {
            s.require_active()?;
            s.deposit_rewards(caller, now, amount)
        })
    }

    pub fn apply_losses(&mut self, env: &Env, amount: u128) -> Result<LossOutcome, LockingError> {
        self.require(Capability::FinanceManager, env)?;
        let now = env.timestamp;
        self.transact(|_, s| {
            s.require_active()?;
            s.apply_losses(now, amount)
        })
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Principal `user` could redeem across every bucket.
    pub fn balance_of(&self, user: &Address) -> Result<u128, MathError> {
        self.state.aggregate(user, Metric::Principal)
    }

    /// Reward weight of `user` across every bucket.
    pub fn reward_weight(&self, user: &Address) -> Result<u128, MathError> {
        self.state.aggregate(user, Metric::RewardWeight)
    }

    pub fn reward_weight_for_duration(&self, user: &Address, duration: u64) -> Result<u128, LockingError> {
        let bucket = self
            .state
            .bucket(duration)
            .ok_or(LockingError::InvalidBucket(duration))?;
        Ok(Metric::RewardWeight.of(bucket, bucket.share_token.balance_of(user))?)
    }

    /// Principal per share of the `duration` bucket, WAD-scaled.
    pub fn exchange_rate(&self, duration: u64) -> Result<u128, LockingError> {
        let bucket = self
            .state
            .bucket(duration)
            .ok_or(LockingError::InvalidBucket(duration))?;
        Ok(bucket.exchange_rate()?)
    }

    pub fn total_balance(&self) -> Result<u128, MathError> {
        self.state.total_balance()
    }

    /// Average multiplier over locked principal, WAD-scaled.
    pub fn reward_multiplier(&self) -> Result<u128, MathError> {
        if self.state.global_principal == 0 {
            return Ok(WAD);
        }
        mul_div_down(self.state.global_reward_weight, WAD, self.state.global_principal)
    }

    pub fn global_principal(&self) -> u128 {
        self.state.global_principal
    }

    pub fn global_reward_weight(&self) -> u128 {
        self.state.global_reward_weight
    }

    pub fn enabled_buckets(&self) -> &[u64] {
        self.state.enabled_buckets()
    }

    pub fn bucket(&self, duration: u64) -> Option<&Bucket> {
        self.state.bucket(duration)
    }

    pub fn status(&self) -> ControllerStatus {
        self.state.status
    }

    pub fn ledger(&self) -> &UnwindingLedger {
        &self.state.ledger
    }

    pub fn receipt(&self) -> &Token {
        &self.state.receipt
    }

    pub fn unwinding_balance_of(&self, user: Address, start_timestamp: u64, now: u64) -> Result<u128, LockingError> {
        self.state.ledger.balance_of(user, start_timestamp, now)
    }

    pub fn unwinding_reward_weight(
        &self,
        user: Address,
        start_timestamp: u64,
        now: u64,
    ) -> Result<u128, LockingError> {
        self.state.ledger.reward_weight(user, start_timestamp, now)
    }
}

fn check_multiplier(multiplier: u128) -> Result<(), LockingError> {
    if (MIN_MULTIPLIER..=MAX_MULTIPLIER).contains(&multiplier) {
        Ok(())
    } else {
        Err(LockingError::InvalidMultiplier(multiplier))
    }
}

/// `total - before + after`, checked.
fn replace_part(total: u128, before: u128, after: u128) -> Result<u128, MathError> {
    sub(total, before)?
        .checked_add(after)
        .ok_or(MathError::ArithmeticOverflow)
}

fn add(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_add(b).ok_or(MathError::ArithmeticOverflow)
}

fn sub(a: u128, b: u128) -> Result<u128, MathError> {
    a.checked_sub(b).ok_or(MathError::ArithmeticOverflow)
}
