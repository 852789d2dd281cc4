//! Core protocol types: addresses, capabilities, unwinding records.
//!
//! All amounts, shares and reward weights are `u128` base units. Reward
//! weights stored in [`UnwindingPosition`] and [`GlobalPoint`] are *nominal*:
//! divided by the slash index that was current when they were written.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 20-byte account identifier.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Account under which the locking controller holds bucket principal.
    pub const LOCKING_CONTROLLER: Self = Self(*b"ebb:locking-ctrl\0\0\0\x01");

    /// Account under which the unwinding ledger holds pooled principal.
    pub const UNWINDING_LEDGER: Self = Self(*b"ebb:unwinding-ledg\0\x02");

    /// Deterministic address filled with one byte. Handy for fixtures.
    ///
    /// # Examples
    ///
    /// ```
    /// use ebb_core::types::Address;
    /// assert_eq!(Address::from_seed(7).0, [7u8; 20]);
    /// ```
    pub const fn from_seed(seed: u8) -> Self {
        Self([seed; 20])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// Named permissions checked on every mutating entry point.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub enum Capability {
    /// User-facing router: create, unwind, cancel, withdraw.
    EntryPoint,
    /// Yield accounting: deposit rewards, apply losses.
    FinanceManager,
    /// Admin: bucket configuration, loss threshold, pause.
    Governor,
    /// May mint and burn bucket share tokens.
    LockedTokenManager,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EntryPoint => "entry-point",
            Self::FinanceManager => "finance-manager",
            Self::Governor => "governor",
            Self::LockedTokenManager => "locked-token-manager",
        };
        f.write_str(name)
    }
}

/// Caller and block time of a single mutating call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Env {
    pub caller: Address,
    /// Unix seconds.
    pub timestamp: u64,
}

impl Env {
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }
}

/// Identifies one unwinding position. A user may unwind several times, so the
/// start timestamp is part of the key.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct PositionKey {
    pub user: Address,
    pub start_timestamp: u64,
}

impl PositionKey {
    pub fn new(user: Address, start_timestamp: u64) -> Self {
        Self { user, start_timestamp }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.start_timestamp)
    }
}

/// A position that left its bucket and is decaying toward withdrawal.
///
/// # Invariants
///
/// * `from_epoch < to_epoch`
/// * `from_reward_weight - reward_weight_decrease * (to_epoch - from_epoch)`
///   is the position's floor and never underflows
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct UnwindingPosition {
    /// Ledger pool shares held at creation (rewards accrue on top lazily).
    pub shares: u128,
    /// First epoch in which the weight decreases.
    pub from_epoch: u64,
    /// First epoch at the floor; withdrawals open here.
    pub to_epoch: u64,
    /// Nominal weight before decay.
    pub from_reward_weight: u128,
    /// Nominal weight removed per epoch in `[from_epoch, to_epoch)`.
    pub reward_weight_decrease: u128,
    /// Reward deposits already made in the creation epoch when the position
    /// joined. It earns nothing from them.
    pub skipped_deposits: u32,
}

impl UnwindingPosition {
    /// Number of decay steps.
    pub fn unwinding_epochs(&self) -> u64 {
        self.to_epoch - self.from_epoch
    }

    /// The epoch in which the position was requested.
    pub fn creation_epoch(&self) -> u64 {
        self.from_epoch.saturating_sub(1)
    }

    /// Nominal weight once fully decayed.
    pub fn floor_reward_weight(&self) -> u128 {
        self.from_reward_weight
            - self.reward_weight_decrease * u128::from(self.unwinding_epochs())
    }
}

/// One reward deposit into the unwinding pool.
///
/// Shares are split among the positions open at deposit time, by nominal
/// weight over the `total_reward_weight` they summed to.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct RewardDeposit {
    pub shares: u128,
    pub total_reward_weight: u128,
}

/// Aggregate checkpoint of all unwinding positions at one epoch.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct GlobalPoint {
    pub epoch: u64,
    /// Sum of nominal position weights during `epoch`.
    pub total_reward_weight: u128,
    /// Sum of per-epoch decrements of positions currently decaying.
    pub total_reward_weight_decrease: u128,
    /// Pool shares minted for rewards deposited during `epoch`.
    pub reward_shares: u128,
}
