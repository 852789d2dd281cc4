//! # ebb-decay: Unwinding decay engine.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Linear decay to a floor**: an unwinding position's reward weight drops
//!   by a fixed decrement per epoch until it reaches its principal, then holds.
//! - **Lazy aggregate**: the ledger-wide checkpoint is advanced by replaying
//!   sparse slope deltas, never by iterating positions.
//! - **Position replay**: balances are re-derived from the reward deposit
//!   history, attributing each deposit by weight among the positions open
//!   when it was made.

pub mod engine;
pub mod replay;
pub mod rollforward;

pub use engine::{DecaySchedule, LinearDecay};
pub use replay::{replay_position, PositionReplay};
pub use rollforward::{roll_forward, SlopeChanges};
