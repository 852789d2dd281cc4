//! Epoch arithmetic.
//!
//! Epochs are fixed one-week windows shifted by [`EPOCH_OFFSET_SECS`].
//! Timestamps before the offset belong to epoch 0.
//!
//! - Epoch 0: `[0, EPOCH_OFFSET_SECS + EPOCH_SECS)`
//! - Epoch n ≥ 1: `[epoch_start(n), epoch_start(n + 1))`

use crate::constants::{EPOCH_OFFSET_SECS, EPOCH_SECS};

/// Which epoch a Unix timestamp falls in.
///
/// # Examples
///
/// ```
/// use ebb_core::epoch::{epoch, epoch_start};
/// assert_eq!(epoch(0), 0);
/// assert_eq!(epoch(epoch_start(12)), 12);
/// assert_eq!(epoch(epoch_start(12) - 1), 11);
/// ```
pub fn epoch(timestamp: u64) -> u64 {
    timestamp.saturating_sub(EPOCH_OFFSET_SECS) / EPOCH_SECS
}

/// First second of an epoch.
pub fn epoch_start(epoch: u64) -> u64 {
    epoch.saturating_mul(EPOCH_SECS).saturating_add(EPOCH_OFFSET_SECS)
}

/// The epoch after the one containing `timestamp`.
pub fn next_epoch(timestamp: u64) -> u64 {
    epoch(timestamp) + 1
}
