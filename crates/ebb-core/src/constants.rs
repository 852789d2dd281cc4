//! Protocol constants. All amounts are in receipt-token base units; all
//! fixed-point scalars are WAD-scaled (1.0 = 10^18).

/// Fixed-point denominator for multipliers, slash index and rates.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// One epoch: a week of seconds.
pub const EPOCH_SECS: u64 = 604_800;

/// Shift applied before bucketing timestamps into epochs.
///
/// The Unix epoch fell on a Thursday; shifting by three days makes every
/// protocol epoch start on Sunday 00:00 UTC.
///
/// # Examples
///
/// ```
/// use ebb_core::constants::{EPOCH_OFFSET_SECS, EPOCH_SECS};
/// assert_eq!(EPOCH_OFFSET_SECS * 7, EPOCH_SECS * 3);
/// ```
pub const EPOCH_OFFSET_SECS: u64 = 3 * 86_400;

/// Shortest lock duration a bucket may be enabled with, in epochs.
pub const MIN_UNWINDING_EPOCHS: u64 = 1;

/// Longest lock duration a bucket may be enabled with, in epochs.
///
/// Also bounds the replay cost of a single position's balance lookup.
pub const MAX_UNWINDING_EPOCHS: u64 = 100;

/// Lowest accepted bucket multiplier (1.0x, no boost).
pub const MIN_MULTIPLIER: u128 = WAD;

/// Highest accepted bucket multiplier (2.0x).
pub const MAX_MULTIPLIER: u128 = 2 * WAD;

/// Default share of the total balance a single loss may take before the
/// controller treats it as catastrophic: 99.9999%.
pub const DEFAULT_MAX_LOSS_PERCENTAGE: u128 = WAD - WAD / 1_000_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_bounds_are_one_and_two() {
        assert_eq!(MIN_MULTIPLIER, WAD);
        assert_eq!(MAX_MULTIPLIER, 2_000_000_000_000_000_000);
    }

    #[test]
    fn default_max_loss_is_six_nines() {
        assert_eq!(DEFAULT_MAX_LOSS_PERCENTAGE, 999_999_000_000_000_000);
    }

    #[test]
    fn unwinding_epoch_bounds_ordered() {
        assert!(MIN_UNWINDING_EPOCHS >= 1);
        assert!(MIN_UNWINDING_EPOCHS < MAX_UNWINDING_EPOCHS);
    }
}
