//! Linear reward-weight decay toward a nonzero floor.
//!
//! A position entering the unwinding ledger with principal `P` and boosted
//! weight `W` decays from `W` to `P` (both divided by the slash index) in
//! `E` equal integer steps, one per epoch, starting the epoch after the
//! request. All arithmetic is integer-only with checked u128 intermediates.

use ebb_core::error::MathError;
use ebb_core::traits::DecayModel;
use ebb_core::types::UnwindingPosition;
use ebb_core::wad::div_wad_down;

/// Nominal decay parameters of one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecaySchedule {
    /// Starting weight after the rounding remainder has been removed.
    pub from_reward_weight: u128,
    /// Weight removed in each decaying epoch.
    pub reward_weight_decrease: u128,
    /// Weight once decay has finished.
    pub floor_reward_weight: u128,
}

/// The production decay model.
///
/// - Weight is flat in the request epoch.
/// - It drops by a fixed decrement in each of the next `E` epochs.
/// - It lands exactly on the floor and holds there.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearDecay;

impl LinearDecay {
    /// Create a new LinearDecay.
    pub fn new() -> Self {
        Self
    }

    /// Compute the nominal schedule for a position.
    ///
    /// `principal` and `reward_weight` are in real terms; both are divided by
    /// `slash_index` (rounding down). The per-epoch decrement rounds down and
    /// the remainder is taken off the starting weight, so after exactly
    /// `unwinding_epochs` steps the weight equals the floor.
    pub fn schedule(
        &self,
        principal: u128,
        reward_weight: u128,
        slash_index: u128,
        unwinding_epochs: u64,
    ) -> Result<DecaySchedule, MathError> {
        if unwinding_epochs == 0 {
            return Err(MathError::DivisionByZero);
        }
        let floor = div_wad_down(principal, slash_index)?;
        let from = div_wad_down(reward_weight, slash_index)?.max(floor);

        let epochs = u128::from(unwinding_epochs);
        let decrease = (from - floor) / epochs;

        Ok(DecaySchedule {
            from_reward_weight: floor + decrease * epochs,
            reward_weight_decrease: decrease,
            floor_reward_weight: floor,
        })
    }
}

impl DecayModel for LinearDecay {
    fn position(
        &self,
        shares: u128,
        principal: u128,
        reward_weight: u128,
        slash_index: u128,
        request_epoch: u64,
        unwinding_epochs: u64,
    ) -> Result<UnwindingPosition, MathError> {
        let s = self.schedule(principal, reward_weight, slash_index, unwinding_epochs)?;
        let from_epoch = request_epoch + 1;
        Ok(UnwindingPosition {
            shares,
            from_epoch,
            to_epoch: from_epoch + unwinding_epochs,
            from_reward_weight: s.from_reward_weight,
            reward_weight_decrease: s.reward_weight_decrease,
            skipped_deposits: 0,
        })
    }

    fn weight_at(&self, position: &UnwindingPosition, epoch: u64) -> u128 {
        if epoch < position.from_epoch {
            return position.from_reward_weight;
        }
        let steps = (epoch - position.from_epoch + 1).min(position.unwinding_epochs());
        position.from_reward_weight - position.reward_weight_decrease * u128::from(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebb_core::constants::WAD;
    use proptest::prelude::*;

    fn engine() -> LinearDecay {
        LinearDecay::new()
    }

    const ONE_POINT_TWO: u128 = WAD + WAD / 5;

    #[test]
    fn ten_epoch_lock_at_1_2x() {
        let e = engine();
        let p = e.position(1000, 1000, 1200, WAD, 50, 10).unwrap();
        assert_eq!(p.from_reward_weight, 1200);
        assert_eq!(p.reward_weight_decrease, 20);
        assert_eq!(p.from_epoch, 51);
        assert_eq!(p.to_epoch, 61);

        // Flat during the request epoch.
        assert_eq!(e.weight_at(&p, 50), 1200);
        // -20 per epoch for ten epochs.
        for k in 0..10u64 {
            assert_eq!(e.weight_at(&p, 51 + k), 1200 - 20 * (u128::from(k) + 1));
        }
        // Holds at the floor.
        assert_eq!(e.weight_at(&p, 60), 1000);
        assert_eq!(e.weight_at(&p, 61), 1000);
        assert_eq!(e.weight_at(&p, 500), 1000);
    }

    #[test]
    fn remainder_removed_from_start() {
        let e = engine();
        // 1000 * 1.2 = 1200 over 7 epochs: 200 / 7 = 28 rem 4.
        let s = e.schedule(1000, 1200, WAD, 7).unwrap();
        assert_eq!(s.reward_weight_decrease, 28);
        assert_eq!(s.from_reward_weight, 1000 + 28 * 7);
        assert_eq!(s.floor_reward_weight, 1000);
    }

    #[test]
    fn slash_index_scales_to_nominal() {
        let e = engine();
        // Half-slashed ledger: nominal values are doubled.
        let s = e.schedule(1000, 1200, WAD / 2, 10).unwrap();
        assert_eq!(s.floor_reward_weight, 2000);
        assert_eq!(s.from_reward_weight, 2400);
        assert_eq!(s.reward_weight_decrease, 40);
    }

    #[test]
    fn weight_below_principal_clamped_to_floor() {
        let e = engine();
        let s = e.schedule(1000, 900, WAD, 4).unwrap();
        assert_eq!(s.from_reward_weight, 1000);
        assert_eq!(s.reward_weight_decrease, 0);
    }

    #[test]
    fn zero_epochs_rejected() {
        assert_eq!(
            engine().schedule(1, 1, WAD, 0),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    fn zero_slash_index_rejected() {
        assert_eq!(
            engine().schedule(1, 1, 0, 3),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    fn decaying_window() {
        let e = engine();
        let p = e.position(1, 1000, 1200, WAD, 0, 2).unwrap();
        assert!(!e.is_decaying(&p, 0));
        assert!(e.is_decaying(&p, 1));
        assert!(e.is_decaying(&p, 2));
        assert!(!e.is_decaying(&p, 3));
    }

    proptest! {
        #[test]
        fn lands_exactly_on_floor(
            principal in 1u128..=1_000_000_000_000_000,
            multiplier in WAD..=2 * WAD,
            epochs in 1u64..=100,
        ) {
            let e = engine();
            let rw = principal * multiplier / WAD;
            let p = e.position(principal, principal, rw, WAD, 0, epochs).unwrap();
            prop_assert_eq!(e.weight_at(&p, p.to_epoch - 1), principal);
            prop_assert_eq!(e.weight_at(&p, p.to_epoch + 1000), principal);
            prop_assert!(p.from_reward_weight <= rw);
            prop_assert!(rw - p.from_reward_weight < u128::from(epochs));
        }

        #[test]
        fn weight_never_increases(
            principal in 1u128..=1_000_000_000_000,
            epochs in 1u64..=100,
            a in 0u64..=300,
            b in 0u64..=300,
        ) {
            let e = engine();
            let p = e.position(principal, principal, principal * ONE_POINT_TWO / WAD, WAD, 10, epochs).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(e.weight_at(&p, hi) <= e.weight_at(&p, lo));
        }
    }
}
