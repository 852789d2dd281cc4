//! Trait interfaces for the Ebb protocol.
//!
//! These traits define the seams between crates:
//! - [`Authorizer`]: capability checks (ebb-core's `RoleTable` implements)
//! - [`DecayModel`]: unwinding weight schedule (ebb-decay's `LinearDecay`
//!   implements)
//! - [`SlopeSource`]: sparse per-epoch slope changes read by the decay
//!   rollforward (ebb-decay's `SlopeChanges` implements)

use crate::error::MathError;
use crate::types::{Address, Capability, UnwindingPosition};

/// Decides whether an address holds a capability.
///
/// Injected into the locking controller; every mutating entry point calls
/// [`has`](Self::has) before touching state.
pub trait Authorizer: Send + Sync {
    /// Whether `caller` holds `capability`.
    fn has(&self, capability: Capability, caller: &Address) -> bool;
}

impl<A: Authorizer + ?Sized> Authorizer for &A {
    fn has(&self, capability: Capability, caller: &Address) -> bool {
        (**self).has(capability, caller)
    }
}

/// Computes how an unwinding position's reward weight evolves.
///
/// Weights are nominal (divided by the ledger's slash index). Implementations
/// must be pure: the same inputs always give the same position and weights.
pub trait DecayModel: Send + Sync {
    /// Build the position for a request made during `request_epoch`.
    ///
    /// `principal` and `reward_weight` are real amounts; `slash_index` is the
    /// ledger's current WAD-scaled index.
    fn position(
        &self,
        shares: u128,
        principal: u128,
        reward_weight: u128,
        slash_index: u128,
        request_epoch: u64,
        unwinding_epochs: u64,
    ) -> Result<UnwindingPosition, MathError>;

    /// Nominal weight of `position` during `epoch`.
    fn weight_at(&self, position: &UnwindingPosition, epoch: u64) -> u128;

    /// Whether `position` is losing weight during `epoch`.
    fn is_decaying(&self, position: &UnwindingPosition, epoch: u64) -> bool {
        epoch >= position.from_epoch && epoch < position.to_epoch
    }
}

/// Read-only view of the per-epoch slope deltas of the unwinding ledger.
///
/// `decrease_at(e)` is the total per-epoch decrement of positions whose decay
/// starts at `e`; `increase_at(e)` the decrement of positions whose decay
/// ends at `e`. Missing epochs read as zero.
pub trait SlopeSource {
    fn increase_at(&self, epoch: u64) -> u128;
    fn decrease_at(&self, epoch: u64) -> u128;

    /// First epoch after `epoch` that may carry a change.
    ///
    /// Default implementation: the very next epoch, i.e. no skipping.
    fn next_change_after(&self, epoch: u64) -> Option<u64> {
        epoch.checked_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyGovernor(Address);

    impl Authorizer for OnlyGovernor {
        fn has(&self, capability: Capability, caller: &Address) -> bool {
            capability == Capability::Governor && *caller == self.0
        }
    }

    #[test]
    fn authorizer_is_object_safe() {
        let gov = Address::from_seed(1);
        let auth = OnlyGovernor(gov);
        let dyn_auth: &dyn Authorizer = &auth;
        assert!(dyn_auth.has(Capability::Governor, &gov));
        assert!(!dyn_auth.has(Capability::EntryPoint, &gov));
    }

    struct Flat;

    impl DecayModel for Flat {
        fn position(
            &self,
            shares: u128,
            principal: u128,
            _reward_weight: u128,
            _slash_index: u128,
            request_epoch: u64,
            unwinding_epochs: u64,
        ) -> Result<UnwindingPosition, MathError> {
            Ok(UnwindingPosition {
                shares,
                from_epoch: request_epoch + 1,
                to_epoch: request_epoch + 1 + unwinding_epochs,
                from_reward_weight: principal,
                reward_weight_decrease: 0,
                skipped_deposits: 0,
            })
        }

        fn weight_at(&self, position: &UnwindingPosition, _epoch: u64) -> u128 {
            position.from_reward_weight
        }
    }

    #[test]
    fn default_decaying_window() {
        let p = Flat.position(1, 10, 10, 1, 4, 3).unwrap();
        assert!(!Flat.is_decaying(&p, 4));
        assert!(Flat.is_decaying(&p, 5));
        assert!(Flat.is_decaying(&p, 7));
        assert!(!Flat.is_decaying(&p, 8));
    }

    #[test]
    fn authorizer_by_reference() {
        let gov = Address::from_seed(1);
        let auth = OnlyGovernor(gov);
        fn check<A: Authorizer>(a: A, who: &Address) -> bool {
            a.has(Capability::Governor, who)
        }
        assert!(check(&auth, &gov));
        assert!(!check(&auth, &Address::from_seed(2)));
    }
}
