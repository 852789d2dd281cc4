//! Lock buckets: one per enabled duration.

use ebb_core::constants::WAD;
use ebb_core::error::MathError;
use ebb_core::wad::{mul_div_down, mul_wad_down};

use crate::token::ShareToken;

/// All positions locked for one duration.
///
/// # Invariants
///
/// * `share_token.total_supply()` shares claim `total_principal` pro-rata.
/// * `reward_weight() == mul_wad_down(total_principal, multiplier)`.
#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Bucket {
    pub share_token: ShareToken,
    pub total_principal: u128,
    /// WAD-scaled boost in `[1.0, 2.0]`.
    pub multiplier: u128,
}

impl Bucket {
    pub fn new(share_token: ShareToken, multiplier: u128) -> Self {
        Self {
            share_token,
            total_principal: 0,
            multiplier,
        }
    }

    /// This bucket's contribution to the controller's global reward weight.
    pub fn reward_weight(&self) -> Result<u128, MathError> {
        mul_wad_down(self.total_principal, self.multiplier)
    }

    /// Shares minted for a deposit of `amount` principal (rounded down).
    pub fn shares_for_deposit(&self, amount: u128) -> Result<u128, MathError> {
        let supply = self.share_token.total_supply();
        if supply == 0 {
            return Ok(amount);
        }
        mul_div_down(amount, supply, self.total_principal)
    }

    /// Principal redeemable for `shares` (rounded down).
    pub fn principal_for_shares(&self, shares: u128) -> Result<u128, MathError> {
        if shares == 0 {
            return Ok(0);
        }
        mul_div_down(shares, self.total_principal, self.share_token.total_supply())
    }

    /// Principal per share, WAD-scaled. 1.0 for an empty bucket.
    pub fn exchange_rate(&self) -> Result<u128, MathError> {
        let supply = self.share_token.total_supply();
        if supply == 0 {
            return Ok(WAD);
        }
        mul_div_down(self.total_principal, WAD, supply)
    }

    /// Whether outstanding shares are left with nothing to claim.
    pub fn is_wiped(&self) -> bool {
        self.total_principal == 0 && self.share_token.total_supply() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebb_core::auth::RoleTable;
    use ebb_core::types::Address;

    fn bucket_with(principal: u128, supply: u128, multiplier: u128) -> Bucket {
        let roles = RoleTable::standard(Address::ZERO, Address::ZERO, Address::ZERO);
        let mut token = ShareToken::new("lock-test");
        token
            .mint(&roles, &Address::LOCKING_CONTROLLER, &Address::from_seed(1), supply)
            .unwrap();
        Bucket {
            share_token: token,
            total_principal: principal,
            multiplier,
        }
    }

    #[test]
    fn empty_bucket_mints_one_to_one() {
        let b = Bucket::new(ShareToken::new("lock-1"), WAD);
        assert_eq!(b.shares_for_deposit(500).unwrap(), 500);
        assert_eq!(b.exchange_rate().unwrap(), WAD);
        assert_eq!(b.principal_for_shares(0).unwrap(), 0);
    }

    #[test]
    fn grown_bucket_mints_fewer_shares() {
        // 1000 shares backed by 1100 principal after rewards.
        let b = bucket_with(1100, 1000, WAD);
        assert_eq!(b.shares_for_deposit(110).unwrap(), 100);
        assert_eq!(b.principal_for_shares(100).unwrap(), 110);
        assert_eq!(b.exchange_rate().unwrap(), WAD + WAD / 10);
    }

    #[test]
    fn reward_weight_applies_multiplier() {
        let b = bucket_with(1000, 1000, WAD + WAD / 5);
        assert_eq!(b.reward_weight().unwrap(), 1200);
    }

    #[test]
    fn wiped_bucket_detected() {
        assert!(bucket_with(0, 10, WAD).is_wiped());
        assert!(!bucket_with(0, 0, WAD).is_wiped());
        assert!(bucket_with(0, 10, WAD).shares_for_deposit(5).is_err());
    }
}
