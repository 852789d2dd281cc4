//! What a per-user aggregation over buckets sums up.

use ebb_core::error::MathError;
use ebb_core::wad::mul_wad_down;

use crate::bucket::Bucket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Redeemable principal.
    Principal,
    /// Principal times the bucket multiplier.
    RewardWeight,
}

impl Metric {
    /// Value of `shares` of `bucket` under this metric.
    pub fn of(self, bucket: &Bucket, shares: u128) -> Result<u128, MathError> {
        let principal = bucket.principal_for_shares(shares)?;
        match self {
            Metric::Principal => Ok(principal),
            Metric::RewardWeight => mul_wad_down(principal, bucket.multiplier),
        }
    }
}
