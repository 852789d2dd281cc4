//! Controller configuration.
//!
//! WAD quantities are written as decimal strings in config files
//! (`"1.2"`, `"0.999999"`) and held as scaled integers in memory.

use ebb_core::constants::{DEFAULT_MAX_LOSS_PERCENTAGE, WAD};
use serde::{Deserialize, Serialize};

/// One bucket bootstrapped at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Unwinding duration in epochs.
    pub duration: u64,
    /// WAD-scaled reward multiplier.
    #[serde(with = "wad_string")]
    pub multiplier: u128,
}

/// Configuration for a [`LockingController`](crate::LockingController).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockingConfig {
    /// Losses at or above this share of the total balance are catastrophic.
    #[serde(with = "wad_string")]
    pub max_loss_percentage: u128,
    /// Buckets enabled when the controller is built.
    pub buckets: Vec<BucketConfig>,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            max_loss_percentage: DEFAULT_MAX_LOSS_PERCENTAGE,
            buckets: Vec::new(),
        }
    }
}

impl LockingConfig {
    /// Thirteen weekly buckets, 1 to 13 epochs, boosted 1.0x to 1.3x.
    pub fn standard() -> Self {
        let buckets = (1..=13u64)
            .map(|duration| BucketConfig {
                duration,
                multiplier: WAD + u128::from(duration - 1) * WAD / 40,
            })
            .collect();
        Self {
            buckets,
            ..Self::default()
        }
    }

    /// Share token symbol for the bucket of `duration` epochs.
    pub fn share_symbol(duration: u64) -> String {
        format!("lock-{duration}")
    }
}

mod wad_string {
    use ebb_core::wad::{format_wad, parse_wad};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_wad(*v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(d)?;
        parse_wad(&raw).ok_or_else(|| de::Error::custom(format!("invalid decimal: {raw}")))
    }
}
