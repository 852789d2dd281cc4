//! # ebb-locking: Time-locked receipt positions with decaying unwinding.
//!
//! - **Buckets**: one per lock duration, each with its own share token and
//!   reward multiplier. Locked principal earns `principal * multiplier` of
//!   reward weight.
//! - **Unwinding ledger**: positions leaving a bucket decay linearly toward
//!   their principal over the bucket's duration, keep earning
//!   non-compounding rewards, and become withdrawable at the end.
//! - **Controller**: routes yield and losses between buckets and the ledger
//!   by reward weight and balance, and pauses itself when a loss wipes out a
//!   sub-pool.
//!
//! All mutating controller calls are transactional.

pub mod bucket;
pub mod config;
pub mod controller;
pub mod ledger;
pub mod metric;
pub mod snapshot;
pub mod token;

pub use bucket::Bucket;
pub use config::{BucketConfig, LockingConfig};
pub use controller::{ControllerState, ControllerStatus, LockingController, LossOutcome};
pub use ledger::{RelockTicket, UnwindingLedger};
pub use metric::Metric;
pub use token::{ShareToken, Token};
