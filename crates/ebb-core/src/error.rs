//! Error types for the Ebb protocol.
use thiserror::Error;

use crate::types::Capability;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("division by zero")] DivisionByZero,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u128, need: u128 },
    #[error("caller may not mint or burn {0}")] Unauthorized(String),
    #[error("supply overflow")] SupplyOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockingError {
    #[error("invalid bucket: {0}")] InvalidBucket(u64),
    #[error("invalid unwinding epochs: {0}")] InvalidUnwindingEpochs(u64),
    #[error("invalid multiplier: {0}")] InvalidMultiplier(u128),
    #[error("invalid loss percentage: {0}")] InvalidPercentage(u128),
    #[error("bucket must be longer: {old} -> {new}")] BucketMustBeLongerDuration { old: u64, new: u64 },
    #[error("user not unwinding")] UserNotUnwinding,
    #[error("user unwinding not started")] UserUnwindingNotStarted,
    #[error("user unwinding in progress")] UserUnwindingInProgress,
    #[error("transfer failed: {0}")] TransferFailed(#[from] TokenError),
    #[error("missing capability: {0}")] Unauthorized(Capability),
    #[error("controller paused")] Paused,
    #[error("zero amount")] ZeroAmount,
    #[error(transparent)] Math(#[from] MathError),
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("encode: {0}")] Encode(String),
    #[error("decode: {0}")] Decode(String),
    #[error("io: {0}")] Io(#[from] std::io::Error),
}
