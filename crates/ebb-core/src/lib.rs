//! # ebb-core
//! Foundation types, fixed-point math and traits for the Ebb locking protocol.

pub mod auth;
pub mod constants;
pub mod epoch;
pub mod error;
pub mod traits;
pub mod types;
pub mod wad;
