//! Integration test suite for the Ebb locking protocol.
//!
//! Exercises the controller and unwinding ledger together through the same
//! capability-checked entry points a deployment would use, and checks the
//! accounting invariants after every call.

pub mod helpers;
