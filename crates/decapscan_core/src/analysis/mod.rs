//! Decapsulation analysis over replayed history.
//!
//! # Responsibility
//! - Match accessor names to candidate fields.
//! - Fold transactions into per-field decapsulation sets.
//!
//! # Invariants
//! - The analysis performs no I/O; it only reads its transaction input.
//! - Only fields with at least one accessor are reported.

pub mod accessor;
pub mod decapsulation;
pub mod tracker;
