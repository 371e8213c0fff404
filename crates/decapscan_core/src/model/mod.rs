//! Versioned source model replayed by the analysis.
//!
//! # Responsibility
//! - Define the entity tree, its edits and the transactions grouping them.
//! - Keep the model free of storage and analysis concerns.
//!
//! # Invariants
//! - Entities are addressed only by qualified string ids.
//! - Entity and edit kinds are closed enums matched exhaustively.

pub mod edit;
pub mod entity;
pub mod transaction;
