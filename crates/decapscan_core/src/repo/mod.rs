//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define history access contracts used by the analysis service.
//! - Isolate SQLite query details from analysis orchestration.

pub mod history_repo;
