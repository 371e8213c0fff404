//! Core logic for mining decapsulation events from project history.
//!
//! A decapsulation is an accessor (`getX`, `setX`, `isX`) added for a field
//! that already existed in an earlier transaction. This crate replays
//! transaction histories and keeps, per field, the accessors currently
//! decapsulating it.

pub mod analysis;
pub mod db;
pub mod history;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod service;
pub mod snapshot;

pub use analysis::accessor::{field_id_for_accessor, field_name_for_accessor};
pub use analysis::decapsulation::{Decapsulation, DecapsulationSet, TrackedNode};
pub use analysis::tracker::{
    analyze, decapsulated, DecapsulationMap, DecapsulationTracker, TrackerError, TrackerResult,
};
pub use history::{read_history_file, write_history_file, HistoryFileError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::edit::ProjectEdit;
pub use model::entity::{EntityKind, SourceEntity, ENTITY_SEPARATOR};
pub use model::transaction::{Transaction, UNKNOWN_AUTHOR};
pub use report::{ConsoleReporter, JsonReporter, ReportError, Reporter};
pub use repo::history_repo::{
    HistoryRepoError, HistoryRepoResult, HistoryRepository, SqliteHistoryRepository,
};
pub use service::analysis_service::{
    analyze_history, try_analyze_history, AnalysisError, AnalysisOptions, AnalysisReport,
    AnalysisResult, AnalysisService,
};
pub use snapshot::{ProjectSnapshot, SnapshotError, SnapshotNode};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
