//! Decapsulation analysis use-case service.
//!
//! # Responsibility
//! - Import histories into a repository and replay stored histories.
//! - Emit `analysis_run` events with duration and outcome.
//!
//! # Invariants
//! - Transactions are replayed strictly in the order the source yields them.
//! - A run stopped early (`until`) reports the state as of that transaction.

use crate::analysis::decapsulation::DecapsulationSet;
use crate::analysis::tracker::{decapsulated, DecapsulationMap, DecapsulationTracker, TrackerError};
use crate::model::transaction::Transaction;
use crate::repo::history_repo::{HistoryRepoError, HistoryRepository};
use log::{error, info};
use std::convert::Infallible;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors from analysis use-cases.
#[derive(Debug)]
pub enum AnalysisError {
    /// Persistence-layer failure.
    Repo(HistoryRepoError),
    /// The replayed history is inconsistent.
    InvalidHistory(TrackerError),
    /// `until` names a transaction the history does not contain.
    UnknownTransaction(String),
    /// The transaction source failed before yielding the next transaction.
    Source(Box<dyn Error + Send + Sync>),
}

impl Display for AnalysisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::InvalidHistory(err) => write!(f, "{err}"),
            Self::UnknownTransaction(id) => write!(f, "transaction not found in history: {id}"),
            Self::Source(err) => write!(f, "history source failed: {err}"),
        }
    }
}

impl Error for AnalysisError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::InvalidHistory(err) => Some(err),
            Self::UnknownTransaction(_) => None,
            Self::Source(err) => Some(err.as_ref()),
        }
    }
}

impl From<HistoryRepoError> for AnalysisError {
    fn from(value: HistoryRepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<TrackerError> for AnalysisError {
    fn from(value: TrackerError) -> Self {
        Self::InvalidHistory(value)
    }
}

/// Options controlling one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Stop after this transaction has been processed.
    pub until: Option<String>,
}

/// Outcome of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub transactions_processed: usize,
    /// Id of the last processed transaction, `None` for an empty history.
    pub last_transaction_id: Option<String>,
    /// Every tracked field, decapsulated or not.
    pub records: DecapsulationMap,
}

impl AnalysisReport {
    /// Decapsulated fields sorted by field id.
    pub fn decapsulated(&self) -> Vec<&DecapsulationSet> {
        decapsulated(&self.records)
    }
}

/// Replays `transactions` and collects the resulting records.
///
/// # Errors
/// - `InvalidHistory` when the history contradicts itself.
/// - `UnknownTransaction` when `options.until` is never reached.
pub fn analyze_history<I>(transactions: I, options: &AnalysisOptions) -> AnalysisResult<AnalysisReport>
where
    I: IntoIterator<Item = Transaction>,
{
    try_analyze_history(
        transactions.into_iter().map(Ok::<_, Infallible>),
        options,
    )
}

/// Replays a fallible transaction source, e.g. a lazily decoded stream.
///
/// Transactions are processed as they arrive; the first source error ends
/// the run.
///
/// # Errors
/// - `Source` when the source yields an error.
/// - Everything `analyze_history` reports.
pub fn try_analyze_history<I, E>(source: I, options: &AnalysisOptions) -> AnalysisResult<AnalysisReport>
where
    I: IntoIterator<Item = Result<Transaction, E>>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    let started_at = Instant::now();
    info!("event=analysis_run module=service status=start");

    match replay(source, options) {
        Ok(report) => {
            info!(
                "event=analysis_run module=service status=ok duration_ms={} transactions={} fields={} decapsulated={}",
                started_at.elapsed().as_millis(),
                report.transactions_processed,
                report.records.len(),
                report.decapsulated().len()
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                "event=analysis_run module=service status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn replay<I, E>(source: I, options: &AnalysisOptions) -> AnalysisResult<AnalysisReport>
where
    I: IntoIterator<Item = Result<Transaction, E>>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    let mut tracker = DecapsulationTracker::new();
    let mut last_transaction_id = None;
    let mut reached_until = false;

    for item in source {
        let transaction = item.map_err(|err| AnalysisError::Source(err.into()))?;
        tracker.process(&transaction)?;
        reached_until = options.until.as_deref() == Some(transaction.id.as_str());
        last_transaction_id = Some(transaction.id);
        if reached_until {
            break;
        }
    }

    if let Some(until) = &options.until {
        if !reached_until {
            return Err(AnalysisError::UnknownTransaction(until.clone()));
        }
    }

    Ok(AnalysisReport {
        transactions_processed: tracker.processed(),
        last_transaction_id,
        records: tracker.into_records(),
    })
}

/// Use-case service over a persisted history.
pub struct AnalysisService<R: HistoryRepository> {
    repo: R,
}

impl<R: HistoryRepository> AnalysisService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Appends `transactions` to the stored history, all or nothing.
    ///
    /// Returns the number of transactions stored afterwards.
    pub fn import(&self, transactions: &[Transaction]) -> AnalysisResult<u64> {
        self.store(transactions, false)
    }

    /// Replaces the stored history with `transactions`, all or nothing.
    ///
    /// The previous history survives unchanged when the import fails.
    pub fn replace_history(&self, transactions: &[Transaction]) -> AnalysisResult<u64> {
        self.store(transactions, true)
    }

    fn store(&self, transactions: &[Transaction], replace: bool) -> AnalysisResult<u64> {
        match self.repo.append_history(transactions, replace) {
            Ok(total) => {
                info!(
                    "event=history_import module=service status=ok replace={} imported={} total={}",
                    replace,
                    transactions.len(),
                    total
                );
                Ok(total)
            }
            Err(err) => {
                error!(
                    "event=history_import module=service status=error replace={} error={}",
                    replace, err
                );
                Err(err.into())
            }
        }
    }

    /// Loads the stored history in commit order.
    pub fn history(&self) -> AnalysisResult<Vec<Transaction>> {
        Ok(self.repo.load_history()?)
    }

    /// Replays the stored history.
    pub fn run(&self, options: &AnalysisOptions) -> AnalysisResult<AnalysisReport> {
        let history = self.repo.load_history()?;
        analyze_history(history, options)
    }
}

#[cfg(test)]
mod tests {
    use super::{analyze_history, try_analyze_history, AnalysisError, AnalysisOptions};
    use crate::model::entity::{EntityKind, SourceEntity};
    use crate::model::transaction::Transaction;

    fn history() -> Vec<Transaction> {
        vec![
            Transaction::new("a").add_unit("A.java", |unit| unit.child(EntityKind::Variable, "x")),
            Transaction::new("b").add_node(SourceEntity::new(EntityKind::Function, "A.java:getX()")),
            Transaction::new("c").remove_node("A.java:getX()"),
        ]
    }

    #[test]
    fn until_stops_after_named_transaction() {
        let options = AnalysisOptions {
            until: Some("b".to_string()),
        };
        let report = analyze_history(history(), &options).unwrap();

        assert_eq!(report.transactions_processed, 2);
        assert_eq!(report.last_transaction_id.as_deref(), Some("b"));
        assert_eq!(report.decapsulated().len(), 1);
    }

    #[test]
    fn full_run_reflects_final_state() {
        let report = analyze_history(history(), &AnalysisOptions::default()).unwrap();

        assert_eq!(report.transactions_processed, 3);
        assert!(report.decapsulated().is_empty());
        assert!(report.records.contains_key("A.java:x"));
    }

    #[test]
    fn unknown_until_is_rejected() {
        let options = AnalysisOptions {
            until: Some("z".to_string()),
        };
        let err = analyze_history(history(), &options).unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownTransaction(id) if id == "z"));
    }

    #[test]
    fn fallible_source_is_replayed_until_its_first_error() {
        let mut source: Vec<Result<Transaction, std::io::Error>> =
            history().into_iter().take(2).map(Ok).collect();
        source.push(Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "truncated history",
        )));
        source.push(Ok(Transaction::new("never")));

        let err = try_analyze_history(source, &AnalysisOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Source(_)));
        assert!(err.to_string().contains("truncated history"));
    }

    #[test]
    fn fallible_source_stops_at_until_before_a_later_error() {
        let source = history()
            .into_iter()
            .take(1)
            .map(Ok)
            .chain(std::iter::once(Err("unreadable transaction")));
        let options = AnalysisOptions {
            until: Some("a".to_string()),
        };

        let report = try_analyze_history(source, &options).unwrap();
        assert_eq!(report.transactions_processed, 1);
        assert!(report.records.contains_key("A.java:x"));
    }
}
