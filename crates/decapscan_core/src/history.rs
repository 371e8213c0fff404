//! JSON history documents.
//!
//! # Responsibility
//! - Read and write histories exchanged as `{"transactions": [...]}` files.
//!
//! # Invariants
//! - Transaction order in the document is commit order.
//! - Transaction ids are unique within one document.

use crate::model::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub type HistoryFileResult<T> = Result<T, HistoryFileError>;

/// Errors from reading or writing history documents.
#[derive(Debug)]
pub enum HistoryFileError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    DuplicateTransaction(String),
}

impl Display for HistoryFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot access history file `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "malformed history document: {err}"),
            Self::DuplicateTransaction(id) => {
                write!(f, "history document repeats transaction `{id}`")
            }
        }
    }
}

impl Error for HistoryFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::DuplicateTransaction(_) => None,
        }
    }
}

impl From<serde_json::Error> for HistoryFileError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryDocument {
    transactions: Vec<Transaction>,
}

/// Parses a history document.
pub fn parse_history(json: &str) -> HistoryFileResult<Vec<Transaction>> {
    let document: HistoryDocument = serde_json::from_str(json)?;
    let mut seen = HashSet::new();
    for transaction in &document.transactions {
        if !seen.insert(transaction.id.as_str()) {
            return Err(HistoryFileError::DuplicateTransaction(
                transaction.id.clone(),
            ));
        }
    }
    Ok(document.transactions)
}

/// Reads and parses the history document at `path`.
pub fn read_history_file(path: impl AsRef<Path>) -> HistoryFileResult<Vec<Transaction>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| HistoryFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_history(&json)
}

/// Serializes `transactions` as a pretty-printed history document.
pub fn history_to_json(transactions: &[Transaction]) -> HistoryFileResult<String> {
    let document = HistoryDocument {
        transactions: transactions.to_vec(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Writes `transactions` to `path` as a history document.
pub fn write_history_file(
    path: impl AsRef<Path>,
    transactions: &[Transaction],
) -> HistoryFileResult<()> {
    let path = path.as_ref();
    let json = history_to_json(transactions)?;
    fs::write(path, json).map_err(|source| HistoryFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}
