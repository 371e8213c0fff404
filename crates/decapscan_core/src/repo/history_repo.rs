//! Persisted transaction history contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append transactions in commit order and load them back unchanged.
//! - Keep SQL and payload encoding inside the repository boundary.
//!
//! # Invariants
//! - `load_history` returns transactions in append order, edits in recorded
//!   order.
//! - Transaction ids are unique within one store.
//! - Batch appends (with or without replacing) commit in one SQL transaction.
//! - Read paths reject undecodable payloads instead of skipping them.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::edit::ProjectEdit;
use crate::model::transaction::Transaction;
use rusqlite::{params, Connection, Transaction as SqlTransaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HistoryRepoResult<T> = Result<T, HistoryRepoError>;

/// Errors from history repository operations.
#[derive(Debug)]
pub enum HistoryRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// A transaction with the same id was already appended.
    DuplicateTransaction(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted back into the history model.
    InvalidData(String),
}

impl Display for HistoryRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateTransaction(id) => write!(f, "transaction already stored: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "history repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "history repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid history data: {message}"),
        }
    }
}

impl Error for HistoryRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for HistoryRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for HistoryRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for persisted project history.
pub trait HistoryRepository {
    /// Appends one transaction after every stored one.
    fn append_transaction(&self, transaction: &Transaction) -> HistoryRepoResult<()>;
    /// Appends `transactions` all-or-nothing, first dropping the stored
    /// history when `replace` is set. Returns the stored count afterwards.
    ///
    /// On error the store is left exactly as it was before the call.
    fn append_history(&self, transactions: &[Transaction], replace: bool) -> HistoryRepoResult<u64>;
    /// Loads the whole history in commit order.
    fn load_history(&self) -> HistoryRepoResult<Vec<Transaction>>;
    /// Counts stored transactions.
    fn transaction_count(&self) -> HistoryRepoResult<u64>;
    /// Deletes every stored transaction.
    fn clear(&self) -> HistoryRepoResult<()>;
}

/// SQLite-backed history repository.
pub struct SqliteHistoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHistoryRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> HistoryRepoResult<Self> {
        ensure_history_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl HistoryRepository for SqliteHistoryRepository<'_> {
    fn append_transaction(&self, transaction: &Transaction) -> HistoryRepoResult<()> {
        let tx = SqlTransaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_transaction(&tx, transaction)?;
        tx.commit()?;
        Ok(())
    }

    fn append_history(&self, transactions: &[Transaction], replace: bool) -> HistoryRepoResult<u64> {
        let tx = SqlTransaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if replace {
            delete_all(&tx)?;
        }
        for transaction in transactions {
            insert_transaction(&tx, transaction)?;
        }
        let total = count_transactions(&tx)?;
        tx.commit()?;
        Ok(total)
    }

    fn load_history(&self) -> HistoryRepoResult<Vec<Transaction>> {
        let mut history = Vec::new();
        let mut index_by_seq = HashMap::new();

        let mut stmt = self
            .conn
            .prepare("SELECT seq, tx_id, date_ms, author FROM transactions ORDER BY seq ASC;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let seq: i64 = row.get("seq")?;
            index_by_seq.insert(seq, history.len());
            history.push(Transaction {
                id: row.get("tx_id")?,
                date: row.get("date_ms")?,
                author: row.get("author")?,
                edits: Vec::new(),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT tx_seq, ordinal, kind, payload FROM edits ORDER BY tx_seq ASC, ordinal ASC;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let seq: i64 = row.get("tx_seq")?;
            let index = *index_by_seq.get(&seq).ok_or_else(|| {
                HistoryRepoError::InvalidData(format!("edit references unknown transaction #{seq}"))
            })?;
            let kind: String = row.get("kind")?;
            let payload: String = row.get("payload")?;
            let edit = parse_edit(&history[index].id, &kind, &payload)?;
            history[index].edits.push(edit);
        }

        Ok(history)
    }

    fn transaction_count(&self) -> HistoryRepoResult<u64> {
        count_transactions(self.conn)
    }

    fn clear(&self) -> HistoryRepoResult<()> {
        let tx = SqlTransaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        delete_all(&tx)?;
        tx.commit()?;
        Ok(())
    }
}

// Callers own the surrounding SQL transaction; nothing here commits.
fn insert_transaction(conn: &Connection, transaction: &Transaction) -> HistoryRepoResult<()> {
    if transaction_exists(conn, &transaction.id)? {
        return Err(HistoryRepoError::DuplicateTransaction(transaction.id.clone()));
    }

    conn.execute(
        "INSERT INTO transactions (tx_id, date_ms, author) VALUES (?1, ?2, ?3);",
        params![
            transaction.id.as_str(),
            transaction.date,
            transaction.author.as_str()
        ],
    )?;
    let seq = conn.last_insert_rowid();

    let mut stmt = conn.prepare(
        "INSERT INTO edits (tx_seq, ordinal, kind, payload)
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    for (ordinal, edit) in transaction.edits.iter().enumerate() {
        let payload = serde_json::to_string(edit).map_err(|err| {
            HistoryRepoError::InvalidData(format!(
                "cannot encode edit #{ordinal} of transaction `{}`: {err}",
                transaction.id
            ))
        })?;
        stmt.execute(params![seq, ordinal as i64, edit.kind_str(), payload])?;
    }
    Ok(())
}

fn delete_all(conn: &Connection) -> HistoryRepoResult<()> {
    conn.execute("DELETE FROM edits;", [])?;
    conn.execute("DELETE FROM transactions;", [])?;
    Ok(())
}

fn count_transactions(conn: &Connection) -> HistoryRepoResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions;", [], |row| row.get(0))?;
    Ok(count as u64)
}

fn parse_edit(transaction_id: &str, kind: &str, payload: &str) -> HistoryRepoResult<ProjectEdit> {
    let edit: ProjectEdit = serde_json::from_str(payload).map_err(|err| {
        HistoryRepoError::InvalidData(format!(
            "undecodable edit in transaction `{transaction_id}`: {err}"
        ))
    })?;
    if edit.kind_str() != kind {
        return Err(HistoryRepoError::InvalidData(format!(
            "edit kind `{kind}` does not match payload `{}` in transaction `{transaction_id}`",
            edit.kind_str()
        )));
    }
    Ok(edit)
}

fn transaction_exists(conn: &Connection, transaction_id: &str) -> HistoryRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions WHERE tx_id = ?1);",
        [transaction_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn ensure_history_connection_ready(conn: &Connection) -> HistoryRepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(HistoryRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["transactions", "edits"] {
        if !table_exists(conn, table)? {
            return Err(HistoryRepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> HistoryRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
