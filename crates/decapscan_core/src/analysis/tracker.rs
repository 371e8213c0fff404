//! Incremental decapsulation tracker.
//!
//! # Responsibility
//! - Replay transactions in commit order against an owned project snapshot.
//! - Maintain one `DecapsulationSet` per live field.
//!
//! # Invariants
//! - Every edit of a transaction is judged against the project as it was
//!   before that transaction: a field and its accessor added together are
//!   never a decapsulation.
//! - Removing an accessor withdraws it; removing a field forgets its set.
//! - The first rejected edit aborts the run with `InvalidHistory`.

use crate::analysis::accessor::field_id_for_accessor;
use crate::analysis::decapsulation::{DecapsulationSet, TrackedNode};
use crate::model::edit::ProjectEdit;
use crate::model::entity::{EntityKind, SourceEntity};
use crate::model::transaction::Transaction;
use crate::snapshot::{ProjectSnapshot, SnapshotError};
use log::{debug, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Field id → decapsulation set.
pub type DecapsulationMap = HashMap<String, DecapsulationSet>;

/// Errors raised while replaying history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The history contradicts itself (e.g. removes a node that never existed).
    InvalidHistory {
        transaction_id: String,
        source: SnapshotError,
    },
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHistory {
                transaction_id,
                source,
            } => write!(f, "invalid history in transaction `{transaction_id}`: {source}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidHistory { source, .. } => Some(source),
        }
    }
}

/// Replays the whole history and returns the final per-field records.
pub fn analyze<I>(transactions: I) -> TrackerResult<DecapsulationMap>
where
    I: IntoIterator<Item = Transaction>,
{
    let mut tracker = DecapsulationTracker::new();
    for transaction in transactions {
        tracker.process(&transaction)?;
    }
    Ok(tracker.into_records())
}

/// Stateful fold over a transaction stream.
#[derive(Debug, Default)]
pub struct DecapsulationTracker {
    snapshot: ProjectSnapshot,
    records: DecapsulationMap,
    processed: usize,
}

impl DecapsulationTracker {
    /// Creates a tracker over an empty project.
    pub fn new() -> Self {
        Self::default()
    }

    /// Project state after the last processed transaction.
    pub fn snapshot(&self) -> &ProjectSnapshot {
        &self.snapshot
    }

    /// Records accumulated so far, including fields with no accessors.
    pub fn records(&self) -> &DecapsulationMap {
        &self.records
    }

    /// Consumes the tracker and returns the sets of every tracked field.
    pub fn into_records(self) -> DecapsulationMap {
        self.records
    }

    /// Number of transactions fully processed.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Decapsulated fields sorted by field id.
    pub fn decapsulated(&self) -> Vec<&DecapsulationSet> {
        decapsulated(&self.records)
    }

    /// Visits every edit of `transaction` in order and advances the snapshot.
    ///
    /// # Errors
    /// - Returns `InvalidHistory` when an edit contradicts the project state.
    ///   The tracker must not be reused after an error.
    pub fn process(&mut self, transaction: &Transaction) -> TrackerResult<()> {
        let mut presence = PresenceJournal::default();
        for edit in &transaction.edits {
            if let Err(source) = self.visit(edit, &transaction.id, &mut presence) {
                warn!(
                    "event=transaction_rejected module=analysis status=error tx_id={} edit={} target={} error={}",
                    transaction.id,
                    edit.kind_str(),
                    edit.target_id(),
                    source
                );
                return Err(TrackerError::InvalidHistory {
                    transaction_id: transaction.id.clone(),
                    source,
                });
            }
        }

        self.processed += 1;
        debug!(
            "event=transaction_processed module=analysis status=ok tx_id={} edits={} nodes={} fields={}",
            transaction.id,
            transaction.edits.len(),
            self.snapshot.len(),
            self.records.len()
        );
        Ok(())
    }

    fn visit(
        &mut self,
        edit: &ProjectEdit,
        transaction_id: &str,
        presence: &mut PresenceJournal,
    ) -> Result<(), SnapshotError> {
        match edit {
            ProjectEdit::AddNode { node } => {
                let added = node.walk();
                for entity in &added {
                    presence.touch(&entity.id, &self.snapshot);
                }
                self.snapshot.apply_edit(edit)?;
                for entity in added {
                    self.visit_added(entity, transaction_id, presence);
                }
            }
            ProjectEdit::RemoveNode { id } => {
                let subtree = self
                    .snapshot
                    .subtree(id)
                    .ok_or_else(|| SnapshotError::NodeNotFound(id.clone()))?;
                let removed = subtree.walk();
                for entity in &removed {
                    presence.touch(&entity.id, &self.snapshot);
                }
                self.snapshot.apply_edit(edit)?;
                for entity in removed {
                    self.visit_removed(entity, presence);
                }
            }
            ProjectEdit::EditNode { .. } => self.snapshot.apply_edit(edit)?,
        }
        Ok(())
    }

    fn visit_added(
        &mut self,
        entity: &SourceEntity,
        transaction_id: &str,
        presence: &PresenceJournal,
    ) {
        match entity.kind {
            EntityKind::Variable => {
                self.records.insert(
                    entity.id.clone(),
                    DecapsulationSet::new(TrackedNode::new(entity.id.as_str(), transaction_id)),
                );
            }
            EntityKind::Function => {
                if let Some(set) = self.existing_field_set(&entity.id, presence) {
                    set.add_accessor(TrackedNode::new(entity.id.as_str(), transaction_id));
                }
            }
            EntityKind::Unit | EntityKind::Type => {}
        }
    }

    fn visit_removed(&mut self, entity: &SourceEntity, presence: &PresenceJournal) {
        match entity.kind {
            EntityKind::Variable => {
                self.records.remove(&entity.id);
            }
            EntityKind::Function => {
                if let Some(set) = self.existing_field_set(&entity.id, presence) {
                    set.remove_accessor(&entity.id);
                }
            }
            EntityKind::Unit | EntityKind::Type => {}
        }
    }

    /// Set of the field exposed by `accessor_id`, if that field predates the
    /// current transaction and is still tracked.
    fn existing_field_set(
        &mut self,
        accessor_id: &str,
        presence: &PresenceJournal,
    ) -> Option<&mut DecapsulationSet> {
        let field_id = field_id_for_accessor(accessor_id)?;
        if !presence.existed_before(&field_id, &self.snapshot) {
            return None;
        }
        self.records.get_mut(&field_id)
    }
}

/// Returns the decapsulated sets of `records`, sorted by field id.
pub fn decapsulated(records: &DecapsulationMap) -> Vec<&DecapsulationSet> {
    let mut sets: Vec<&DecapsulationSet> = records
        .values()
        .filter(|set| set.is_decapsulated())
        .collect();
    sets.sort_by(|left, right| left.field().id.cmp(&right.field().id));
    sets
}

/// Remembers, for ids touched by the current transaction, whether they were
/// present before it started.
///
/// Ids never touched by the transaction have the same presence in the working
/// snapshot as before the transaction.
#[derive(Debug, Default)]
struct PresenceJournal {
    before: HashMap<String, bool>,
}

impl PresenceJournal {
    fn touch(&mut self, id: &str, snapshot: &ProjectSnapshot) {
        if !self.before.contains_key(id) {
            self.before.insert(id.to_string(), snapshot.contains(id));
        }
    }

    fn existed_before(&self, id: &str, snapshot: &ProjectSnapshot) -> bool {
        self.before
            .get(id)
            .copied()
            .unwrap_or_else(|| snapshot.contains(id))
    }
}
