//! Transaction model: the unit of history replay.
//!
//! # Invariants
//! - Edits are kept in the order they were recorded.
//! - `id` is opaque to the analysis; only equality matters.

use crate::model::edit::ProjectEdit;
use crate::model::entity::{child_id, EntityKind, SourceEntity};
use serde::{Deserialize, Serialize};

/// Author recorded when a history does not name one.
pub const UNKNOWN_AUTHOR: &str = "<unknown-author>";

/// Ordered batch of edits recorded as one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub date: i64,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub edits: Vec<ProjectEdit>,
}

fn default_author() -> String {
    UNKNOWN_AUTHOR.to_string()
}

impl Transaction {
    /// Creates an empty transaction dated at epoch zero by an unknown author.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: 0,
            author: default_author(),
            edits: Vec::new(),
        }
    }

    pub fn with_date(mut self, date: i64) -> Self {
        self.date = date;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Appends an arbitrary edit.
    pub fn edit(mut self, edit: ProjectEdit) -> Self {
        self.edits.push(edit);
        self
    }

    /// Appends an `AddNode` edit for `node`.
    pub fn add_node(self, node: SourceEntity) -> Self {
        self.edit(ProjectEdit::add(node))
    }

    /// Appends an `AddNode` edit for a unit populated by `build`.
    pub fn add_unit(
        self,
        id: impl Into<String>,
        build: impl FnOnce(SourceEntity) -> SourceEntity,
    ) -> Self {
        self.add_node(build(SourceEntity::unit(id)))
    }

    /// Appends an `AddNode` edit for an entity nested under `parent_id`.
    pub fn add_child(
        self,
        parent_id: &str,
        kind: EntityKind,
        local_name: &str,
        build: impl FnOnce(SourceEntity) -> SourceEntity,
    ) -> Self {
        self.add_node(build(SourceEntity::new(kind, child_id(parent_id, local_name))))
    }

    /// Appends a `RemoveNode` edit.
    pub fn remove_node(self, id: impl Into<String>) -> Self {
        self.edit(ProjectEdit::remove(id))
    }

    /// Appends an `EditNode` edit changing modifiers of `id`.
    pub fn edit_modifiers<A, R>(self, id: impl Into<String>, added: A, removed: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        self.edit(ProjectEdit::EditNode {
            id: id.into(),
            added_modifiers: added.into_iter().map(Into::into).collect(),
            removed_modifiers: removed.into_iter().map(Into::into).collect(),
        })
    }
}
