//! Atomic edits applicable to the source tree.

use crate::model::entity::SourceEntity;
use serde::{Deserialize, Serialize};

/// One structural change to the project.
///
/// Serialized with an explicit `edit` tag so persisted histories stay
/// self-describing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum ProjectEdit {
    /// Inserts `node` and all of its descendants.
    AddNode { node: SourceEntity },
    /// Deletes the entity at `id` and everything beneath it.
    RemoveNode { id: String },
    /// Changes the modifiers of the entity at `id` without touching its shape.
    EditNode {
        id: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        added_modifiers: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        removed_modifiers: Vec<String>,
    },
}

impl ProjectEdit {
    pub fn add(node: SourceEntity) -> Self {
        Self::AddNode { node }
    }

    pub fn remove(id: impl Into<String>) -> Self {
        Self::RemoveNode { id: id.into() }
    }

    /// Id of the entity this edit targets.
    pub fn target_id(&self) -> &str {
        match self {
            Self::AddNode { node } => node.id.as_str(),
            Self::RemoveNode { id } | Self::EditNode { id, .. } => id.as_str(),
        }
    }

    /// Stable lowercase label used by storage and log events.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "add_node",
            Self::RemoveNode { .. } => "remove_node",
            Self::EditNode { .. } => "edit_node",
        }
    }
}
