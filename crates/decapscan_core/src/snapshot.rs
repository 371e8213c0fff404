//! Materialized project state at one point of history.
//!
//! # Responsibility
//! - Hold the current entity tree in a flat id index.
//! - Apply edits and reject the ones a consistent history never produces.
//!
//! # Invariants
//! - Every stored non-unit node has its parent stored as well.
//! - A rejected `AddNode` leaves the snapshot unchanged.
//! - Removing a node removes its whole subtree.

use crate::model::edit::ProjectEdit;
use crate::model::entity::{parent_id, EntityKind, SourceEntity};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Edits that contradict the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// `AddNode` targets (or contains) an id that is already present.
    DuplicateNode(String),
    /// `RemoveNode`/`EditNode` targets an id that is absent.
    NodeNotFound(String),
    /// `AddNode` targets a nested id whose parent is absent.
    ParentNotFound(String),
    /// An added subtree nests a child whose id is not derived from its parent.
    InvalidChildId { parent: String, child: String },
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateNode(id) => write!(f, "node already exists: {id}"),
            Self::NodeNotFound(id) => write!(f, "node not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent of node not found: {id}"),
            Self::InvalidChildId { parent, child } => {
                write!(f, "node `{child}` cannot be nested under `{parent}`")
            }
        }
    }
}

impl Error for SnapshotError {}

/// Flat view of one stored entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotNode {
    pub id: String,
    pub kind: EntityKind,
    pub modifiers: BTreeSet<String>,
    /// Child ids in insertion order.
    pub children: Vec<String>,
}

/// Mutable project snapshot, initially empty.
#[derive(Debug, Clone, Default)]
pub struct ProjectSnapshot {
    nodes: HashMap<String, SnapshotNode>,
    units: Vec<String>,
}

impl ProjectSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&SnapshotNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of stored entities, descendants included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level entity ids in insertion order.
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(String::as_str)
    }

    /// Rebuilds the entity at `id` together with all of its descendants.
    pub fn subtree(&self, id: &str) -> Option<SourceEntity> {
        let node = self.nodes.get(id)?;
        let children = node
            .children
            .iter()
            .filter_map(|child| self.subtree(child))
            .collect();
        Some(SourceEntity {
            id: node.id.clone(),
            kind: node.kind,
            modifiers: node.modifiers.clone(),
            children,
        })
    }

    /// Applies `edits` in order, stopping at the first rejected edit.
    pub fn apply(&mut self, edits: &[ProjectEdit]) -> SnapshotResult<()> {
        for edit in edits {
            self.apply_edit(edit)?;
        }
        Ok(())
    }

    /// Applies one edit.
    pub fn apply_edit(&mut self, edit: &ProjectEdit) -> SnapshotResult<()> {
        match edit {
            ProjectEdit::AddNode { node } => self.add_node(node),
            ProjectEdit::RemoveNode { id } => self.remove_node(id),
            ProjectEdit::EditNode {
                id,
                added_modifiers,
                removed_modifiers,
            } => {
                let node = self
                    .nodes
                    .get_mut(id)
                    .ok_or_else(|| SnapshotError::NodeNotFound(id.clone()))?;
                for modifier in removed_modifiers {
                    node.modifiers.remove(modifier);
                }
                node.modifiers.extend(added_modifiers.iter().cloned());
                Ok(())
            }
        }
    }

    fn add_node(&mut self, root: &SourceEntity) -> SnapshotResult<()> {
        let parent = parent_id(&root.id);
        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(SnapshotError::ParentNotFound(root.id.clone()));
            }
        }

        let added = root.walk();
        let mut seen = HashSet::with_capacity(added.len());
        for node in &added {
            if self.nodes.contains_key(&node.id) || !seen.insert(node.id.as_str()) {
                return Err(SnapshotError::DuplicateNode(node.id.clone()));
            }
            for child in &node.children {
                if parent_id(&child.id) != Some(node.id.as_str()) {
                    return Err(SnapshotError::InvalidChildId {
                        parent: node.id.clone(),
                        child: child.id.clone(),
                    });
                }
            }
        }

        for node in added {
            self.nodes.insert(
                node.id.clone(),
                SnapshotNode {
                    id: node.id.clone(),
                    kind: node.kind,
                    modifiers: node.modifiers.clone(),
                    children: node.children.iter().map(|child| child.id.clone()).collect(),
                },
            );
        }
        match parent.and_then(|parent| self.nodes.get_mut(parent)) {
            Some(parent) => parent.children.push(root.id.clone()),
            None => self.units.push(root.id.clone()),
        }
        Ok(())
    }

    fn remove_node(&mut self, id: &str) -> SnapshotResult<()> {
        if !self.nodes.contains_key(id) {
            return Err(SnapshotError::NodeNotFound(id.to_string()));
        }

        let mut pending = vec![id.to_string()];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                pending.extend(node.children);
            }
        }

        match parent_id(id).and_then(|parent| self.nodes.get_mut(parent)) {
            Some(parent) => parent.children.retain(|child| child != id),
            None => self.units.retain(|unit| unit != id),
        }
        Ok(())
    }
}
