//! Source entity tree model.
//!
//! # Responsibility
//! - Define the versioned entity hierarchy (units, types, functions, fields).
//! - Derive structural relations (parent, local name) from qualified ids.
//!
//! # Invariants
//! - A child id is always `<parent id>:<local name>`.
//! - Separators inside a parameter list are not segment boundaries.
//! - An id without a separator names a top-level unit and has no parent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Separator between the segments of a qualified entity id.
pub const ENTITY_SEPARATOR: char = ':';

const PARAMETER_LIST_START: char = '(';
const PARAMETER_LIST_END: char = ')';

/// Closed set of entity kinds tracked by the source model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Compilation unit (usually one source file).
    Unit,
    /// Class, interface or other type declaration.
    Type,
    /// Function or method; its local name is the signature.
    Function,
    /// Field or variable.
    Variable,
}

impl EntityKind {
    /// Stable lowercase label used by storage and log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Type => "type",
            Self::Function => "function",
            Self::Variable => "variable",
        }
    }
}

/// One node of the source tree together with all of its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntity {
    /// Globally unique qualified id.
    pub id: String,
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub modifiers: BTreeSet<String>,
    /// Direct children in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SourceEntity>,
}

impl SourceEntity {
    /// Creates a childless entity with the given qualified id.
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            modifiers: BTreeSet::new(),
            children: Vec::new(),
        }
    }

    /// Creates a top-level compilation unit.
    pub fn unit(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Unit, id)
    }

    /// Appends a childless child whose id is derived from this entity's id.
    pub fn child(self, kind: EntityKind, local_name: &str) -> Self {
        self.child_with(kind, local_name, |child| child)
    }

    /// Appends a child and lets `build` populate it before attaching.
    pub fn child_with(
        mut self,
        kind: EntityKind,
        local_name: &str,
        build: impl FnOnce(SourceEntity) -> SourceEntity,
    ) -> Self {
        let child = build(SourceEntity::new(kind, child_id(&self.id, local_name)));
        self.children.push(child);
        self
    }

    /// Adds modifiers such as `public` or `static`.
    pub fn with_modifiers<I, S>(mut self, modifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modifiers.extend(modifiers.into_iter().map(Into::into));
        self
    }

    /// Returns the signature of a function entity, `None` for other kinds.
    pub fn signature(&self) -> Option<&str> {
        match self.kind {
            EntityKind::Function => Some(local_name(&self.id)),
            EntityKind::Unit | EntityKind::Type | EntityKind::Variable => None,
        }
    }

    /// Returns this entity followed by all descendants in pre-order.
    pub fn walk(&self) -> Vec<&SourceEntity> {
        let mut visited = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            visited.push(node);
            stack.extend(node.children.iter().rev());
        }
        visited
    }
}

/// Builds the qualified id of a child entity.
pub fn child_id(parent_id: &str, local_name: &str) -> String {
    format!("{parent_id}{ENTITY_SEPARATOR}{local_name}")
}

/// Returns the id of the parent entity, or `None` for top-level units.
pub fn parent_id(id: &str) -> Option<&str> {
    last_separator(id).map(|index| &id[..index])
}

/// Returns the last segment of a qualified id.
pub fn local_name(id: &str) -> &str {
    match last_separator(id) {
        Some(index) => &id[index + ENTITY_SEPARATOR.len_utf8()..],
        None => id,
    }
}

// Only separators outside every open parameter list count, so function
// ancestors like `f()` keep their descendants' ids splittable.
fn last_separator(id: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut last = None;
    for (index, ch) in id.char_indices() {
        match ch {
            PARAMETER_LIST_START => depth += 1,
            PARAMETER_LIST_END => depth = depth.saturating_sub(1),
            ENTITY_SEPARATOR if depth == 0 => last = Some(index),
            _ => {}
        }
    }
    last
}
