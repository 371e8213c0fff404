//! Decapsulation records kept per field.
//!
//! # Invariants
//! - Accessors keep insertion order and never contain the same
//!   `(id, transaction_id)` pair twice.
//! - Identity is structural: records compare by value, never by reference.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// An entity id paired with the transaction that introduced the entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackedNode {
    pub id: String,
    pub transaction_id: String,
}

impl TrackedNode {
    pub fn new(id: impl Into<String>, transaction_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            transaction_id: transaction_id.into(),
        }
    }
}

impl Display for TrackedNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.transaction_id)
    }
}

/// One accessor introduced for an already existing field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decapsulation {
    pub field_id: String,
    pub accessor_id: String,
    /// Transaction in which the accessor was added.
    pub transaction_id: String,
}

/// A field together with the accessors currently decapsulating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecapsulationSet {
    field: TrackedNode,
    accessors: Vec<TrackedNode>,
}

impl DecapsulationSet {
    /// Creates a set with no decapsulating accessors.
    pub fn new(field: TrackedNode) -> Self {
        Self {
            field,
            accessors: Vec::new(),
        }
    }

    pub fn field(&self) -> &TrackedNode {
        &self.field
    }

    /// Decapsulating accessors in the order they were recorded.
    pub fn accessors(&self) -> &[TrackedNode] {
        &self.accessors
    }

    /// Whether at least one accessor decapsulates this field.
    pub fn is_decapsulated(&self) -> bool {
        !self.accessors.is_empty()
    }

    /// Records `accessor`; returns `false` if the same entry already exists.
    pub fn add_accessor(&mut self, accessor: TrackedNode) -> bool {
        if self.accessors.contains(&accessor) {
            return false;
        }
        self.accessors.push(accessor);
        true
    }

    /// Forgets the accessor with `accessor_id`, whatever transaction added it.
    pub fn remove_accessor(&mut self, accessor_id: &str) -> bool {
        let before = self.accessors.len();
        self.accessors.retain(|accessor| accessor.id != accessor_id);
        self.accessors.len() != before
    }

    /// Flattens this set into one record per accessor.
    pub fn records(&self) -> impl Iterator<Item = Decapsulation> + '_ {
        self.accessors.iter().map(move |accessor| Decapsulation {
            field_id: self.field.id.clone(),
            accessor_id: accessor.id.clone(),
            transaction_id: accessor.transaction_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Decapsulation, DecapsulationSet, TrackedNode};

    #[test]
    fn add_accessor_is_idempotent_and_ordered() {
        let mut set = DecapsulationSet::new(TrackedNode::new("A.java:x", "0"));
        assert!(!set.is_decapsulated());

        assert!(set.add_accessor(TrackedNode::new("A.java:setX(int)", "2")));
        assert!(set.add_accessor(TrackedNode::new("A.java:getX()", "1")));
        assert!(!set.add_accessor(TrackedNode::new("A.java:getX()", "1")));

        let ids: Vec<&str> = set.accessors().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["A.java:setX(int)", "A.java:getX()"]);
    }

    #[test]
    fn remove_accessor_matches_by_id_only() {
        let mut set = DecapsulationSet::new(TrackedNode::new("A.java:x", "0"));
        set.add_accessor(TrackedNode::new("A.java:getX()", "1"));

        assert!(!set.remove_accessor("A.java:isX()"));
        assert!(set.remove_accessor("A.java:getX()"));
        assert!(!set.is_decapsulated());
    }

    #[test]
    fn records_flatten_field_and_accessors() {
        let mut set = DecapsulationSet::new(TrackedNode::new("A.java:x", "0"));
        set.add_accessor(TrackedNode::new("A.java:getX()", "1"));

        let records: Vec<Decapsulation> = set.records().collect();
        assert_eq!(
            records,
            vec![Decapsulation {
                field_id: "A.java:x".to_string(),
                accessor_id: "A.java:getX()".to_string(),
                transaction_id: "1".to_string(),
            }]
        );
        assert_eq!(set.field().to_string(), "A.java:x (0)");
    }
}
