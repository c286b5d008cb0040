//! Resolution issues recorded on DSL nodes

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// `parent()` applied to an entity without a parent
    MissingParent,
    /// An id that the resolver does not know
    UnknownReference,
    /// An id-taking target called without arguments
    MissingArgument,
}

/// A non-fatal problem found while resolving references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    pub fn missing_parent(entity_id: &str) -> Self {
        Self {
            kind: IssueKind::MissingParent,
            message: format!(
                "The entity with ID <code>{}</code> does not have a parent",
                entity_id
            ),
        }
    }

    pub fn unknown_reference(id: &str) -> Self {
        Self {
            kind: IssueKind::UnknownReference,
            message: format!("The reference ID <code>{}</code> does not exist", id),
        }
    }

    pub fn missing_argument(target: &str) -> Self {
        Self {
            kind: IssueKind::MissingArgument,
            message: format!("The function <code>{}()</code> needs an entity ID", target),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
