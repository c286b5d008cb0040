//! Expression graph: node kinds, the [`Dsl`] node, issues and resolution

mod issue;
mod kind;
mod node;
mod resolve;

pub use issue::{Issue, IssueKind};
pub use kind::{Family, Kind, Target, UTILITIES};
pub use node::Dsl;
pub use resolve::Reference;
