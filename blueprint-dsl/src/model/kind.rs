//! Node kinds, families and target function names

use serde::{Deserialize, Serialize};
use std::fmt;

/// Utility functions that do not address entities.
pub const UTILITIES: [&str; 4] = ["literal", "formatString", "urlEncode", "regexReplacement"];

/// Broad category of a [`Kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Constant,
    Function,
    Reference,
}

/// What a DSL node denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Kind {
    /// Non-entity utility call, e.g. `formatString`
    Utility,
    /// Entity-addressing call, e.g. `parent`, `component`
    Target,
    /// Any other call, e.g. `attributeWhenReady`, `config`
    Method,
    /// A resolved entity
    Entity,
    #[default]
    String,
    Number,
    /// Any other constant, e.g. a boolean
    Other,
    /// `8080+` or `1024-4096`
    Port,
}

impl Kind {
    pub const ALL: [Kind; 8] = [
        Kind::Utility,
        Kind::Target,
        Kind::Method,
        Kind::Entity,
        Kind::String,
        Kind::Number,
        Kind::Other,
        Kind::Port,
    ];

    pub fn family(self) -> Family {
        match self {
            Kind::Utility | Kind::Target | Kind::Method => Family::Function,
            Kind::Entity => Family::Reference,
            Kind::String | Kind::Number | Kind::Other | Kind::Port => Family::Constant,
        }
    }

    pub fn is_function(self) -> bool {
        self.family() == Family::Function
    }

    pub fn description(self) -> &'static str {
        match self {
            Kind::Utility => "utility function",
            Kind::Target => "target entity function",
            Kind::Method => "method",
            Kind::Entity => "entity object",
            Kind::String => "constant string",
            Kind::Number => "constant number",
            Kind::Other => "constant other",
            Kind::Port => "constant port",
        }
    }

    /// Classify a function by name: targets, then utilities, else method.
    pub fn for_function(name: &str) -> Kind {
        if Target::from_name(name).is_some() {
            Kind::Target
        } else if UTILITIES.contains(&name) {
            Kind::Utility
        } else {
            Kind::Method
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Entity-addressing function names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// `self()`
    SelfEntity,
    Root,
    Child,
    Entity,
    Parent,
    Sibling,
    Ancestor,
    ScopeRoot,
    Component,
    Descendant,
}

impl Target {
    pub const ALL: [Target; 10] = [
        Target::SelfEntity,
        Target::Root,
        Target::Child,
        Target::Entity,
        Target::Parent,
        Target::Sibling,
        Target::Ancestor,
        Target::ScopeRoot,
        Target::Component,
        Target::Descendant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Target::SelfEntity => "self",
            Target::Root => "root",
            Target::Child => "child",
            Target::Entity => "entity",
            Target::Parent => "parent",
            Target::Sibling => "sibling",
            Target::Ancestor => "ancestor",
            Target::ScopeRoot => "scopeRoot",
            Target::Component => "component",
            Target::Descendant => "descendant",
        }
    }

    pub fn from_name(name: &str) -> Option<Target> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Targets that take an entity id as their last argument.
    pub fn takes_id(self) -> bool {
        matches!(
            self,
            Target::Child
                | Target::Sibling
                | Target::Descendant
                | Target::Ancestor
                | Target::Entity
                | Target::Component
        )
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
