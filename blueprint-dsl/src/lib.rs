//! Blueprint DSL - `$brooklyn:` expression parser & resolver
//!
//! This crate parses the expression language embedded in deployment
//! blueprints, such as `$brooklyn:parent().attributeWhenReady("http.port")`,
//! into a graph of [`Dsl`] nodes, prints it back in canonical form, and
//! resolves the entities it refers to against a host entity tree.
//!
//! Architecture:
//! ```text
//! Expression text
//!     ↓
//! Tokenizer (lexer)
//!     ↓
//! DslParser (recursive descent)
//!     ↓
//! Dsl graph (params, method chains)
//!     ↓               ↓
//! to_expression    references → relationships / issues
//! (round trip)     (against an EntityResolver)
//! ```

pub mod builder;
pub mod config;
pub mod entity;
pub mod error;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod relationships;

// Re-export key types for convenience
pub use config::*;
pub use entity::{
    root_of, same_entity, DescendantLookup, Entity, EntityNode, EntityRef, EntityResolver,
};
pub use error::{DslError, DslResult};
pub use lexer::{is_dslish, Tokenizer, FUNCTION_PREFIX};
pub use model::*;
pub use parser::*;
pub use relationships::{
    refresh_all_relationships, refresh_relationships, ConfigRelationships, EntityRelationships,
};
