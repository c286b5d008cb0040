//! Parser module for DSL expressions

pub mod input;
pub mod parser;

pub use input::*;
pub use parser::*;
