//! Lexer module for the blueprint DSL

pub mod token;
pub mod scanner;

pub use token::*;
pub use scanner::*;
