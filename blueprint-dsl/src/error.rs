//! Error types for DSL parsing and expression graph manipulation

use thiserror::Error;

// ============================================================================
// DSL ERRORS
// ============================================================================

/// Errors raised while tokenizing, parsing or mutating DSL expressions.
///
/// Resolution problems (unknown references, missing parents) are never
/// raised: they are recorded as [`Issue`](crate::model::Issue)s on the node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DslError {
    /// The tokenizer could not match the expected symbol or pattern
    #[error("Expected: {expected} but found: {found}")]
    Lexical { expected: String, found: String },

    /// `next` was asked for an empty symbol
    #[error("Empty symbol")]
    EmptySymbol,

    /// A quoted string ran into the end of the input
    #[error("Unterminated quoted string")]
    UnterminatedString,

    /// A quoted string could not be decoded
    #[error("Invalid string literal {literal}: {reason}")]
    InvalidString { literal: String, reason: String },

    /// The input ended where more content was required
    #[error("Expected: {expected} but found: end-of-input")]
    EndOfInput { expected: String },

    /// A complete expression was followed by more input
    #[error("EXPRESSION followed by spurious content: {found}")]
    SpuriousContent { found: String },

    /// Function calls nested beyond the configured limit
    #[error("Expression nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    /// Misuse of the node API (e.g. a parameter on a constant)
    #[error("{0}")]
    Structure(String),

    /// The input value has no DSL representation
    #[error("Unable to parse: {0}")]
    UnsupportedInput(String),

    /// The input parsed, but only as a plain constant
    #[error("Constants are not interpreted as DSL expressions: {0}")]
    NotAnExpression(String),

    /// Invalid parser configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DslError {
    /// True for errors produced by the tokenizer or the grammar.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            DslError::Lexical { .. }
                | DslError::EmptySymbol
                | DslError::UnterminatedString
                | DslError::InvalidString { .. }
                | DslError::EndOfInput { .. }
                | DslError::SpuriousContent { .. }
                | DslError::TooDeep { .. }
        )
    }
}

pub type DslResult<T> = Result<T, DslError>;
