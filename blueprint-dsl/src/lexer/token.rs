//! Token-level patterns and literal helpers

use once_cell::sync::Lazy;
use std::fmt;

/// Prefix that marks a string as a DSL function chain.
pub const FUNCTION_PREFIX: &str = "$brooklyn:";

// Anchored at the start of the buffer.
static NUMBER: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^[+-]?[0-9]+(?:\.[0-9]*)?|^[+-]?\.[0-9]+").expect("Invalid number regex")
});

// Not anchored: matches anywhere in the remaining buffer.
static PORT_RANGE: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"[0-9]+\+|[0-9]+-[0-9]+").expect("Invalid port range regex")
});

// ============================================================================
// CONSTANT PATTERNS
// ============================================================================

/// The constant syntaxes the parser recognises, in the order it tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantPattern {
    /// `"..."` with JSON escapes
    DoubleQuoted,
    /// `'...'` with YAML `''` escapes
    SingleQuoted,
    /// `8080+` or `1024-4096`
    PortRange,
    /// Optionally signed integer or decimal
    Number,
}

impl ConstantPattern {
    /// Precedence order: first match wins.
    pub const ORDERED: [ConstantPattern; 4] = [
        ConstantPattern::DoubleQuoted,
        ConstantPattern::SingleQuoted,
        ConstantPattern::PortRange,
        ConstantPattern::Number,
    ];

    /// Grammar name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ConstantPattern::DoubleQuoted => "DOUBLE_QUOTED_STRING",
            ConstantPattern::SingleQuoted => "SINGLE_QUOTED_STRING",
            ConstantPattern::PortRange => "PORT_RANGE",
            ConstantPattern::Number => "NUMBER",
        }
    }

    /// Whether `buffer` can be read as this constant.
    ///
    /// Quoted strings must start the buffer and numbers are anchored too, but
    /// a port range is searched for anywhere in the buffer.
    pub fn matches(self, buffer: &str) -> bool {
        match self {
            ConstantPattern::DoubleQuoted => buffer.starts_with('"'),
            ConstantPattern::SingleQuoted => buffer.starts_with('\''),
            ConstantPattern::PortRange => PORT_RANGE.is_match(buffer),
            ConstantPattern::Number => NUMBER.is_match(buffer),
        }
    }

    /// The first pattern in precedence order that matches `buffer`.
    pub fn classify(buffer: &str) -> Option<ConstantPattern> {
        Self::ORDERED.into_iter().find(|pattern| pattern.matches(buffer))
    }
}

impl fmt::Display for ConstantPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn find_number(buffer: &str) -> Option<&str> {
    NUMBER.find(buffer).map(|m| m.as_str())
}

pub(crate) fn find_port_range(buffer: &str) -> Option<&str> {
    PORT_RANGE.find(buffer).map(|m| m.as_str())
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c == '$' || c == '_' || c.is_ascii_alphanumeric()
}

// ============================================================================
// LITERAL HELPERS
// ============================================================================

/// True if `text` is written as a DSL function chain.
pub fn is_dslish(text: &str) -> bool {
    text.starts_with(FUNCTION_PREFIX)
}

/// Quote `value` as a JSON string literal.
pub fn quote_json(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Canonical text for a number: shortest round-trip digits, `0` for both
/// zeroes, and exponent notation outside `[1e-6, 1e21)` (`1e+21`, `1.5e-7`).
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let formatted = format!("{:e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        };
    }
    value.to_string()
}
