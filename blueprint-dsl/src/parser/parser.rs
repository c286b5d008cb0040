//! Recursive-descent parser
//!
//! ```text
//! EXPRESSION     ::= "$brooklyn:" FUNCTION_CHAIN | CONSTANT
//! FUNCTION_CHAIN ::= FUNCTION_CALL ("." FUNCTION_CALL)*
//! FUNCTION_CALL  ::= IDENTIFIER "(" (EXPRESSION ("," EXPRESSION)*)? ")"
//! CONSTANT       ::= DOUBLE_QUOTED | SINGLE_QUOTED | PORT_RANGE | NUMBER | REMAINDER
//! ```

use super::input::DslInput;
use crate::config::DslConfig;
use crate::entity::{EntityRef, EntityResolver};
use crate::error::{DslError, DslResult};
use crate::lexer::{format_number, ConstantPattern, Tokenizer, FUNCTION_PREFIX};
use crate::model::{Dsl, Family, Kind};
use tracing::{debug, trace};

// ============================================================================
// PARSER
// ============================================================================

/// Parser for DSL expressions.
#[derive(Debug, Clone, Default)]
pub struct DslParser {
    config: DslConfig,
}

impl DslParser {
    pub fn new(config: DslConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DslConfig {
        &self.config
    }

    /// Parse `input` into an expression graph, without resolving references.
    pub fn parse(&self, input: impl Into<DslInput>) -> DslResult<Dsl> {
        match input.into() {
            DslInput::Text(text) => {
                debug!(input = %text, "Parsing DSL expression");
                self.parse_str(&text).map_err(|e| {
                    debug!(input = %text, error = %e, "DSL expression rejected");
                    e
                })
            }
            DslInput::Number(n) => Ok(Dsl::new(Kind::Number, format_number(n))),
            DslInput::Bool(b) => Ok(Dsl::new(Kind::Other, b.to_string())),
        }
    }

    /// Parse `input` and attach the entities it references, seen from `base`.
    pub fn parse_with<R>(
        &self,
        input: impl Into<DslInput>,
        base: &EntityRef,
        resolver: &R,
    ) -> DslResult<Dsl>
    where
        R: EntityResolver + ?Sized,
    {
        let dsl = self.parse(input)?;
        dsl.set_relationships(dsl.relationships_for(base, resolver));
        Ok(dsl)
    }

    /// Parse `text` only if it is a function expression.
    ///
    /// Plain constants are rejected with [`DslError::NotAnExpression`], so
    /// callers can keep such values as opaque text.
    pub fn parse_expression_only(&self, text: &str) -> DslResult<Dsl> {
        let dsl = self.parse(text)?;
        if dsl.kind().family() == Family::Constant {
            return Err(DslError::NotAnExpression(text.to_string()));
        }
        Ok(dsl)
    }

    fn parse_str(&self, source: &str) -> DslResult<Dsl> {
        let mut t = Tokenizer::new(source);
        let dsl = self.expression(&mut t, 0)?;
        t.skip_whitespace();
        if !t.at_end_of_input() {
            return Err(DslError::SpuriousContent { found: t.to_json() });
        }
        Ok(dsl)
    }

    fn expression(&self, t: &mut Tokenizer<'_>, depth: usize) -> DslResult<Dsl> {
        if depth > self.config.max_nesting_depth {
            return Err(DslError::TooDeep {
                limit: self.config.max_nesting_depth,
            });
        }
        if t.peek(FUNCTION_PREFIX) {
            t.next(FUNCTION_PREFIX)?;
            self.function_chain(t, depth)
        } else {
            self.constant(t)
        }
    }

    fn function_chain(&self, t: &mut Tokenizer<'_>, depth: usize) -> DslResult<Dsl> {
        let head = self.function_call(t, depth)?;
        let mut tail = head.clone();
        while t.peek(".") {
            t.next(".")?;
            let call = self.function_call(t, depth)?;
            tail.append_call(call.clone())?;
            tail = call;
        }
        Ok(head)
    }

    // Parameters need not be separated by commas: `f("a" "b")` has two.
    fn function_call(&self, t: &mut Tokenizer<'_>, depth: usize) -> DslResult<Dsl> {
        let name = t.next_identifier()?;
        let dsl = Dsl::new(Kind::for_function(name), name);
        t.next("(")?;
        while !t.at_end_of_input() {
            if t.peek(")") {
                break;
            }
            dsl.param(self.expression(t, depth + 1)?)?;
            if t.peek(",") {
                t.next(",")?;
                if t.at_end_of_input() {
                    return Err(DslError::EndOfInput {
                        expected: "EXPRESSION".to_string(),
                    });
                }
            }
        }
        t.next(")")?;
        Ok(dsl)
    }

    fn constant(&self, t: &mut Tokenizer<'_>) -> DslResult<Dsl> {
        let pattern = ConstantPattern::classify(t.remaining());
        trace!(pattern = ?pattern, remaining = %t.remaining(), "Classified constant");

        match pattern {
            Some(ConstantPattern::DoubleQuoted) => {
                let raw = t.next_quoted_string()?;
                Ok(Dsl::new(Kind::String, decode_string(raw, raw)?))
            }
            Some(ConstantPattern::SingleQuoted) => {
                // YAML quoting, re-quoted as JSON before decoding.
                let raw = t.next_single_quoted_string()?;
                let body = &raw[1..raw.len() - 1];
                let json = format!("\"{}\"", body.replace('"', "\\\"").replace("''", "'"));
                Ok(Dsl::new(Kind::String, decode_string(raw, &json)?))
            }
            Some(ConstantPattern::PortRange) => Ok(Dsl::new(Kind::Port, t.next_port_range()?)),
            Some(ConstantPattern::Number) => {
                let n = t.next_number()?;
                Ok(Dsl::new(Kind::Number, format_number(n)))
            }
            None if self.config.strict_constants => Err(t.expected("CONSTANT")),
            None => Ok(Dsl::new(Kind::String, t.remainder())),
        }
    }
}

/// Decode the JSON string literal `json`, reporting failures against the
/// source text `literal`.
fn decode_string(literal: &str, json: &str) -> DslResult<String> {
    serde_json::from_str(json).map_err(|e| DslError::InvalidString {
        literal: literal.to_string(),
        reason: e.to_string(),
    })
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse with the default configuration.
pub fn parse(input: impl Into<DslInput>) -> DslResult<Dsl> {
    DslParser::default().parse(input)
}

/// Parse with the default configuration and attach relationships.
pub fn parse_with<R>(input: impl Into<DslInput>, base: &EntityRef, resolver: &R) -> DslResult<Dsl>
where
    R: EntityResolver + ?Sized,
{
    DslParser::default().parse_with(input, base, resolver)
}

/// Parse and regenerate, yielding the canonical form of `source`.
pub fn round_trip(source: &str) -> DslResult<String> {
    parse(source)?.to_expression()
}

/// The full expression `dsl` belongs to.
pub fn generate_root(dsl: &Dsl) -> DslResult<String> {
    dsl.root().to_expression()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal() {
        let dsl = parse("\"Hello\"").unwrap();
        assert_eq!(dsl.kind(), Kind::String);
        assert_eq!(dsl.name(), "Hello");
    }

    #[test]
    fn test_function_kinds() {
        assert_eq!(parse("$brooklyn:formatString()").unwrap().kind(), Kind::Utility);
        assert_eq!(parse("$brooklyn:parent()").unwrap().kind(), Kind::Target);
        assert_eq!(
            parse("$brooklyn:attributeWhenReady(\"sensor1\")").unwrap().kind(),
            Kind::Method
        );
    }

    #[test]
    fn test_params_without_commas() {
        let dsl = parse("$brooklyn:formatString(\"a\" \"b\")").unwrap();
        assert_eq!(dsl.param_count(), 2);
        assert_eq!(dsl.to_expression().unwrap(), "$brooklyn:formatString(\"a\", \"b\")");
    }

    #[test]
    fn test_trailing_comma_at_end_of_input() {
        let err = parse("$brooklyn:formatString(\"a\",").unwrap_err();
        assert_eq!(
            err,
            DslError::EndOfInput {
                expected: "EXPRESSION".to_string()
            }
        );
    }

    #[test]
    fn test_spurious_content() {
        let err = parse("$brooklyn:self() garbage").unwrap_err();
        assert_eq!(
            err.to_string(),
            "EXPRESSION followed by spurious content: \"garbage\""
        );
    }

    #[test]
    fn test_missing_closing_paren() {
        let err = parse("$brooklyn:formatString(\"a\"").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_invalid_escape_in_double_quotes() {
        let err = parse(r#""bad \q escape""#).unwrap_err();
        assert!(matches!(err, DslError::InvalidString { .. }));
    }

    #[test]
    fn test_single_quoted_escapes_decode_like_json() {
        let dsl = parse(r"'a\nb'").unwrap();
        assert_eq!(dsl.name(), "a\nb");
        let dsl = parse(r#"'say "hi" \u0041'"#).unwrap();
        assert_eq!(dsl.name(), "say \"hi\" A");
    }

    #[test]
    fn test_invalid_escape_in_single_quotes() {
        let err = parse(r"'bad \q escape'").unwrap_err();
        assert!(matches!(
            err,
            DslError::InvalidString { ref literal, .. } if literal == r"'bad \q escape'"
        ));
    }

    #[test]
    fn test_long_chain_parses_and_resolves() {
        let source = format!("$brooklyn:self(){}", ".config(\"k\")".repeat(30_000));
        let dsl = parse(source.as_str()).unwrap();
        assert_eq!(dsl.last_method().root().name(), "self");
        assert_eq!(dsl.references().len(), 1);
        assert_eq!(dsl.to_expression().unwrap(), source);
    }

    #[test]
    fn test_remainder_fallback_and_strict_mode() {
        let dsl = parse("just some text").unwrap();
        assert_eq!(dsl.kind(), Kind::String);
        assert_eq!(dsl.name(), "just some text");

        let strict = DslParser::new(DslConfig::default().with_strict_constants(true));
        let err = strict.parse("just some text").unwrap_err();
        assert_eq!(err.to_string(), "Expected: CONSTANT but found: \"just some text\"");
        assert!(strict.parse("\"quoted\"").is_ok());
    }

    #[test]
    fn test_nesting_limit() {
        let parser = DslParser::new(DslConfig::default().with_max_nesting_depth(2));
        let ok = "$brooklyn:urlEncode($brooklyn:urlEncode(\"x\"))";
        assert!(parser.parse(ok).is_ok());
        let deep = "$brooklyn:urlEncode($brooklyn:urlEncode($brooklyn:urlEncode(\"x\")))";
        assert_eq!(parser.parse(deep).unwrap_err(), DslError::TooDeep { limit: 2 });
    }

    #[test]
    fn test_numbers_and_booleans_are_wrapped() {
        let n = parse(8080_i64).unwrap();
        assert_eq!(n.kind(), Kind::Number);
        assert_eq!(n.name(), "8080");
        let b = parse(true).unwrap();
        assert_eq!(b.kind(), Kind::Other);
        assert_eq!(b.to_expression().unwrap(), "true");
    }

    #[test]
    fn test_parse_expression_only() {
        let parser = DslParser::default();
        assert!(parser.parse_expression_only("$brooklyn:self()").is_ok());
        for constant in ["plain", "\"quoted\"", "8080+", "42"] {
            assert!(matches!(
                parser.parse_expression_only(constant),
                Err(DslError::NotAnExpression(_))
            ));
        }
    }

    #[test]
    fn test_generate_root_from_nested_node() {
        let dsl = parse("$brooklyn:formatString(\"%s\", $brooklyn:parent().config(\"k\"))").unwrap();
        let nested = dsl.param_at(1).unwrap().last_method();
        assert_eq!(nested.name(), "config");
        assert_eq!(generate_root(&nested).unwrap(), dsl.to_expression().unwrap());
    }
}
