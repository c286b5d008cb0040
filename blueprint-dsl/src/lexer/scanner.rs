//! Tokenizer implementation

use super::token::*;
use crate::error::{DslError, DslResult};

// ============================================================================
// TOKENIZER
// ============================================================================

/// String tokenizer for DSL expressions.
///
/// The tokenizer holds the unconsumed remainder of the input. It never looks
/// back; lookahead is limited to the `peek*` methods, which do not consume.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    rest: &'a str,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer over `source`, trimmed on both ends.
    pub fn new(source: &'a str) -> Self {
        Self {
            rest: source.trim(),
        }
    }

    /// True if there is nothing left to consume.
    pub fn at_end_of_input(&self) -> bool {
        self.rest.is_empty()
    }

    /// The unconsumed input.
    pub fn remaining(&self) -> &'a str {
        self.rest
    }

    /// Skip leading whitespace.
    pub fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// True if the buffer starts with `sym`, without skipping whitespace.
    pub fn peek(&self, sym: &str) -> bool {
        self.rest.starts_with(sym)
    }

    /// True if a port range occurs anywhere in the buffer.
    pub fn peek_port_range(&self) -> bool {
        ConstantPattern::PortRange.matches(self.rest)
    }

    /// True if the buffer starts with a number.
    pub fn peek_number(&self) -> bool {
        ConstantPattern::Number.matches(self.rest)
    }

    /// Consume the symbol `sym` and the whitespace around it.
    pub fn next(&mut self, sym: &str) -> DslResult<&'a str> {
        let sym = sym.trim();
        if sym.is_empty() {
            return Err(DslError::EmptySymbol);
        }
        self.skip_whitespace();
        if !self.rest.starts_with(sym) {
            return Err(self.expected(&format!("\"{}\"", sym)));
        }
        let (taken, rest) = self.rest.split_at(sym.len());
        self.rest = rest;
        self.skip_whitespace();
        Ok(taken)
    }

    /// Consume an identifier made of `[$A-Za-z0-9_]`.
    pub fn next_identifier(&mut self) -> DslResult<&'a str> {
        self.skip_whitespace();
        let end = self
            .rest
            .find(|c: char| !is_identifier_char(c))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(self.expected("IDENTIFIER"));
        }
        let (ident, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(ident)
    }

    /// Consume a double-quoted string and return it with its delimiters.
    ///
    /// A backslash escapes the following character; escapes are left for the
    /// caller to decode.
    pub fn next_quoted_string(&mut self) -> DslResult<&'a str> {
        self.skip_whitespace();
        let source = self.rest;
        let mut chars = source.char_indices();
        match chars.next() {
            Some((_, '"')) => {}
            _ => return Err(self.expected("\"\\\"\"")),
        }
        let mut escaped = false;
        for (i, c) in chars {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                let (quoted, rest) = source.split_at(i + 1);
                self.rest = rest;
                return Ok(quoted);
            }
        }
        self.rest = "";
        Err(DslError::UnterminatedString)
    }

    /// Consume a single-quoted (YAML) string and return it with its
    /// delimiters. Inside the string `''` stands for one `'`.
    pub fn next_single_quoted_string(&mut self) -> DslResult<&'a str> {
        self.skip_whitespace();
        let source = self.rest;
        let mut chars = source.char_indices().peekable();
        match chars.next() {
            Some((_, '\'')) => {}
            _ => return Err(self.expected("\"'\"")),
        }
        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                continue;
            }
            let (quoted, rest) = source.split_at(i + 1);
            self.rest = rest;
            return Ok(quoted);
        }
        self.rest = "";
        Err(DslError::UnterminatedString)
    }

    /// Consume a number at the start of the buffer.
    pub fn next_number(&mut self) -> DslResult<f64> {
        let text = match find_number(self.rest) {
            Some(text) => text,
            None => return Err(self.expected("NUMBER")),
        };
        let value = text.parse::<f64>().map_err(|_| self.expected("NUMBER"))?;
        self.rest = &self.rest[text.len()..];
        Ok(value)
    }

    /// Consume a port range.
    ///
    /// The range is searched for anywhere in the buffer; as many characters
    /// as the match holds are then dropped from the start of the buffer.
    pub fn next_port_range(&mut self) -> DslResult<&'a str> {
        let range = match find_port_range(self.rest) {
            Some(range) => range,
            None => return Err(self.expected("PORT_RANGE")),
        };
        self.skip_chars(range.chars().count());
        Ok(range)
    }

    /// Consume one character.
    pub fn next_char(&mut self) -> DslResult<char> {
        let mut chars = self.rest.chars();
        match chars.next() {
            Some(c) => {
                self.rest = chars.as_str();
                Ok(c)
            }
            None => Err(DslError::EndOfInput {
                expected: "CHAR".to_string(),
            }),
        }
    }

    /// Consume and return everything left.
    pub fn remainder(&mut self) -> &'a str {
        std::mem::take(&mut self.rest)
    }

    /// The remaining buffer as a JSON string, for diagnostics.
    pub fn to_json(&self) -> String {
        quote_json(self.rest)
    }

    pub(crate) fn expected(&self, what: &str) -> DslError {
        DslError::Lexical {
            expected: what.to_string(),
            found: self.to_json(),
        }
    }

    fn skip_chars(&mut self, count: usize) {
        let offset = self
            .rest
            .char_indices()
            .nth(count)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        self.rest = &self.rest[offset..];
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTED: &str = "\"hello world\"";
    const WORDS: &str = "word1 word2   word3  ";
    const SEPARATED: &str = "word1  , word2, word3 ,word4   ";

    #[test]
    fn test_double_quoted_string() {
        let mut t = Tokenizer::new(QUOTED);
        assert!(!t.at_end_of_input());
        assert!(t.peek("\""));
        assert_eq!(t.next_quoted_string().unwrap(), QUOTED);
        assert!(t.at_end_of_input());
    }

    #[test]
    fn test_double_quoted_string_keeps_escapes() {
        let source = r#""say \"hi\"" rest"#;
        let mut t = Tokenizer::new(source);
        assert_eq!(t.next_quoted_string().unwrap(), r#""say \"hi\"""#);
        assert_eq!(t.remaining(), " rest");
    }

    #[test]
    fn test_escaped_backslash_before_closing_quote() {
        let mut t = Tokenizer::new(r#""C:\\" tail"#);
        assert_eq!(t.next_quoted_string().unwrap(), r#""C:\\""#);
    }

    #[test]
    fn test_leading_space_inside_quotes_is_kept() {
        let mut t = Tokenizer::new("\"  padded\"");
        assert_eq!(t.next_quoted_string().unwrap(), "\"  padded\"");
    }

    #[test]
    fn test_unterminated_quoted_string() {
        let mut t = Tokenizer::new("\"never closed");
        assert_eq!(t.next_quoted_string(), Err(DslError::UnterminatedString));
    }

    #[test]
    fn test_single_quoted_string() {
        let source = "'I Love Single ''Quotes'''";
        let mut t = Tokenizer::new(source);
        assert_eq!(t.next_single_quoted_string().unwrap(), source);
        assert!(t.at_end_of_input());
    }

    #[test]
    fn test_single_quoted_string_stops_at_first_lone_quote() {
        let mut t = Tokenizer::new("'a''b', 'c'");
        assert_eq!(t.next_single_quoted_string().unwrap(), "'a''b'");
        assert_eq!(t.remaining(), ", 'c'");
    }

    #[test]
    fn test_empty_single_quoted_string() {
        let mut t = Tokenizer::new("''");
        assert_eq!(t.next_single_quoted_string().unwrap(), "''");
    }

    #[test]
    fn test_unterminated_single_quoted_string() {
        let mut t = Tokenizer::new("'open ''");
        assert_eq!(t.next_single_quoted_string(), Err(DslError::UnterminatedString));
    }

    #[test]
    fn test_words() {
        let mut t = Tokenizer::new(WORDS);
        assert!(!t.at_end_of_input());
        assert!(!t.peek("\""));
        assert_eq!(t.next_identifier().unwrap(), "word1");
        assert_eq!(t.next_identifier().unwrap(), "word2");
        assert_eq!(t.next_identifier().unwrap(), "word3");
        assert!(t.at_end_of_input());
    }

    #[test]
    fn test_words_with_separators() {
        let mut t = Tokenizer::new(SEPARATED);
        assert_eq!(t.next_identifier().unwrap(), "word1");
        assert_eq!(t.next(",").unwrap(), ",");
        assert_eq!(t.next_identifier().unwrap(), "word2");
        assert_eq!(t.next(",").unwrap(), ",");
        assert_eq!(t.next_identifier().unwrap(), "word3");
        assert_eq!(t.next(",").unwrap(), ",");
        assert_eq!(t.next_identifier().unwrap(), "word4");
        assert!(t.at_end_of_input());
    }

    #[test]
    fn test_identifier_allows_dollar() {
        let mut t = Tokenizer::new("$brooklyn:self()");
        assert_eq!(t.next_identifier().unwrap(), "$brooklyn");
        assert!(t.peek(":"));
    }

    #[test]
    fn test_missing_identifier() {
        let mut t = Tokenizer::new("(x)");
        let err = t.next_identifier().unwrap_err();
        assert_eq!(
            err,
            DslError::Lexical {
                expected: "IDENTIFIER".to_string(),
                found: "\"(x)\"".to_string(),
            }
        );
    }

    #[test]
    fn test_next_symbol_mismatch() {
        let mut t = Tokenizer::new("garbage");
        let err = t.next(")").unwrap_err();
        assert_eq!(err.to_string(), "Expected: \")\" but found: \"garbage\"");
    }

    #[test]
    fn test_empty_symbol() {
        let mut t = Tokenizer::new("x");
        assert_eq!(t.next("  "), Err(DslError::EmptySymbol));
    }

    #[test]
    fn test_numbers() {
        let mut t = Tokenizer::new("-12.5)");
        assert!(t.peek_number());
        assert_eq!(t.next_number().unwrap(), -12.5);
        assert_eq!(t.remaining(), ")");
        assert!(t.next_number().is_err());
    }

    #[test]
    fn test_port_ranges() {
        let mut t = Tokenizer::new("8080+, 1024-4096");
        assert!(t.peek_port_range());
        assert_eq!(t.next_port_range().unwrap(), "8080+");
        t.next(",").unwrap();
        assert_eq!(t.next_port_range().unwrap(), "1024-4096");
        assert!(t.at_end_of_input());
        assert!(!t.peek_port_range());
    }

    #[test]
    fn test_port_range_peek_looks_past_the_cursor() {
        let t = Tokenizer::new("abc 8080+");
        assert!(t.peek_port_range());
        assert!(!t.peek_number());
    }

    #[test]
    fn test_next_char_and_remainder() {
        let mut t = Tokenizer::new("ab cd");
        assert_eq!(t.next_char().unwrap(), 'a');
        assert_eq!(t.remainder(), "b cd");
        assert!(t.at_end_of_input());
        assert!(matches!(t.next_char(), Err(DslError::EndOfInput { .. })));
    }

    #[test]
    fn test_to_json_dumps_remaining_buffer() {
        let t = Tokenizer::new("  say \"x\"  ");
        assert_eq!(t.to_json(), "\"say \\\"x\\\"\"");
    }
}
