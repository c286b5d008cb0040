//! Blueprint DSL Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for expressions in canonical form
//! - A sample blueprint tree
//! - Assertions for round trips, parse failures and relationships

// Re-export core types for convenience
pub use blueprint_dsl::{
    DescendantLookup, Dsl, DslError, DslParser, DslResult, Entity, EntityNode, EntityRef, Kind,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies producing expression text that the parser
    //! accepts and prints back unchanged.
    //!
    //! Numbers and ports are only generated as whole expressions: a number
    //! parameter followed by digits further right is read as a port range.

    use blueprint_dsl::lexer::{format_number, quote_json};
    use proptest::collection::vec;
    use proptest::prelude::*;

    /// Function names: the well-known ones plus arbitrary identifiers.
    pub fn arb_function_name() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(vec![
                "self",
                "parent",
                "root",
                "component",
                "sibling",
                "child",
                "formatString",
                "urlEncode",
                "literal",
                "attributeWhenReady",
                "config",
                "sensor",
            ])
            .prop_map(str::to_string),
            "[a-zA-Z_][a-zA-Z0-9_]{0,10}",
        ]
    }

    /// A double-quoted string literal without digits.
    pub fn arb_string_literal() -> impl Strategy<Value = String> {
        "[a-zA-Z _.:/%'\"\\\\-]{0,16}".prop_map(|s| quote_json(&s))
    }

    /// A number in canonical form, e.g. `-12.5`, `0`, `7`.
    pub fn arb_number_literal() -> impl Strategy<Value = String> {
        (-1_000_000_i64..1_000_000).prop_map(|n| format_number(n as f64 / 100.0))
    }

    /// `8080+` or `1024-4096`.
    pub fn arb_port_literal() -> impl Strategy<Value = String> {
        prop_oneof![
            any::<u16>().prop_map(|p| format!("{}+", p)),
            (any::<u16>(), any::<u16>()).prop_map(|(a, b)| format!("{}-{}", a, b)),
        ]
    }

    /// A `$brooklyn:` chain of calls whose params come from `param`.
    pub fn arb_function_chain<S>(param: S) -> impl Strategy<Value = String>
    where
        S: Strategy<Value = String>,
    {
        vec((arb_function_name(), vec(param, 0..4)), 1..4).prop_map(|calls| {
            let calls: Vec<String> = calls
                .into_iter()
                .map(|(name, params)| format!("{}({})", name, params.join(", ")))
                .collect();
            format!("$brooklyn:{}", calls.join("."))
        })
    }

    /// A function chain with nested function chains and strings as params.
    pub fn arb_function_expression() -> impl Strategy<Value = String> {
        let param = arb_string_literal().prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                1 => arb_string_literal(),
                2 => arb_function_chain(inner),
            ]
        });
        arb_function_chain(param)
    }

    /// Any canonical expression: constants or function chains.
    pub fn arb_expression() -> impl Strategy<Value = String> {
        prop_oneof![
            arb_string_literal(),
            arb_number_literal(),
            arb_port_literal(),
            arb_function_expression(),
        ]
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built blueprint trees.

    use super::*;
    use std::rc::Rc;

    /// An application with a database, a web tier with a worker child and an
    /// nginx proxy.
    pub const SAMPLE_BLUEPRINT: &str = r#"
id: app
services:
  - id: db
    type: org.example.Database
    brooklyn.config:
      port: 3306
  - id: web
    type: org.example.WebApp
    brooklyn.config:
      db.url: $brooklyn:formatString("mysql://%s:%s/", $brooklyn:component("db").attributeWhenReady("host.address"), $brooklyn:component("db").config("port"))
      http.port: 8080+
    brooklyn.children:
      - id: worker
        brooklyn.config:
          upstream: $brooklyn:parent().attributeWhenReady("main.uri")
  - id: nginx
    brooklyn.config:
      backends:
        - $brooklyn:component("web").attributeWhenReady("main.uri")
        - $brooklyn:component("missing").attributeWhenReady("main.uri")
"#;

    /// Load [`SAMPLE_BLUEPRINT`].
    pub fn sample_blueprint() -> Rc<EntityNode> {
        EntityNode::from_yaml_str(SAMPLE_BLUEPRINT).expect("sample blueprint is valid")
    }

    /// Entity `id` of the tree under `root`, as an entity handle.
    pub fn entity(root: &Rc<EntityNode>, id: &str) -> EntityRef {
        root.find(id)
            .unwrap_or_else(|| panic!("no entity {} in fixture", id))
            .as_entity()
    }

    /// Id lookup over the whole tree under `root`.
    pub fn lookup(root: &Rc<EntityNode>) -> DescendantLookup {
        DescendantLookup::new(root.as_entity())
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for DSL-specific validation.

    use super::*;

    /// Assert that `source` parses and prints back as `expected`.
    #[track_caller]
    pub fn assert_canonical(source: &str, expected: &str) {
        let dsl = blueprint_dsl::parse(source)
            .unwrap_or_else(|e| panic!("Expected {:?} to parse, got: {}", source, e));
        let printed = dsl
            .to_expression()
            .unwrap_or_else(|e| panic!("Expected {:?} to print, got: {}", source, e));
        assert_eq!(printed, expected, "canonical form of {:?}", source);
    }

    /// Assert that `source` parses and prints back unchanged.
    #[track_caller]
    pub fn assert_round_trip(source: &str) {
        assert_canonical(source, source);
    }

    /// Assert that `source` is rejected by the grammar.
    #[track_caller]
    pub fn assert_parse_error(source: &str) -> DslError {
        match blueprint_dsl::parse(source) {
            Err(e) if e.is_parse_error() => e,
            Err(e) => panic!("Expected a parse error for {:?}, got: {}", source, e),
            Ok(dsl) => panic!("Expected a parse error for {:?}, got: {:?}", source, dsl),
        }
    }

    /// Assert the ids of `entities`, in order.
    #[track_caller]
    pub fn assert_entity_ids(entities: &[EntityRef], expected: &[&str]) {
        let ids: Vec<&str> = entities.iter().map(|e| e.id()).collect();
        assert_eq!(ids, expected);
    }
}
