//! Fuzz test for the DSL parser
//!
//! This fuzz target feeds arbitrary text to the parser to find:
//! - Panics or crashes
//! - Stack overflows on deep nesting
//! - Graphs that cannot be printed back
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use blueprint_dsl::{parse, Dsl};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match parse(input) {
            Ok(dsl) => {
                // Parsed graphs never hold entity nodes, so they always print
                let printed = dsl.to_expression();
                assert!(printed.is_ok(), "Parsed expression should print: {:?}", printed);

                // Every node reachable from the root is visited exactly once
                let mut seen: Vec<Dsl> = Vec::new();
                dsl.visit(&mut |node: &Dsl| {
                    assert!(!seen.iter().any(|s| s.ptr_eq(node)), "Node visited twice");
                    seen.push(node.clone());
                });
                assert!(seen[0].ptr_eq(&dsl));
            }
            Err(err) => {
                assert!(err.is_parse_error(), "Unexpected error kind: {:?}", err);
                assert!(!err.to_string().is_empty(), "Error message should not be empty");
            }
        }
    }
});
