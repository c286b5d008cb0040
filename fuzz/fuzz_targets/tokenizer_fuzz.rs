//! Fuzz test for the DSL tokenizer
//!
//! Drives every consuming operation over arbitrary text and checks that the
//! tokenizer only ever moves forward.
//!
//! Run with: cargo +nightly fuzz run tokenizer_fuzz -- -max_total_time=60

#![no_main]

use blueprint_dsl::Tokenizer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let mut t = Tokenizer::new(input);
        let mut op = 0usize;

        while !t.at_end_of_input() {
            let before = t.remaining().len();
            let _ = match op % 7 {
                0 => t.next_identifier().map(|_| ()),
                1 => t.next_quoted_string().map(|_| ()),
                2 => t.next_single_quoted_string().map(|_| ()),
                3 => t.next_number().map(|_| ()),
                4 => t.next_port_range().map(|_| ()),
                5 => t.next(",").map(|_| ()),
                _ => t.next_char().map(|_| ()),
            };
            assert!(t.remaining().len() <= before, "Tokenizer moved backwards");
            // next_char consumes a character every seventh round
            op += 1;
        }
        let _ = t.to_json();
    }
});
