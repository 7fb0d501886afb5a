#![no_main]

use citygml::{ParserConfig, TessellationMode, parse_reader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed input must produce an error, never a panic
    if let Ok(outcome) = parse_reader(data, ParserConfig::default()) {
        let _ = outcome.model.envelope();
    }

    let deferred = ParserConfig::new().with_tessellation_mode(TessellationMode::Deferred);
    let _ = parse_reader(data, deferred);
});
