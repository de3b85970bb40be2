#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    use zen_core::specifier::Specifier;

    if let Ok(s) = std::str::from_utf8(data) {
        let Ok(specifier) = Specifier::parse(s) else {
            return;
        };

        let reparsed = Specifier::parse(&specifier.to_string()).expect("rendered specifier should parse");

        assert_eq!(specifier, reparsed);
    }
});
