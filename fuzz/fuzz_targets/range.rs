#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    use zen_core::versions::Range;

    if let Ok(s) = std::str::from_utf8(data) {
        let Ok(range) = Range::parse(s) else {
            return;
        };

        let _ = range.matches(&semver::Version::new(1, 2, 3));
    }
});
