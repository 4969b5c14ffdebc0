#![no_main]

use bitmask::utils::{BloomFilter, extract_trigrams, is_binary};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = is_binary(data);

    // A filter built from a file's trigrams must accept every substring of it
    let trigrams = extract_trigrams(data);
    assert!(trigrams.windows(2).all(|w| w[0] < w[1]));

    let filter = BloomFilter::from_trigrams(&trigrams, 0.01);
    assert!(filter.might_contain_all(&trigrams));
});
