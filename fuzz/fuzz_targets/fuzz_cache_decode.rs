#![no_main]

use bitmask::RepoIndex;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to an error, never a panic
    if let Ok(index) = RepoIndex::from_bytes(data) {
        let reencoded = index.to_bytes();
        assert_eq!(RepoIndex::from_bytes(&reencoded).ok(), Some(index));
    }
});
