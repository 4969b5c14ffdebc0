//! End-to-end behavior of the library: build, query, verify, cache.

use bitmask::fs::{FileSystem, MemoryFileSystem, WalkFileSystem};
use bitmask::index::{Blob, IndexConfig, RepoIndex, load_or_build};
use bitmask::output::PlainPrinter;
use bitmask::utils::{BloomFilter, extract_trigrams};
use std::collections::BTreeSet;
use std::fs;

fn memory_fs(files: &[(&str, &str)]) -> MemoryFileSystem {
    files.iter().copied().collect()
}

fn grep_output(index: &RepoIndex, fs: &dyn FileSystem, query: &[u8]) -> String {
    let mut printer = PlainPrinter::new(Vec::new());
    index.grep(fs, query, &mut printer).unwrap();
    String::from_utf8(printer.into_inner()).unwrap()
}

#[test]
fn hello_found_in_single_file() {
    let fs = memory_fs(&[("a.txt", "hello world"), ("b.txt", "goodbye")]);
    let index = RepoIndex::build(&fs, &IndexConfig::default()).unwrap();

    let candidates: BTreeSet<String> = index.paths_matching_query(b"hello").collect();
    assert!(candidates.contains("a.txt"));

    assert_eq!(grep_output(&index, &fs, b"hello"), "a.txt:1:0:hello world\n");
}

#[test]
fn absent_query_prints_nothing() {
    let fs = memory_fs(&[("a.txt", "hello world"), ("b.txt", "goodbye")]);
    let index = RepoIndex::build(&fs, &IndexConfig::default()).unwrap();

    let mut printer = PlainPrinter::new(Vec::new());
    let summary = index.grep(&fs, b"xyz123", &mut printer).unwrap();
    assert!(printer.into_inner().is_empty());
    assert_eq!(summary.hits, 0);
    assert_eq!(summary.false_positives, summary.candidates);
}

#[test]
fn two_byte_file_never_matches() {
    let fs = memory_fs(&[("ab.txt", "ab"), ("abc.txt", "abc")]);
    let index = RepoIndex::build(&fs, &IndexConfig::default()).unwrap();

    for query in ["abc", "aba", "xab", "ab\n"] {
        let found: Vec<String> = index.paths_matching_query(query.as_bytes()).collect();
        assert!(!found.contains(&"ab.txt".to_string()), "query {:?}", query);
    }
}

#[test]
fn batch_boundary_keeps_every_candidate() {
    let fs: MemoryFileSystem = (0..5001)
        .map(|i| (format!("f{:05}.txt", i), format!("content of file number {}\n", i)))
        .collect();
    let index = RepoIndex::build(&fs, &IndexConfig::default()).unwrap();
    assert_eq!(index.batch_count(), 2);

    let all: BTreeSet<String> = index.paths_matching_query(b"content of").collect();
    assert_eq!(all.len(), 5001);

    let (hits, _) = index.grep_hits(&fs, b"file number 5000\n");
    assert!(hits.is_empty(), "grep never matches across the line terminator");

    let (hits, summary) = index.grep_hits(&fs, b"file number 5000");
    assert_eq!(summary.files_matched, 1);
    assert_eq!(hits[0].path, "f05000.txt");
}

#[test]
fn no_false_negatives_for_any_substring() {
    let text = "The quick brown fox jumps over the lazy dog.\nfn main() { let x = 42; }\n";
    let fs = memory_fs(&[("t.txt", text), ("other.txt", "unrelated")]);
    let index = RepoIndex::build(&fs, &IndexConfig::default()).unwrap();

    let bytes = text.as_bytes();
    for start in 0..bytes.len() {
        for end in (start + 3)..=bytes.len().min(start + 12) {
            let query = &bytes[start..end];
            let found: Vec<String> = index.paths_matching_query(query).collect();
            assert!(found.contains(&"t.txt".to_string()), "missed {:?}", query);
        }
    }
}

#[test]
fn grep_prints_only_verified_lines() {
    // Filters tiny enough to saturate: every probe passes
    let saturated = BloomFilter::from_raw(vec![u64::MAX], 1).unwrap();
    let index = RepoIndex::from_blobs(vec![
        Blob::new("a.txt", Some(saturated.clone())),
        Blob::new("b.txt", Some(saturated)),
    ]);
    let fs = memory_fs(&[("a.txt", "nothing here"), ("b.txt", "a needle\nno\nneedle")]);

    assert_eq!(index.paths_matching_query(b"needle").len(), 2);
    assert_eq!(
        grep_output(&index, &fs, b"needle"),
        "b.txt:1:2:a needle\nb.txt:3:0:needle\n"
    );
}

#[test]
fn cache_roundtrip_answers_like_fresh_index() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("index.bin");

    let fs = memory_fs(&[
        ("src/main.rs", "fn main() {\n    run();\n}\n"),
        ("src/run.rs", "pub fn run() {}\n"),
        ("README.md", "# demo\n"),
        ("x", "ab"),
    ]);
    let index = RepoIndex::build(&fs, &IndexConfig::default()).unwrap();
    index.serialize_to_file(&cache).unwrap();

    let restored = RepoIndex::open_cache(&cache).unwrap();
    assert_eq!(restored, index);

    for query in ["fn ", "run", "demo", "", "ab", "missing"] {
        let before: BTreeSet<String> = index.paths_matching_query(query.as_bytes()).collect();
        let after: BTreeSet<String> = restored.paths_matching_query(query.as_bytes()).collect();
        assert_eq!(before, after, "query {:?}", query);
    }
}

#[test]
fn load_or_build_writes_then_reuses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache.bin");
    let config = IndexConfig::default();

    let fs = memory_fs(&[("a.txt", "alpha")]);
    let built = load_or_build(&fs, &cache, &config, true).unwrap();
    assert!(cache.exists());

    // A different fs proves the second call reads the cache instead of rebuilding
    let other = memory_fs(&[("z.txt", "zeta")]);
    let loaded = load_or_build(&other, &cache, &config, true).unwrap();
    assert_eq!(loaded, built);
}

#[test]
fn corrupt_cache_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache.bin");
    fs::write(&cache, b"BMSK\x01\x00\x00\x00garbage").unwrap();

    let memfs = memory_fs(&[("a.txt", "alpha")]);
    let index = load_or_build(&memfs, &cache, &IndexConfig::default(), true).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(RepoIndex::open_cache(&cache).unwrap(), index);
}

#[test]
fn walk_filesystem_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("node_modules/dep")).unwrap();
    fs::write(root.join("src/lib.rs"), "pub fn answer() -> u32 { 42 }\n").unwrap();
    fs::write(root.join("node_modules/dep/index.js"), "answer = 42\n").unwrap();
    fs::write(root.join("notes.txt"), "the answer\nis 42").unwrap();

    let config = IndexConfig::default();
    let walk = WalkFileSystem::new(root, &config).unwrap();
    let index = RepoIndex::build(&walk, &config).unwrap();

    let paths: Vec<&str> = index.blobs().iter().map(|b| b.path.as_str()).collect();
    assert_eq!(paths, vec!["notes.txt", "src/lib.rs"]);

    assert_eq!(
        grep_output(&index, &walk, b"42"),
        "notes.txt:2:3:is 42\nsrc/lib.rs:1:25:pub fn answer() -> u32 { 42 }\n"
    );
}

#[test]
fn filter_of_file_accepts_its_trigrams() {
    let content = b"some file content with several words";
    let trigrams = extract_trigrams(content);
    let filter = BloomFilter::from_trigrams(&trigrams, 0.01);
    assert!(trigrams.iter().all(|&t| filter.might_contain(t)));
}
