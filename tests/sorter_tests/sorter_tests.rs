//! Tests for Sorter
//!
//! These tests verify:
//! - Last-insertion-wins dedup, in memory and across spills
//! - Custom comparators and equality predicates
//! - Size accounting and spill triggering
//! - Configuration errors
//! - Spill file cleanup and retention

use std::fs::File;

use spillsort::spill::RunReader;
use spillsort::{
    Bytewise, MergeIterator, Options, OptionsBuilder, RecordPool, Reversed, SortAlgorithm,
    SortError, Sorter,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn options(dir: &TempDir, buffer_size: usize) -> OptionsBuilder {
    Options::builder()
        .work_dir(dir.path())
        .buffer_size(buffer_size)
        .pool(RecordPool::new())
}

fn sort_pairs(options: Options, input: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut sorter = Sorter::new(options).unwrap();
    for (k, v) in input {
        sorter.put(k.as_bytes(), v.as_bytes()).unwrap();
    }
    drain(sorter.sort().unwrap())
}

fn drain(mut iter: MergeIterator) -> Vec<(String, String)> {
    let mut out = Vec::new();
    while iter.advance() {
        out.push((
            String::from_utf8(iter.key().to_vec()).unwrap(),
            String::from_utf8(iter.value().to_vec()).unwrap(),
        ));
    }
    assert!(iter.err().is_none(), "unexpected merge error: {:?}", iter.err());
    iter.close().unwrap();
    out
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// =============================================================================
// Dedup Tests
// =============================================================================

#[test]
fn test_dedupe_in_memory() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 1024).dedupe_bytewise().build();
    let out = sort_pairs(opts, &[("b", "1"), ("a", "1"), ("b", "2")]);

    assert_eq!(out, pairs(&[("a", "1"), ("b", "2")]));
}

#[test]
fn test_dedupe_across_spills() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 1).dedupe_bytewise().build();
    let out = sort_pairs(opts, &[("b", "1"), ("a", "1"), ("b", "2")]);

    assert_eq!(out, pairs(&[("a", "1"), ("b", "2")]));
}

#[test]
fn test_dedupe_mixed_memory_and_spills() {
    let dir = TempDir::new().unwrap();
    // Three records of 2 bytes fit in one run
    let opts = options(&dir, 6).dedupe_bytewise().build();
    let input = [
        ("k", "1"),
        ("k", "2"),
        ("j", "1"),
        ("k", "3"),
        ("j", "2"),
        ("k", "4"),
        ("k", "5"),
    ];
    let out = sort_pairs(opts, &input);

    assert_eq!(out, pairs(&[("j", "2"), ("k", "5")]));
}

#[test]
fn test_without_dedupe_everything_survives() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 1024).build();
    let out = sort_pairs(opts, &[("b", "1"), ("a", "1"), ("b", "2")]);

    assert_eq!(out, pairs(&[("a", "1"), ("b", "1"), ("b", "2")]));
}

#[test]
fn test_custom_equality_keeps_later_in_sort_order() {
    let dir = TempDir::new().unwrap();
    // Case-insensitive equality over a case-sensitive order
    let opts = options(&dir, 1024)
        .dedupe(|a: &[u8], b: &[u8]| a.eq_ignore_ascii_case(b))
        .build();
    let out = sort_pairs(opts, &[("a", "lower"), ("A", "upper"), ("b", "")]);

    // "A" < "a" bytewise, so "a" is the later one
    assert_eq!(out, pairs(&[("a", "lower"), ("b", "")]));
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_reverse_order() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 4).comparator(Reversed(Bytewise)).build();
    let out = sort_pairs(opts, &[("a", ""), ("c", ""), ("b", ""), ("e", ""), ("d", "")]);

    let keys: Vec<_> = out.into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["e", "d", "c", "b", "a"]);
}

#[test]
fn test_numeric_comparator() {
    let dir = TempDir::new().unwrap();
    let numeric = |a: &[u8], b: &[u8]| {
        let parse = |s: &[u8]| std::str::from_utf8(s).unwrap().parse::<u64>().unwrap();
        parse(a).cmp(&parse(b))
    };
    let opts = options(&dir, 8).comparator(numeric).build();
    let out = sort_pairs(opts, &[("100", ""), ("9", ""), ("25", ""), ("1000", "")]);

    let keys: Vec<_> = out.into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["9", "25", "100", "1000"]);
}

#[test]
fn test_unstable_sort_without_duplicates() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 1024)
        .sort_algorithm(SortAlgorithm::Unstable)
        .build();
    let out = sort_pairs(opts, &[("c", "3"), ("a", "1"), ("b", "2")]);

    assert_eq!(out, pairs(&[("a", "1"), ("b", "2"), ("c", "3")]));
}

#[test]
fn test_append_uses_empty_value() {
    let dir = TempDir::new().unwrap();
    let mut sorter = Sorter::new(options(&dir, 1024).build()).unwrap();
    sorter.append(b"line-2").unwrap();
    sorter.append(b"line-1").unwrap();

    let mut iter = sorter.sort().unwrap();
    assert!(iter.advance());
    assert_eq!(iter.data(), b"line-1");
    assert!(iter.value().is_empty());
    assert!(iter.advance());
    assert_eq!(iter.data(), b"line-2");
    assert!(!iter.advance());
    iter.close().unwrap();
}

// =============================================================================
// Size / Spill Tests
// =============================================================================

#[test]
fn test_size_counts_buffered_bytes() {
    let dir = TempDir::new().unwrap();
    let mut sorter = Sorter::new(options(&dir, 1024).build()).unwrap();
    assert_eq!(sorter.size(), 0);

    sorter.put(b"key", b"value").unwrap();
    sorter.put(b"k", b"").unwrap();
    assert_eq!(sorter.size(), 9);
    assert_eq!(sorter.buffered_len(), 2);
    assert_eq!(sorter.section_count(), 0);
    assert!(sorter.temp_path().is_none());
    sorter.close().unwrap();
}

#[test]
fn test_size_includes_spilled_bytes() {
    let dir = TempDir::new().unwrap();
    let mut sorter = Sorter::new(options(&dir, 4).build()).unwrap();

    sorter.put(b"ab", b"cd").unwrap();
    sorter.put(b"e", b"f").unwrap();

    // First record spilled as one frame, second still buffered
    assert_eq!(sorter.section_count(), 1);
    assert_eq!(sorter.buffered_len(), 1);
    assert_eq!(sorter.size(), (8 + 4) + 2);
    sorter.close().unwrap();
}

#[test]
fn test_spill_when_threshold_would_be_exceeded() {
    let dir = TempDir::new().unwrap();
    let mut sorter = Sorter::new(options(&dir, 10).build()).unwrap();

    sorter.put(b"12345", b"").unwrap();
    sorter.put(b"12345", b"").unwrap();
    assert_eq!(sorter.section_count(), 0);

    sorter.put(b"1", b"").unwrap();
    assert_eq!(sorter.section_count(), 1);
    sorter.close().unwrap();
}

#[test]
fn test_oversized_record_goes_into_empty_buffer() {
    let dir = TempDir::new().unwrap();
    let mut sorter = Sorter::new(options(&dir, 4).build()).unwrap();

    sorter.put(&[b'x'; 100], b"").unwrap();
    assert_eq!(sorter.section_count(), 0);
    assert_eq!(sorter.buffered_len(), 1);

    let out = drain(sorter.sort().unwrap());
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].0.len(), 100);
}

#[test]
fn test_empty_sort() {
    let dir = TempDir::new().unwrap();
    let sorter = Sorter::new(options(&dir, 1024).build()).unwrap();
    assert!(drain(sorter.sort().unwrap()).is_empty());
}

#[cfg(feature = "gzip")]
#[test]
fn test_sort_with_gzip() {
    use spillsort::Compression;

    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 64)
        .compression(Compression::Gzip)
        .dedupe_bytewise()
        .build();
    let mut input = Vec::new();
    for i in 0..300 {
        input.push((format!("key-{:03}", i % 100), format!("{}", i)));
    }
    let borrowed: Vec<(&str, &str)> = input
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let out = sort_pairs(opts, &borrowed);

    assert_eq!(out.len(), 100);
    assert_eq!(out[0], ("key-000".to_string(), "200".to_string()));
    assert_eq!(out[99], ("key-099".to_string(), "299".to_string()));
}

#[cfg(feature = "snappy")]
#[test]
fn test_sort_with_snappy() {
    use spillsort::Compression;

    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 64)
        .compression(Compression::Snappy)
        .dedupe_bytewise()
        .build();
    let mut input = Vec::new();
    for i in 0..300 {
        input.push((format!("key-{:03}", i % 100), format!("{}", i)));
    }
    let borrowed: Vec<(&str, &str)> = input
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let out = sort_pairs(opts, &borrowed);

    assert_eq!(out.len(), 100);
    assert_eq!(out[0], ("key-000".to_string(), "200".to_string()));
    assert_eq!(out[99], ("key-099".to_string(), "299".to_string()));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_zero_buffer_size_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = Sorter::new(options(&dir, 0).build());
    assert!(matches!(result, Err(SortError::Config(_))));
}

#[test]
fn test_work_dir_that_is_a_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    File::create(&file).unwrap();

    let opts = options(&dir, 1024).work_dir(&file).build();
    assert!(matches!(Sorter::new(opts), Err(SortError::Config(_))));
}

#[test]
fn test_missing_work_dir_fails_on_first_spill() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 1024)
        .work_dir(dir.path().join("missing"))
        .build();

    let mut sorter = Sorter::new(opts).unwrap();
    sorter.put(b"k", b"v").unwrap();
    assert!(matches!(sorter.sort(), Err(SortError::Config(_))));
}

#[test]
fn test_failed_spill_in_put_keeps_buffer() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 2).work_dir(dir.path().join("missing")).build();

    let mut sorter = Sorter::new(opts).unwrap();
    sorter.put(b"a", b"1").unwrap();
    assert!(matches!(sorter.put(b"b", b"2"), Err(SortError::Config(_))));

    assert_eq!(sorter.buffered_len(), 1);
    assert_eq!(sorter.section_count(), 0);
    assert!(sorter.temp_path().is_none());
    sorter.close().unwrap();
}

#[test]
fn test_sort_after_spills_reuses_spill_file() {
    let dir = TempDir::new().unwrap();
    let mut sorter = Sorter::new(options(&dir, 2).build()).unwrap();
    for key in ["c", "a", "b"] {
        sorter.put(key.as_bytes(), b"v").unwrap();
    }
    let path = sorter.temp_path().unwrap().to_path_buf();
    assert_eq!(sorter.section_count(), 2);

    let iter = sorter.sort().unwrap();
    assert_eq!(iter.temp_path(), path.as_path());
    assert_eq!(iter.sections().len(), 3);
    let keys: Vec<_> = drain(iter).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_options_debug_hides_closures() {
    let opts = Options::builder()
        .buffer_size(42)
        .dedupe(|a: &[u8], b: &[u8]| a == b)
        .build();
    let debug = format!("{:?}", opts);
    assert!(debug.contains("buffer_size: 42"));
    assert!(debug.contains("dedupe: true"));
}

// =============================================================================
// Cleanup / Retention Tests
// =============================================================================

#[test]
fn test_close_without_spill() {
    let dir = TempDir::new().unwrap();
    let mut sorter = Sorter::new(options(&dir, 1024).build()).unwrap();
    sorter.put(b"k", b"v").unwrap();
    sorter.close().unwrap();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_close_removes_spill_file() {
    let dir = TempDir::new().unwrap();
    let mut sorter = Sorter::new(options(&dir, 1).build()).unwrap();
    sorter.put(b"a", b"").unwrap();
    sorter.put(b"b", b"").unwrap();

    let path = sorter.temp_path().unwrap().to_path_buf();
    assert!(path.exists());

    sorter.close().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_dropped_sorter_removes_spill_file() {
    let dir = TempDir::new().unwrap();
    let mut sorter = Sorter::new(options(&dir, 1).build()).unwrap();
    sorter.put(b"a", b"").unwrap();
    sorter.put(b"b", b"").unwrap();
    let path = sorter.temp_path().unwrap().to_path_buf();

    drop(sorter);
    assert!(!path.exists());
}

#[test]
fn test_keep_files_retains_readable_spill_file() {
    let dir = TempDir::new().unwrap();
    let opts = options(&dir, 1).keep_files(true).build();
    let mut sorter = Sorter::new(opts).unwrap();
    for key in ["c", "a", "b"] {
        sorter.put(key.as_bytes(), b"v").unwrap();
    }

    let mut iter = sorter.sort().unwrap();
    let path = iter.temp_path().to_path_buf();
    let sections = iter.sections().to_vec();
    while iter.advance() {}
    iter.close().unwrap();
    drop(iter);

    assert!(path.exists());

    // The retained file can still be decoded section by section (one record
    // per section, in insertion order)
    let mut reader =
        RunReader::open(File::open(&path).unwrap(), sections, None, 4096, RecordPool::new())
            .unwrap();
    let mut keys = Vec::new();
    for section in 0..reader.num_sections() {
        while let Some(record) = reader.read_next(section).unwrap() {
            keys.push(record.key().to_vec());
        }
    }
    assert_eq!(keys, vec![b"c".to_vec(), b"a".to_vec(), b"b".to_vec()]);
    reader.close().unwrap();

    std::fs::remove_file(&path).unwrap();
}
