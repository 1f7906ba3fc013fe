//! Property-based tests for name validation and archive decoding.
//!
//! These tests use proptest to generate arbitrary names and payloads and
//! verify that no name escapes the destination and that stored data comes
//! back unchanged.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Component;

use bsarc_core::EntryPath;
use bsarc_core::ExtractionConfig;
use bsarc_core::error::FormatError;
use bsarc_core::extract_archive;
use bsarc_core::test_utils::Ba2Builder;
use bsarc_core::test_utils::Tes4Builder;
use proptest::prelude::*;
use tempfile::TempDir;

proptest! {
    /// Whatever the input, an accepted path only has normal components.
    #[test]
    fn prop_entry_path_never_escapes(raw in "[a-z./\\\\:]{0,40}") {
        if let Ok(path) = EntryPath::parse(&raw) {
            let path = path.to_path_buf();
            prop_assert!(path.components().all(|c| matches!(c, Component::Normal(_))));
        }
    }

    /// Any name containing a `..` component is rejected.
    #[test]
    fn prop_parent_component_rejected(
        prefix in "([a-z]{1,8}[\\\\/]){0,4}",
        suffix in "([\\\\/][a-z]{1,8}){0,4}"
    ) {
        let raw = format!("{prefix}..{suffix}");
        let err = EntryPath::parse(&raw).unwrap_err();
        prop_assert!(
            matches!(err, FormatError::PathEscape { .. }),
            "expected PathEscape, got {err}"
        );
    }

    /// Backslash and slash separated names resolve to the same path.
    #[test]
    fn prop_separators_equivalent(components in prop::collection::vec("[a-zA-Z0-9_ -]{1,12}", 1..6)) {
        let components: Vec<String> = components
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        prop_assume!(!components.is_empty());

        let back = EntryPath::parse(&components.join("\\")).unwrap();
        let forward = EntryPath::parse(&components.join("/")).unwrap();
        prop_assert_eq!(back, forward);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// TES4 files come back byte for byte, compressed or not.
    #[test]
    fn prop_tes4_payloads_survive(
        version in prop::sample::select(vec![103u32, 104, 105]),
        compressed in any::<bool>(),
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..2048), 1..6)
    ) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let mut builder = Tes4Builder::new(version).compressed(compressed);
        for (i, data) in payloads.iter().enumerate() {
            builder = builder.file("data", &format!("f{i}.bin"), data);
        }
        let archive = temp.path().join("a.bsa");
        std::fs::write(&archive, builder.build()).unwrap();
        let out = temp.path().join("out");

        let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();
        prop_assert!(report.success(), "{}", report.summary());
        for (i, data) in payloads.iter().enumerate() {
            let written = std::fs::read(out.join("data").join(format!("f{i}.bin"))).unwrap();
            prop_assert_eq!(&written, data);
        }
    }

    /// BA2 general files come back byte for byte with either codec.
    #[test]
    fn prop_ba2_payloads_survive(
        version in prop::sample::select(vec![1u32, 3]),
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..2048), 1..6)
    ) {
        let temp = TempDir::new().expect("failed to create temp dir");
        let mut builder = Ba2Builder::general(version);
        for (i, data) in payloads.iter().enumerate() {
            builder = builder.compressed_file(&format!("f{i}.bin"), data);
        }
        let archive = temp.path().join("a.ba2");
        std::fs::write(&archive, builder.build()).unwrap();
        let out = temp.path().join("out");

        let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();
        prop_assert!(report.success(), "{}", report.summary());
        for (i, data) in payloads.iter().enumerate() {
            let written = std::fs::read(out.join(format!("f{i}.bin"))).unwrap();
            prop_assert_eq!(&written, data);
        }
    }

    /// Truncating an archive never panics; it either opens or fails cleanly.
    #[test]
    fn prop_truncation_never_panics(cut in 0usize..200) {
        let bytes = Tes4Builder::new(104)
            .compressed(true)
            .file("a", "b.txt", b"some text to compress")
            .file("c", "d.txt", b"more")
            .build();
        let cut = cut.min(bytes.len());
        let temp = TempDir::new().expect("failed to create temp dir");
        let archive = temp.path().join("a.bsa");
        std::fs::write(&archive, &bytes[..cut]).unwrap();

        let _ = extract_archive(&archive, temp.path().join("out"), &ExtractionConfig::default());
    }
}
