//! End-to-end extraction tests over synthesized archives.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use bsarc_core::ArchiveHandle;
use bsarc_core::ArchiveKind;
use bsarc_core::ExtractionConfig;
use bsarc_core::error::CodecError;
use bsarc_core::error::ErrorKind;
use bsarc_core::error::FormatError;
use bsarc_core::extract_archive;
use bsarc_core::list_archive;
use bsarc_core::test_utils::Ba2Builder;
use bsarc_core::test_utils::Ba2Texture;
use bsarc_core::test_utils::Tes3Builder;
use bsarc_core::test_utils::Tes4Builder;
use bsarc_core::verify_archive;
use tempfile::TempDir;
use walkdir::WalkDir;

fn write_archive(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).expect("failed to write archive");
    path
}

fn sequential() -> ExtractionConfig {
    ExtractionConfig::default().with_parallel(false)
}

#[test]
fn test_tes4_partial_failure_keeps_going() {
    let temp = TempDir::new().unwrap();
    let bytes = Tes4Builder::new(104)
        .raw_file("meshes", "a.nif", b"first file")
        .raw_file("meshes", "b.nif", b"second file")
        .mismatched_file("textures", "c.dds", b"third file payload", 999)
        .build();
    let archive = write_archive(temp.path(), "test.bsa", &bytes);
    let out = temp.path().join("out");

    let report = extract_archive(&archive, &out, &sequential()).unwrap();

    assert_eq!(report.kind, Some(ArchiveKind::Tes4));
    assert_eq!(report.files_total, 3);
    assert_eq!(report.files_extracted, 2);
    assert_eq!(report.files_failed(), 1);
    let failure = report.first_failure().unwrap();
    assert_eq!(failure.index, 2);
    assert_eq!(failure.kind, ErrorKind::Codec);
    assert_eq!(
        failure.message,
        CodecError::SizeMismatch {
            expected: 999,
            actual: 18
        }
        .to_string()
    );
    assert_eq!(failure.path, PathBuf::from("textures").join("c.dds"));
    assert!(!report.success());

    assert_eq!(fs::read(out.join("meshes/a.nif")).unwrap(), b"first file");
    assert_eq!(fs::read(out.join("meshes/b.nif")).unwrap(), b"second file");
    assert!(!out.join("textures/c.dds").exists());
}

#[test]
fn test_tes3_round_trip() {
    let temp = TempDir::new().unwrap();
    let bytes = Tes3Builder::new()
        .file(r"meshes\x\door.nif", b"door")
        .file(r"icons\door.tga", b"")
        .file("readme.txt", b"morrowind")
        .build();
    let archive = write_archive(temp.path(), "Morrowind.bsa", &bytes);
    let out = temp.path().join("out");

    let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();

    assert!(report.success());
    assert_eq!(report.kind, Some(ArchiveKind::Tes3));
    assert_eq!(report.bytes_written, 4 + 9);
    assert_eq!(fs::read(out.join("meshes/x/door.nif")).unwrap(), b"door");
    assert_eq!(fs::read(out.join("icons/door.tga")).unwrap(), b"");
    assert_eq!(fs::read(out.join("readme.txt")).unwrap(), b"morrowind");
}

#[test]
fn test_tes4_versions_round_trip() {
    for version in [103, 104, 105] {
        let temp = TempDir::new().unwrap();
        let payload = vec![b'z'; 4096];
        let bytes = Tes4Builder::new(version)
            .compressed(true)
            .file(r"sound\fx", "hit.wav", &payload)
            .raw_file(r"sound\fx", "miss.wav", b"plain")
            .file("interface", "menu.swf", b"swf")
            .build();
        let archive = write_archive(temp.path(), "a.bsa", &bytes);
        let out = temp.path().join("out");

        let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();

        assert!(report.success(), "version {version}: {}", report.summary());
        assert_eq!(fs::read(out.join("sound/fx/hit.wav")).unwrap(), payload);
        assert_eq!(fs::read(out.join("sound/fx/miss.wav")).unwrap(), b"plain");
        assert_eq!(fs::read(out.join("interface/menu.swf")).unwrap(), b"swf");
    }
}

#[test]
fn test_tes4_embedded_names() {
    let temp = TempDir::new().unwrap();
    let bytes = Tes4Builder::new(104)
        .embedded_names(true)
        .compressed(true)
        .file("meshes", "a.nif", b"compressed with prefix")
        .raw_file("meshes", "b.nif", b"raw with prefix")
        .build();
    let archive = write_archive(temp.path(), "a.bsa", &bytes);
    let out = temp.path().join("out");

    let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();

    assert!(report.success(), "{}", report.summary());
    assert_eq!(fs::read(out.join("meshes/a.nif")).unwrap(), b"compressed with prefix");
    assert_eq!(fs::read(out.join("meshes/b.nif")).unwrap(), b"raw with prefix");
}

#[test]
fn test_ba2_general_round_trip() {
    for version in [1, 2, 3, 7, 8] {
        let temp = TempDir::new().unwrap();
        let big = vec![7u8; 10_000];
        let bytes = Ba2Builder::general(version)
            .file(r"Scripts\quest.pex", b"pex")
            .compressed_file(r"Meshes\big.nif", &big)
            .build();
        let archive = write_archive(temp.path(), "a.ba2", &bytes);
        let out = temp.path().join("out");

        let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();

        assert!(report.success(), "version {version}: {}", report.summary());
        assert_eq!(report.kind, Some(ArchiveKind::Ba2));
        assert_eq!(fs::read(out.join("Scripts/quest.pex")).unwrap(), b"pex");
        assert_eq!(fs::read(out.join("Meshes/big.nif")).unwrap(), big);
    }
}

#[test]
fn test_ba2_texture_gets_dds_header() {
    let temp = TempDir::new().unwrap();
    let mip0 = vec![0xAA; 32];
    let mip1 = vec![0xBB; 8];
    let bytes = Ba2Builder::textures(1)
        .texture(
            r"Textures\rock_d.dds",
            Ba2Texture::new(8, 8, 71).compressed(),
            &[&mip0, &mip1],
        )
        .texture(r"Textures\sky.dds", Ba2Texture::new(4, 4, 98), &[&[1u8; 16]])
        .build();
    let archive = write_archive(temp.path(), "textures.ba2", &bytes);
    let out = temp.path().join("out");

    let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();
    assert!(report.success(), "{}", report.summary());

    let rock = fs::read(out.join("Textures/rock_d.dds")).unwrap();
    assert_eq!(&rock[..4], b"DDS ");
    assert_eq!(&rock[84..88], b"DXT1");
    assert_eq!(rock.len(), 128 + 32 + 8);
    assert_eq!(&rock[128..160], &mip0[..]);
    assert_eq!(&rock[160..], &mip1[..]);

    let sky = fs::read(out.join("Textures/sky.dds")).unwrap();
    assert_eq!(&sky[84..88], b"DX10");
    assert_eq!(sky.len(), 128 + 20 + 16);
}

#[test]
fn test_path_escape_rejects_whole_archive() {
    let temp = TempDir::new().unwrap();
    let bytes = Ba2Builder::general(1)
        .file("fine.txt", b"ok")
        .raw_name_file(br"..\..\evil.txt", b"pwned")
        .build();
    let archive = write_archive(temp.path(), "evil.ba2", &bytes);
    let out = temp.path().join("out");

    let err = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap_err();

    assert!(matches!(err.as_format(), Some(FormatError::PathEscape { .. })));
    assert!(!out.exists());
    assert!(!temp.path().join("evil.txt").exists());
}

#[test]
fn test_absolute_and_drive_names_rejected() {
    for name in [&br"\windows\system32\x.dll"[..], b"C:\\boot.ini"] {
        let temp = TempDir::new().unwrap();
        let bytes = Tes3Builder::new().raw_name_file(name, b"x").build();
        let archive = write_archive(temp.path(), "a.bsa", &bytes);

        let err = extract_archive(&archive, temp.path().join("out"), &ExtractionConfig::default()).unwrap_err();
        assert!(
            matches!(err.as_format(), Some(FormatError::PathEscape { .. })),
            "{name:?} accepted: {err}"
        );
    }
}

#[test]
fn test_bad_magic() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "a.bsa", b"RIFF\0\0\0\0WAVEfmt ");

    let err = extract_archive(&archive, temp.path().join("out"), &ExtractionConfig::default()).unwrap_err();
    assert!(matches!(err.as_format(), Some(FormatError::BadMagic { .. })));
}

#[test]
fn test_truncated_archive() {
    let temp = TempDir::new().unwrap();
    let bytes = Tes4Builder::new(104).file("a", "b.txt", b"data").build();
    let archive = write_archive(temp.path(), "a.bsa", &bytes[..40]);

    let err = extract_archive(&archive, temp.path().join("out"), &ExtractionConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_unsupported_tes4_version() {
    let temp = TempDir::new().unwrap();
    let mut bytes = Tes4Builder::new(104).file("a", "b.txt", b"data").build();
    bytes[4..8].copy_from_slice(&200u32.to_le_bytes());
    let archive = write_archive(temp.path(), "a.bsa", &bytes);

    let err = ArchiveHandle::open(&archive, &ExtractionConfig::default()).unwrap_err();
    assert!(matches!(
        err.as_format(),
        Some(FormatError::UnsupportedVersion { version: 200 })
    ));
}

#[test]
fn test_garbage_stream_is_codec_failure() {
    let temp = TempDir::new().unwrap();
    let bytes = Tes4Builder::new(105)
        .raw_file("a", "good.txt", b"good")
        .garbage_file("a", "bad.bin", 256)
        .build();
    let archive = write_archive(temp.path(), "a.bsa", &bytes);
    let out = temp.path().join("out");

    let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();

    assert_eq!(report.files_extracted, 1);
    assert_eq!(report.failures[0].kind, ErrorKind::Codec);
    assert!(!out.join("a/bad.bin").exists());
}

#[test]
fn test_size_mismatch_reports_both_sizes() {
    let temp = TempDir::new().unwrap();
    let bytes = Ba2Builder::general(1).mismatched_file("a.txt", b"abc", 5).build();
    let archive = write_archive(temp.path(), "a.ba2", &bytes);
    let handle = ArchiveHandle::open(&archive, &ExtractionConfig::default()).unwrap();

    let mut source = handle.open_source().unwrap();
    let mut out = Vec::new();
    let mut buf = vec![0u8; 4096];
    let err = handle
        .decode_file(
            0,
            &mut source,
            &mut out,
            &mut buf,
            &bsarc_core::extraction::QuotaTracker::unlimited(),
        )
        .unwrap_err();

    assert!(matches!(
        err.as_codec(),
        Some(CodecError::SizeMismatch { expected: 5, actual: 3 })
    ));
}

#[test]
fn test_existing_files_policy() {
    let temp = TempDir::new().unwrap();
    let bytes = Tes3Builder::new().file("a.txt", b"archive").build();
    let archive = write_archive(temp.path(), "a.bsa", &bytes);
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("a.txt"), b"user").unwrap();

    let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();
    assert_eq!(report.failures[0].kind, ErrorKind::Io);
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"user");

    let config = ExtractionConfig::default().with_overwrite(true);
    let report = extract_archive(&archive, &out, &config).unwrap();
    assert!(report.success());
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"archive");
}

#[test]
fn test_file_count_quota_fails_open() {
    let temp = TempDir::new().unwrap();
    let bytes = Tes3Builder::new()
        .file("a", b"1")
        .file("b", b"2")
        .file("c", b"3")
        .build();
    let archive = write_archive(temp.path(), "a.bsa", &bytes);
    let out = temp.path().join("out");
    let config = ExtractionConfig {
        max_file_count: 2,
        ..ExtractionConfig::default()
    };

    let err = extract_archive(&archive, &out, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Quota);
    assert!(!out.exists());
}

#[test]
fn test_file_size_quota_skips_file() {
    let temp = TempDir::new().unwrap();
    let bytes = Ba2Builder::general(1)
        .file("small.txt", b"tiny")
        .file("large.bin", &[0u8; 2048])
        .build();
    let archive = write_archive(temp.path(), "a.ba2", &bytes);
    let out = temp.path().join("out");
    let config = ExtractionConfig {
        max_file_size: 1024,
        ..ExtractionConfig::default()
    };

    let report = extract_archive(&archive, &out, &config).unwrap();
    assert_eq!(report.files_extracted, 1);
    assert_eq!(report.failures[0].kind, ErrorKind::Quota);
    assert!(out.join("small.txt").exists());
    assert!(!out.join("large.bin").exists());
}

#[test]
fn test_parallel_and_sequential_agree() {
    let temp = TempDir::new().unwrap();
    let mut builder = Ba2Builder::general(1);
    for i in 0..64 {
        let data = vec![i as u8; 100 + i * 7];
        builder = if i % 2 == 0 {
            builder.compressed_file(&format!(r"dir{}\file{i}.bin", i % 5), &data)
        } else {
            builder.file(&format!(r"dir{}\file{i}.bin", i % 5), &data)
        };
    }
    let builder = builder.garbage_file("broken.bin", 77);
    let archive = write_archive(temp.path(), "a.ba2", &builder.build());

    let seq_out = temp.path().join("seq");
    let par_out = temp.path().join("par");
    let seq = extract_archive(&archive, &seq_out, &sequential()).unwrap();
    let par = extract_archive(&archive, &par_out, &ExtractionConfig::default().with_parallel(true)).unwrap();

    assert_eq!(seq.files_extracted, 64);
    assert_eq!(seq.files_extracted, par.files_extracted);
    assert_eq!(seq.bytes_written, par.bytes_written);
    assert_eq!(seq.failures, par.failures);

    let seq_files = tree(&seq_out);
    assert_eq!(seq_files.len(), 64);
    assert_eq!(seq_files, tree(&par_out));
}

/// Relative path and contents of every file under `root`, sorted by path.
fn tree(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .map(Result::unwrap)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, fs::read(entry.path()).unwrap())
        })
        .collect()
}

#[test]
fn test_missing_names_use_hashes() {
    let temp = TempDir::new().unwrap();
    let bytes = Ba2Builder::general(1)
        .without_names()
        .file("a.nif", b"one")
        .file("b.txt", b"two")
        .build();
    let archive = write_archive(temp.path(), "a.ba2", &bytes);
    let out = temp.path().join("out");

    let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();

    assert!(report.success());
    assert_eq!(fs::read(out.join("0000d1d1/00001000.nif")).unwrap(), b"one");
    assert_eq!(fs::read(out.join("0000d1d1/00001001.txt")).unwrap(), b"two");
}

#[test]
fn test_windows_1252_names() {
    let temp = TempDir::new().unwrap();
    let bytes = Tes4Builder::new(104)
        .raw_name_file(b"sound", b"caf\xE9.wav", b"audio")
        .build();
    let archive = write_archive(temp.path(), "a.bsa", &bytes);
    let out = temp.path().join("out");

    extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();
    assert_eq!(fs::read(out.join("sound/caf\u{e9}.wav")).unwrap(), b"audio");
}

#[test]
fn test_list_and_verify() {
    let temp = TempDir::new().unwrap();
    let bytes = Tes4Builder::new(105)
        .compressed(true)
        .file("a", "x.txt", b"xxxx")
        .garbage_file("a", "y.bin", 10)
        .build();
    let archive = write_archive(temp.path(), "a.bsa", &bytes);

    let manifest = list_archive(&archive, &ExtractionConfig::default()).unwrap();
    assert_eq!(manifest.kind, ArchiveKind::Tes4);
    assert_eq!(manifest.version, 105);
    assert_eq!(manifest.total_entries, 2);
    assert_eq!(manifest.entries[0].path, PathBuf::from("a").join("x.txt"));
    assert!(manifest.entries.iter().all(|entry| entry.compressed));

    let report = verify_archive(&archive, &ExtractionConfig::default()).unwrap();
    assert_eq!(report.files_extracted, 1);
    assert_eq!(report.files_failed(), 1);
    assert!(!temp.path().join("a").exists());
}

#[test]
fn test_empty_archive_creates_destination() {
    let temp = TempDir::new().unwrap();
    let archive = write_archive(temp.path(), "empty.ba2", &Ba2Builder::general(1).build());
    let out = temp.path().join("out");

    let report = extract_archive(&archive, &out, &ExtractionConfig::default()).unwrap();
    assert!(report.success());
    assert_eq!(report.files_total, 0);
    assert!(out.is_dir());
}
