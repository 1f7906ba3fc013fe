//! Core extraction engine.
//!
//! Files are independent: each one is decoded from its own offsets through
//! a read handle owned by the worker, so they can be written in any order
//! or in parallel. Outcomes are always collected in record order, which
//! keeps the report identical between sequential and parallel runs.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Instant;

use rayon::prelude::*;
use tracing::info;
use tracing::warn;

use super::QuotaTracker;
use super::writer::write_file;
use crate::ArchiveHandle;
use crate::ExtractionConfig;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::codec::DECODE_BUFFER_SIZE;
use crate::report::FileFailure;
use crate::types::DestDir;

/// Where decoded bytes go.
#[derive(Debug, Clone, Copy)]
enum Sink<'a> {
    Disk { dest: &'a DestDir, overwrite: bool },
    Discard,
}

/// Extracts every file of `handle` under `dest`.
pub fn extract(
    handle: &ArchiveHandle,
    dest: &DestDir,
    config: &ExtractionConfig,
    progress: &mut dyn ProgressCallback,
) -> ExtractionReport {
    let sink = Sink::Disk {
        dest,
        overwrite: config.overwrite_existing,
    };
    run(handle, sink, config, progress)
}

/// Decodes every file of `handle` without writing anything.
pub fn verify(
    handle: &ArchiveHandle,
    config: &ExtractionConfig,
    progress: &mut dyn ProgressCallback,
) -> ExtractionReport {
    run(handle, Sink::Discard, config, progress)
}

fn run(
    handle: &ArchiveHandle,
    sink: Sink<'_>,
    config: &ExtractionConfig,
    progress: &mut dyn ProgressCallback,
) -> ExtractionReport {
    let start = Instant::now();
    let quota = QuotaTracker::new(config);
    let total = handle.len();
    let parallel = config.parallel && total > 1;

    info!(
        archive = %handle.path().display(),
        files = total,
        parallel,
        verify_only = matches!(sink, Sink::Discard),
        "processing archive"
    );

    let outcomes = if parallel {
        run_parallel(handle, sink, &quota, progress)
    } else {
        run_sequential(handle, sink, &quota, progress)
    };

    let mut report = ExtractionReport {
        kind: Some(handle.kind()),
        files_total: total,
        ..ExtractionReport::default()
    };
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(bytes) => {
                report.files_extracted += 1;
                report.bytes_written += bytes;
            }
            Err(err) => {
                let path = handle.files()[index].path.to_path_buf();
                warn!(path = %path.display(), error = %err, "file failed");
                report.add_failure(FileFailure::new(index, &path, &err));
            }
        }
    }
    report.duration = start.elapsed();
    progress.on_complete();

    info!(
        extracted = report.files_extracted,
        failed = report.files_failed(),
        bytes = report.bytes_written,
        "archive done"
    );
    report
}

fn run_sequential(
    handle: &ArchiveHandle,
    sink: Sink<'_>,
    quota: &QuotaTracker,
    progress: &mut dyn ProgressCallback,
) -> Vec<Result<u64>> {
    let total = handle.len();
    let mut source = handle.open_source();
    let mut buf = vec![0u8; DECODE_BUFFER_SIZE];

    (0..total)
        .map(|index| {
            let path = handle.files()[index].path.to_path_buf();
            progress.on_entry_start(&path, total, index + 1);
            let outcome = process(handle, index, &mut source, sink, quota, &mut buf);
            finish(progress, &path, &outcome);
            outcome
        })
        .collect()
}

fn run_parallel(
    handle: &ArchiveHandle,
    sink: Sink<'_>,
    quota: &QuotaTracker,
    progress: &mut dyn ProgressCallback,
) -> Vec<Result<u64>> {
    let total = handle.len();
    let started = AtomicUsize::new(0);
    let progress = Mutex::new(progress);

    (0..total)
        .into_par_iter()
        .map_init(
            || (handle.open_source(), vec![0u8; DECODE_BUFFER_SIZE]),
            |(source, buf), index| {
                let path = handle.files()[index].path.to_path_buf();
                let current = started.fetch_add(1, Ordering::Relaxed) + 1;
                if let Ok(mut progress) = progress.lock() {
                    progress.on_entry_start(&path, total, current);
                }

                let outcome = process(handle, index, source, sink, quota, buf);

                if let Ok(mut progress) = progress.lock() {
                    finish(&mut **progress, &path, &outcome);
                }
                outcome
            },
        )
        .collect()
}

fn process(
    handle: &ArchiveHandle,
    index: usize,
    source: &mut Result<BufReader<File>>,
    sink: Sink<'_>,
    quota: &QuotaTracker,
    buf: &mut [u8],
) -> Result<u64> {
    let source = match source {
        Ok(source) => source,
        Err(err) => {
            return Err(std::io::Error::other(format!("cannot reopen archive: {err}")).into());
        }
    };

    match sink {
        Sink::Disk { dest, overwrite } => write_file(handle, index, source, dest, overwrite, buf, quota),
        Sink::Discard => handle.decode_file(index, source, &mut std::io::sink(), buf, quota),
    }
}

fn finish(progress: &mut dyn ProgressCallback, path: &Path, outcome: &Result<u64>) {
    match outcome {
        Ok(bytes) => {
            progress.on_bytes_written(*bytes);
            progress.on_entry_complete(path);
        }
        Err(err) => progress.on_entry_failed(path, &err.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::{Ba2Builder, Tes4Builder};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        started: usize,
        completed: Vec<PathBuf>,
        failed: Vec<PathBuf>,
        bytes: u64,
        finished: bool,
    }

    impl ProgressCallback for Recorder {
        fn on_entry_start(&mut self, _path: &Path, _total: usize, _current: usize) {
            self.started += 1;
        }

        fn on_bytes_written(&mut self, bytes: u64) {
            self.bytes += bytes;
        }

        fn on_entry_complete(&mut self, path: &Path) {
            self.completed.push(path.to_path_buf());
        }

        fn on_entry_failed(&mut self, path: &Path, _message: &str) {
            self.failed.push(path.to_path_buf());
        }

        fn on_complete(&mut self) {
            self.finished = true;
        }
    }

    fn archive() -> Vec<u8> {
        Ba2Builder::general(1)
            .file("a.txt", b"aaaa")
            .garbage_file("b.bin", 64)
            .compressed_file(r"dir\c.txt", b"cccccccccccccccc")
            .mismatched_file("d.txt", b"dddd", 10)
            .file("e.txt", b"e")
            .build()
    }

    fn setup(bytes: &[u8]) -> (TempDir, ArchiveHandle, DestDir) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.ba2");
        std::fs::write(&path, bytes).unwrap();
        let handle = ArchiveHandle::open(&path, &ExtractionConfig::default()).unwrap();
        let dest = DestDir::create(temp.path().join("out")).unwrap();
        (temp, handle, dest)
    }

    #[test]
    fn test_failures_do_not_stop_archive() {
        let (_temp, handle, dest) = setup(&archive());
        let config = ExtractionConfig::default().with_parallel(false);
        let mut recorder = Recorder::default();
        let report = extract(&handle, &dest, &config, &mut recorder);

        assert_eq!(report.files_total, 5);
        assert_eq!(report.files_extracted, 3);
        assert_eq!(report.files_failed(), 2);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(report.failures[0].kind, ErrorKind::Codec);
        assert_eq!(report.failures[1].index, 3);
        assert_eq!(report.bytes_written, 4 + 16 + 1);

        assert_eq!(recorder.started, 5);
        assert_eq!(recorder.completed.len(), 3);
        assert_eq!(recorder.failed.len(), 2);
        assert_eq!(recorder.bytes, report.bytes_written);
        assert!(recorder.finished);

        assert!(dest.as_path().join("dir/c.txt").is_file());
        assert!(!dest.as_path().join("b.bin").exists());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (_temp, handle, _dest) = setup(&archive());

        let temp = TempDir::new().unwrap();
        let seq_dest = DestDir::create(temp.path().join("seq")).unwrap();
        let par_dest = DestDir::create(temp.path().join("par")).unwrap();

        let seq = extract(
            &handle,
            &seq_dest,
            &ExtractionConfig::default().with_parallel(false),
            &mut crate::NoopProgress,
        );
        let par = extract(
            &handle,
            &par_dest,
            &ExtractionConfig::default().with_parallel(true),
            &mut crate::NoopProgress,
        );

        assert_eq!(seq.files_extracted, par.files_extracted);
        assert_eq!(seq.bytes_written, par.bytes_written);
        assert_eq!(seq.failures, par.failures);
        for name in ["a.txt", "dir/c.txt", "e.txt"] {
            assert_eq!(
                std::fs::read(seq_dest.as_path().join(name)).unwrap(),
                std::fs::read(par_dest.as_path().join(name)).unwrap()
            );
        }
    }

    #[test]
    fn test_total_quota() {
        let bytes = Tes4Builder::new(104)
            .file("d", "a", &[1u8; 60])
            .file("d", "b", &[2u8; 60])
            .build();
        let (_temp, handle, dest) = setup(&bytes);
        let config = ExtractionConfig {
            max_total_size: 100,
            parallel: false,
            ..ExtractionConfig::default()
        };
        let report = extract(&handle, &dest, &config, &mut crate::NoopProgress);
        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.failures[0].kind, ErrorKind::Quota);
        assert_eq!(report.failures[0].index, 1);
    }

    #[test]
    fn test_verify_writes_nothing() {
        let (temp, handle, _dest) = setup(&archive());
        let report = verify(&handle, &ExtractionConfig::default(), &mut crate::NoopProgress);
        assert_eq!(report.files_extracted, 3);
        assert_eq!(report.files_failed(), 2);
        assert!(!temp.path().join("out").join("a.txt").exists());
    }

    #[test]
    fn test_empty_archive() {
        let bytes = Ba2Builder::general(1).build();
        let (_temp, handle, dest) = setup(&bytes);
        let report = extract(&handle, &dest, &ExtractionConfig::default(), &mut crate::NoopProgress);
        assert!(report.success());
        assert_eq!(report.files_total, 0);
    }
}
