//! Writing one archive file to disk.

use std::fs;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::io::Read;
use std::io::Seek;
use std::io::Write;

use tracing::trace;

use super::QuotaTracker;
use crate::ArchiveHandle;
use crate::Result;
use crate::types::DestDir;

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Decodes file `index` into its output path under `dest`.
///
/// Missing parent directories are created through
/// [`DestDir::create_parents`], which refuses to descend through a directory
/// symlink planted outside the root. Without `overwrite` an existing file is left alone and
/// reported as an I/O error; with it, an existing symlink at the target is
/// replaced rather than followed.
///
/// On any failure after the output was created, the partial file is removed.
pub(crate) fn write_file<S: Read + Seek>(
    handle: &ArchiveHandle,
    index: usize,
    source: &mut S,
    dest: &DestDir,
    overwrite: bool,
    buf: &mut [u8],
    quota: &QuotaTracker,
) -> Result<u64> {
    let entry = &handle.files()[index].path;
    let target = dest.create_parents(entry)?;

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        if let Ok(meta) = fs::symlink_metadata(&target)
            && meta.file_type().is_symlink()
        {
            fs::remove_file(&target)?;
        }
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let file = options.open(&target)?;
    let mut out = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    let result = handle
        .decode_file(index, source, &mut out, buf, quota)
        .and_then(|written| {
            out.flush()?;
            Ok(written)
        });

    match result {
        Ok(written) => {
            trace!(path = %entry, bytes = written, "wrote file");
            Ok(written)
        }
        Err(err) => {
            drop(out);
            // Best effort; the original error is what gets reported.
            let _ = fs::remove_file(&target);
            Err(err)
        }
    }
}
