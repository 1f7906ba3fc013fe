//! C ABI for bsarc.
//!
//! One entry point, [`extract_archive`], extracts a BSA or BA2 archive and
//! reports errors through a buffer owned by the caller. No state is kept
//! between calls, so the function is safe to call from several threads at
//! once.
//!
//! ```c
//! int extract_archive(const char *archive, const char *destination,
//!                     char *error_buf, unsigned error_len);
//! ```

use std::ffi::CStr;
use std::ffi::c_char;
use std::ffi::c_int;
use std::ffi::c_uint;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::path::PathBuf;

use bsarc_core::ExtractionConfig;
use tracing::error;

/// Extracts `archive` into `destination`.
///
/// Files that already exist in `destination` are overwritten; the caller is
/// expected to have confirmed this.
///
/// # Returns
///
/// `0` when every file was extracted. Otherwise the number of bytes needed
/// to hold the full error message including its terminating NUL. As much of
/// the message as fits is written to `error_buf`, always NUL-terminated when
/// `error_len > 0`. A partially extracted archive is an error; the message
/// names the first failed file.
///
/// # Safety
///
/// - `archive` and `destination` must be null or valid NUL-terminated
///   UTF-8 strings.
/// - `error_buf` must be null or valid for writes of `error_len` bytes.
#[allow(unsafe_code)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn extract_archive(
    archive: *const c_char,
    destination: *const c_char,
    error_buf: *mut c_char,
    error_len: c_uint,
) -> c_int {
    // SAFETY: the caller upholds the pointer contracts documented above.
    let outcome = catch_unwind(AssertUnwindSafe(|| unsafe { run(archive, destination) }));

    let message = match outcome {
        Ok(Ok(())) => return 0,
        Ok(Err(message)) => message,
        Err(_) => "internal error: extraction panicked".to_string(),
    };

    error!(%message, "extract_archive failed");
    // SAFETY: `error_buf` is valid for `error_len` bytes per the contract.
    unsafe { write_message(&message, error_buf, error_len) }
}

#[allow(unsafe_code)]
unsafe fn run(archive: *const c_char, destination: *const c_char) -> Result<(), String> {
    // SAFETY: forwarded from `extract_archive`.
    let archive = unsafe { path_arg(archive, "archive") }?;
    // SAFETY: forwarded from `extract_archive`.
    let destination = unsafe { path_arg(destination, "destination") }?;

    let config = ExtractionConfig::confirmed();
    let report = bsarc_core::extract_archive(&archive, &destination, &config)
        .map_err(|err| format!("{}: {err}", archive.display()))?;

    if report.success() {
        Ok(())
    } else {
        Err(format!("{}: {}", archive.display(), report.summary()))
    }
}

#[allow(unsafe_code)]
unsafe fn path_arg(ptr: *const c_char, name: &str) -> Result<PathBuf, String> {
    if ptr.is_null() {
        return Err(format!("{name} path is null"));
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str()
        .map(PathBuf::from)
        .map_err(|_| format!("{name} path is not valid UTF-8"))
}

/// Copies `message` into `buf`, truncating and NUL-terminating.
///
/// Returns the size the full message needs.
#[allow(unsafe_code)]
unsafe fn write_message(message: &str, buf: *mut c_char, len: c_uint) -> c_int {
    let bytes = message.as_bytes();
    let capacity = len as usize;

    if !buf.is_null() && capacity > 0 {
        let copied = bytes.len().min(capacity - 1);
        // SAFETY: `buf` is valid for `capacity` bytes and `copied < capacity`.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buf, copied);
            *buf.add(copied) = 0;
        }
    }

    c_int::try_from(bytes.len() + 1).unwrap_or(c_int::MAX)
}
