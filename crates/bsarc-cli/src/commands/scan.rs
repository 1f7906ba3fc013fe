//! Scan command implementation.
//!
//! Looks for the archives a mod ships and optionally unpacks each one into
//! the directory that contains it, the layout the game loads loose files
//! from. Asking for extraction is the confirmation: loose files already in
//! the mod are overwritten unless `--keep-existing` is given.

use std::path::Path;
use std::path::PathBuf;

use super::BatchOptions;
use super::extract_batch;
use crate::cli::ScanArgs;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use bsarc_core::formats::ArchiveExtension;
use tracing::debug;
use walkdir::WalkDir;

pub fn execute(args: &ScanArgs, formatter: &dyn OutputFormatter, show_progress: bool) -> Result<()> {
    let extension = ArchiveExtension::for_game(&args.game).ok_or_else(|| {
        anyhow!(
            "Unknown game '{}'\n\
             HINT: Known games: Morrowind, Oblivion, Fallout 3, New Vegas, Skyrim, \
             Skyrim Special Edition, Skyrim VR, Enderal, TTW, Fallout 4, Fallout 4 VR",
            args.game
        )
    })?;

    let archives = find_archives(&args.mod_dir, extension)?;
    formatter.format_scan_result(&args.mod_dir, extension, &archives)?;

    if archives.is_empty() {
        formatter.format_warning(&format!(
            "No .{} archives found in {}",
            extension.as_str(),
            args.mod_dir.display()
        ));
        return Ok(());
    }

    if !args.extract {
        return Ok(());
    }

    let options = BatchOptions {
        config: args.limits.config(!args.keep_existing),
        delete_archives: args.delete_archives,
        show_progress,
        formatter,
    };
    let mod_dir = args.mod_dir.clone();
    extract_batch(
        &archives,
        |archive| archive.parent().map_or_else(|| mod_dir.clone(), Path::to_path_buf),
        &options,
    )
}

/// Archives with `extension` below `root`, sorted by path.
pub fn find_archives(root: &Path, extension: ArchiveExtension) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to scan {}", root.display()))?;
        if entry.file_type().is_file() && extension.matches(entry.path()) {
            debug!(path = %entry.path().display(), "found archive");
            archives.push(entry.into_path());
        }
    }
    archives.sort();
    Ok(archives)
}
