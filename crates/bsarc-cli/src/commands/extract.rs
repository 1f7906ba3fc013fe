//! Extract command implementation.

use super::BatchOptions;
use super::extract_batch;
use super::is_empty_dir;
use crate::cli::ExtractArgs;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use std::env;

pub fn execute(args: &ExtractArgs, formatter: &dyn OutputFormatter, show_progress: bool) -> Result<()> {
    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to get current directory")?,
    };

    if !args.force && !is_empty_dir(&output_dir)? {
        bail!(
            "Output directory '{}' is not empty\n\
             HINT: Use --force to extract into it and overwrite existing files.",
            output_dir.display()
        );
    }

    let options = BatchOptions {
        config: args.limits.config(args.force),
        delete_archives: args.delete_archives,
        show_progress,
        formatter,
    };

    extract_batch(&args.archives, |_| output_dir.clone(), &options)
}
