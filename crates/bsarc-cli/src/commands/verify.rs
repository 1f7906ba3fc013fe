//! Verify command implementation

use super::run_with_progress;
use crate::cli::VerifyArgs;
use crate::error::add_archive_context;
use crate::error::report_failures;
use crate::output::OutputFormatter;
use anyhow::Result;
use bsarc_core::verify_archive_with_progress;

pub fn execute(args: &VerifyArgs, formatter: &dyn OutputFormatter, show_progress: bool) -> Result<()> {
    let config = args.limits.config(false);

    let report = run_with_progress(&args.archive, show_progress, |progress| {
        add_archive_context(
            verify_archive_with_progress(&args.archive, &config, progress),
            &args.archive,
        )
    })?;

    formatter.format_verification_report(&args.archive, &report)?;

    report_failures(&report, &args.archive)
}
