//! List command implementation

use crate::cli::ListArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use bsarc_core::ExtractionConfig;
use bsarc_core::list_archive;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = ExtractionConfig::default();

    let manifest = add_archive_context(list_archive(&args.archive, &config), &args.archive)?;

    if args.long {
        formatter.format_manifest_long(&manifest, args.human_readable)?;
    } else {
        formatter.format_manifest_short(&manifest)?;
    }

    Ok(())
}
