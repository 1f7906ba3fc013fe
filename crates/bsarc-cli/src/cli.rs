//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bsarc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract archive contents
    Extract(ExtractArgs),
    /// List archive contents without extraction
    List(ListArgs),
    /// Decode every file without writing anything
    Verify(VerifyArgs),
    /// Find and extract the archives of a mod directory
    Scan(ScanArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

/// Limits shared by every command that decodes files.
#[derive(clap::Args, Clone, Copy)]
pub struct LimitArgs {
    /// Maximum number of files per archive
    #[arg(long, default_value = "1000000")]
    pub max_files: usize,

    /// Maximum total extracted size per archive (e.g. 64G)
    #[arg(long, value_parser = parse_byte_size)]
    pub max_total_size: Option<u64>,

    /// Maximum single file size (e.g. 4G)
    #[arg(long, value_parser = parse_byte_size)]
    pub max_file_size: Option<u64>,

    /// Decode files one at a time instead of in parallel
    #[arg(long)]
    pub sequential: bool,
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Archives to extract (.bsa or .ba2)
    #[arg(value_name = "ARCHIVE", required = true)]
    pub archives: Vec<PathBuf>,

    /// Output directory (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Extract into a non-empty directory and overwrite existing files
    #[arg(short, long)]
    pub force: bool,

    /// Delete each archive that extracted without failures
    #[arg(long)]
    pub delete_archives: bool,

    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Show sizes and compression for every file
    #[arg(short, long)]
    pub long: bool,

    /// Show sizes in human-readable format
    #[arg(short = 'H', long)]
    pub human_readable: bool,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(clap::Args)]
pub struct ScanArgs {
    /// Mod directory to search
    #[arg(value_name = "MOD_DIR")]
    pub mod_dir: PathBuf,

    /// Game the mod belongs to (e.g. "Skyrim Special Edition", "Fallout 4")
    #[arg(short, long)]
    pub game: String,

    /// Extract every archive found next to itself, overwriting loose files
    /// the mod already ships
    #[arg(short, long)]
    pub extract: bool,

    /// Delete each archive that extracted without failures
    #[arg(long, requires = "extract")]
    pub delete_archives: bool,

    /// Leave existing loose files alone; the archives they clash with are
    /// reported as failed and kept
    #[arg(long, requires = "extract")]
    pub keep_existing: bool,

    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('T') {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix('G') {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix('M') {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix('K') {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(parse_byte_size("100").unwrap(), 100);
        assert_eq!(parse_byte_size("1K").unwrap(), 1024);
        assert_eq!(parse_byte_size("2M").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_byte_size("4G").unwrap(), 4 * 1024 * 1024 * 1024);
        assert_eq!(parse_byte_size("1T").unwrap(), 1024_u64.pow(4));
        assert!(parse_byte_size("invalid").is_err());
        assert!(parse_byte_size("").is_err());
    }

    #[test]
    fn test_parse_byte_size_overflow() {
        assert!(parse_byte_size("18446744073709551615K").is_err());
        assert!(parse_byte_size("17592186044416G").is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_accepts_many_archives() {
        let cli = Cli::try_parse_from(["bsarc", "extract", "a.bsa", "b.ba2", "-o", "out", "--sequential"]).unwrap();
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(args.archives.len(), 2);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert!(args.limits.sequential);
        assert!(!args.force);
    }

    #[test]
    fn test_scan_keep_existing_requires_extract() {
        assert!(Cli::try_parse_from(["bsarc", "scan", "mod", "--game", "Skyrim", "--keep-existing"]).is_err());
        let cli = Cli::try_parse_from(["bsarc", "scan", "mod", "-g", "Skyrim", "-e", "--keep-existing"]).unwrap();
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert!(args.extract);
        assert!(args.keep_existing);
    }

    #[test]
    fn test_scan_delete_requires_extract() {
        assert!(Cli::try_parse_from(["bsarc", "scan", "mod", "--game", "Skyrim", "--delete-archives"]).is_err());
        assert!(
            Cli::try_parse_from(["bsarc", "scan", "mod", "--game", "Skyrim", "--extract", "--delete-archives"]).is_ok()
        );
    }
}
