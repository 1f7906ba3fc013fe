//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use bsarc_core::ArchiveManifest;
use bsarc_core::ExtractionReport;
use bsarc_core::formats::ArchiveExtension;
use console::Term;
use console::style;
use std::path::Path;
use std::path::PathBuf;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err_term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err_term: Term::stderr(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn headline(&self, ok: bool, text: &str) {
        let line = match (self.use_colors, ok) {
            (true, true) => format!("{} {text}", style("✓").green().bold()),
            (true, false) => format!("{} {text}", style("✗").red().bold()),
            (false, _) => text.to_string(),
        };
        let _ = self.term.write_line(&line);
    }

    fn write_report(&self, report: &ExtractionReport, verb: &str) {
        let _ = self.term.write_line(&format!(
            "  Files {verb}: {} of {}",
            Self::format_number(report.files_extracted),
            Self::format_number(report.files_total)
        ));
        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            Self::format_size(report.bytes_written)
        ));
        if self.verbose
            && let Some(kind) = report.kind
        {
            let _ = self.term.write_line(&format!("  Format: {kind}"));
        }
        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", report.duration));
        }
        if !report.success() {
            let _ = self.term.write_line(&format!(
                "  Failed: {}",
                Self::format_number(report.files_failed())
            ));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(&self, archive: &Path, report: &ExtractionReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if report.success() {
            self.headline(true, &format!("Extraction complete: {}", archive.display()));
        } else {
            self.headline(false, &format!("Extraction incomplete: {}", archive.display()));
        }
        self.write_report(report, "extracted");

        Ok(())
    }

    fn format_manifest_short(&self, manifest: &ArchiveManifest) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for entry in &manifest.entries {
            let _ = self.term.write_line(&format!("{}", entry.path.display()));
        }

        Ok(())
    }

    fn format_manifest_long(&self, manifest: &ArchiveManifest, human_readable: bool) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let size = |bytes: u64| {
            if human_readable {
                Self::format_size(bytes)
            } else {
                bytes.to_string()
            }
        };

        let _ = self.term.write_line(&format!(
            "{} version {} ({})",
            manifest.kind, manifest.version, manifest.codec
        ));

        for entry in &manifest.entries {
            let size_str = entry.size.map_or_else(|| "?".to_string(), size);
            let flag = if entry.compressed { "c" } else { "-" };

            let _ = self.term.write_line(&format!(
                "{flag} {:>10} {:>10}  {}",
                size_str,
                size(entry.stored_size),
                entry.path.display()
            ));
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Total: {} files, {} ({} stored)",
            Self::format_number(manifest.total_entries),
            Self::format_size(manifest.total_size),
            Self::format_size(manifest.total_stored_size)
        ));
        let unknown = manifest.unknown_sizes();
        if unknown > 0 {
            let _ = self.term.write_line(&format!(
                "{} files only reveal their size when decoded",
                Self::format_number(unknown)
            ));
        }

        Ok(())
    }

    fn format_verification_report(&self, archive: &Path, report: &ExtractionReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let status = if report.success() { "PASSED" } else { "FAILED" };
        self.headline(
            report.success(),
            &format!("Archive verification {status}: {}", archive.display()),
        );
        self.write_report(report, "decoded");

        Ok(())
    }

    fn format_scan_result(&self, mod_dir: &Path, extension: ArchiveExtension, archives: &[PathBuf]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let _ = self.term.write_line(&format!(
            "Found {} .{} archives in {}",
            Self::format_number(archives.len()),
            extension.as_str(),
            mod_dir.display()
        ));
        for archive in archives {
            let shown = archive.strip_prefix(mod_dir).unwrap_or(archive);
            let _ = self.term.write_line(&format!("  {}", shown.display()));
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        if self.use_colors {
            let _ = self
                .err_term
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.err_term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_success(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(message);
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(HumanFormatter::format_size(0), "0 B");
        assert_eq!(HumanFormatter::format_size(512), "512 B");
        assert_eq!(HumanFormatter::format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(HumanFormatter::format_size(1536), "1.5 KB");
        assert_eq!(HumanFormatter::format_size(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(HumanFormatter::format_size(1536 * 1024 * 1024), "1.5 GB");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(HumanFormatter::format_number(0), "0");
        assert_eq!(HumanFormatter::format_number(999), "999");
        assert_eq!(HumanFormatter::format_number(1000), "1,000");
        assert_eq!(HumanFormatter::format_number(1_234_567), "1,234,567");
    }
}
