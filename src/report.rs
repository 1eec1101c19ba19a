//! Census report formatting and printing.
//!
//! Separate from core logic so lexsync can be used as a library. Output
//! is cargo-style: one block per finding, a summary line at the end.

use std::io::{self, Write};

use colored::Colorize;

use crate::census::CensusReport;

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

/// Maximum call-sites shown per undefined text.
const MAX_SITES_DISPLAY: usize = 3;

/// Print the census findings to stdout.
pub fn print_census(report: &CensusReport) {
    print_census_to(report, &mut io::stdout().lock());
}

pub fn print_census_to<W: Write>(report: &CensusReport, writer: &mut W) {
    if !report.has_findings() {
        let _ = writeln!(
            writer,
            "{} {}",
            SUCCESS_MARK.green(),
            format!(
                "Checked {} source {} - dictionaries in sync",
                report.scanned_files,
                if report.scanned_files == 1 {
                    "file"
                } else {
                    "files"
                }
            )
            .green()
        );
        return;
    }

    let mut errors = 0;
    let mut warnings = 0;

    for entry in &report.undefined {
        errors += 1;
        let _ = writeln!(
            writer,
            "{}: \"{}\"  {}",
            "error".bold().red(),
            entry.info.text,
            "undefined-text".dimmed().cyan()
        );
        let _ = writeln!(
            writer,
            "  {} {}:{}",
            "-->".blue(),
            entry.file.display(),
            entry.range.start
        );
        let _ = writeln!(writer);
    }

    for key in &report.unused {
        warnings += 1;
        let _ = writeln!(
            writer,
            "{}: \"{}\"  {}",
            "warning".bold().yellow(),
            key,
            "unused-key".dimmed().cyan()
        );
        let sites = report.used.get(key).map(Vec::as_slice).unwrap_or(&[]);
        print_sites(sites, writer);
        let _ = writeln!(writer);
    }

    for (lang, keys) in &report.lack {
        for key in keys {
            warnings += 1;
            let _ = writeln!(
                writer,
                "{}: \"{}\" has no value in {}  {}",
                "warning".bold().yellow(),
                key,
                lang,
                "lacking-value".dimmed().cyan()
            );
        }
    }
    for (lang, keys) in &report.extra {
        for key in keys {
            warnings += 1;
            let _ = writeln!(
                writer,
                "{}: \"{}\" exists only in {}  {}",
                "warning".bold().yellow(),
                key,
                lang,
                "extra-key".dimmed().cyan()
            );
        }
    }

    let total = errors + warnings;
    let _ = writeln!(
        writer,
        "\n{} {} problems ({} {}, {} {})",
        FAILURE_MARK.red(),
        total,
        errors,
        if errors == 1 { "error" } else { "errors" }.red(),
        warnings,
        if warnings == 1 { "warning" } else { "warnings" }.yellow()
    );
}

fn print_sites<W: Write>(sites: &[crate::census::Occurrence], writer: &mut W) {
    let total = sites.len();
    for (i, site) in sites.iter().take(MAX_SITES_DISPLAY).enumerate() {
        let remaining = total.saturating_sub(MAX_SITES_DISPLAY);
        let suffix = if i + 1 == MAX_SITES_DISPLAY.min(total) && remaining > 0 {
            format!(" (and {} more)", remaining)
        } else {
            String::new()
        };
        let _ = writeln!(
            writer,
            "  {} {}:{}{}",
            "-->".blue(),
            site.file.display(),
            site.range.start,
            suffix
        );
    }
}

/// Print a warning about language files that could not be parsed.
pub fn print_load_warnings(warnings: &[String], verbose: bool) {
    print_load_warnings_to(warnings, verbose, &mut io::stderr().lock());
}

pub fn print_load_warnings_to<W: Write>(warnings: &[String], verbose: bool, writer: &mut W) {
    if warnings.is_empty() {
        return;
    }
    if verbose {
        for warning in warnings {
            let _ = writeln!(writer, "{} {}", "warning:".bold().yellow(), warning);
        }
    } else {
        let _ = writeln!(
            writer,
            "{} {} language file issue(s) found (use {} for details)",
            "warning:".bold().yellow(),
            warnings.len(),
            "-v".cyan()
        );
    }
}
