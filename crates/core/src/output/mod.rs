mod json;
mod yaml;

pub use json::{to_json, to_json_compact};
pub use yaml::to_yaml;

use crate::models::{DocumentRanges, FoldMap, FoldingRange};
use std::fmt::Write;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Summary,
    Ansi,
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML serialization error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Formatting error: {0}")]
    FmtError(#[from] std::fmt::Error),
}

/// Escape codes used by the summaries; all empty for plain output
struct Palette {
    bold: &'static str,
    dim: &'static str,
    cyan: &'static str,
    yellow: &'static str,
    reset: &'static str,
}

const PLAIN: Palette = Palette {
    bold: "",
    dim: "",
    cyan: "",
    yellow: "",
    reset: "",
};

const ANSI: Palette = Palette {
    bold: "\x1b[1m",
    dim: "\x1b[2m",
    cyan: "\x1b[36m",
    yellow: "\x1b[33m",
    reset: "\x1b[0m",
};

/// Format a FoldMap according to the specified format
pub fn format_output(fold_map: &FoldMap, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(fold_map),
        OutputFormat::Yaml => to_yaml(fold_map),
        OutputFormat::Summary => summary(fold_map, &PLAIN),
        OutputFormat::Ansi => summary(fold_map, &ANSI),
    }
}

/// Generate a human-readable summary
pub fn format_summary(fold_map: &FoldMap) -> Result<String, FormatError> {
    summary(fold_map, &PLAIN)
}

/// Format the ranges of a single document
pub fn format_ranges(listing: &DocumentRanges, format: OutputFormat) -> Result<String, FormatError> {
    match format {
        OutputFormat::Json => to_json(listing),
        OutputFormat::Yaml => to_yaml(listing),
        OutputFormat::Summary => range_table(listing, &PLAIN),
        OutputFormat::Ansi => range_table(listing, &ANSI),
    }
}

fn summary(fold_map: &FoldMap, p: &Palette) -> Result<String, FormatError> {
    let stats = &fold_map.stats;
    let mut out = String::new();

    writeln!(out, "{}{}Folding Range Summary{}", p.bold, p.cyan, p.reset)?;
    writeln!(out, "{}====================={}", p.cyan, p.reset)?;
    writeln!(out, "{}Root:{} {}\n", p.dim, p.reset, fold_map.root.display())?;

    writeln!(
        out,
        "{}Files Scanned:{} {} (JavaScript: {}, TypeScript: {}, Python: {}, JSON: {}, other: {})",
        p.dim,
        p.reset,
        stats.total_files,
        stats.javascript_files,
        stats.typescript_files,
        stats.python_files,
        stats.json_files,
        stats.other_files
    )?;

    let foldable = if stats.total_lines > 0 {
        (stats.foldable_lines as f64 / stats.total_lines as f64) * 100.0
    } else {
        0.0
    };
    writeln!(
        out,
        "{}Total Lines:{} {} | {}Foldable Lines:{} {} ({:.1}%)\n",
        p.dim, p.reset, stats.total_lines, p.dim, p.reset, stats.foldable_lines, foldable
    )?;

    writeln!(
        out,
        "{}Total Ranges:{} {} (brackets: {}, regions: {}, markup: {})",
        p.dim, p.reset, stats.total_ranges, stats.bracket_ranges, stats.region_ranges, stats.markup_ranges
    )?;

    let mut busiest: Vec<_> = fold_map.files.iter().filter(|f| !f.ranges.is_empty()).collect();
    busiest.sort_by(|a, b| b.ranges.len().cmp(&a.ranges.len()));
    if !busiest.is_empty() {
        writeln!(out, "{}Top files by ranges:{}", p.dim, p.reset)?;
        for file in busiest.iter().take(5) {
            writeln!(
                out,
                "  {}{}{} ({} ranges, {} lines)",
                p.yellow,
                file.path.display(),
                p.reset,
                file.ranges.len(),
                file.line_count
            )?;
        }
    }

    let failed: Vec<_> = fold_map.files.iter().filter(|f| !f.parsed).collect();
    if !failed.is_empty() {
        writeln!(out, "{}Unreadable files:{}", p.dim, p.reset)?;
        for file in failed {
            writeln!(
                out,
                "  {} ({})",
                file.path.display(),
                file.error.as_deref().unwrap_or("unknown error")
            )?;
        }
    }
    out.push('\n');

    writeln!(
        out,
        "{}Scan Duration:{} {}ms ({:.2} files/sec)",
        p.dim, p.reset, fold_map.metadata.scan_duration_ms, fold_map.metadata.files_per_second
    )?;
    writeln!(out, "{}Timestamp:{} {}", p.dim, p.reset, fold_map.metadata.timestamp)?;
    writeln!(out, "{}Tool Version:{} {}", p.dim, p.reset, fold_map.metadata.tool_version)?;
    Ok(out)
}

fn range_table(listing: &DocumentRanges, p: &Palette) -> Result<String, FormatError> {
    let mut out = String::new();
    writeln!(
        out,
        "{}{}{} ({}, {} lines, {} ranges)",
        p.bold,
        listing.path.display(),
        p.reset,
        listing.language.as_str(),
        listing.line_count,
        listing.ranges.len()
    )?;
    for range in &listing.ranges {
        writeln!(out, "  {}", describe_range(range, p))?;
    }
    Ok(out)
}

fn describe_range(range: &FoldingRange, p: &Palette) -> String {
    let column = range
        .start_column
        .map(|column| format!(":{}", column))
        .unwrap_or_default();
    let kind = range
        .kind
        .map(|kind| format!(" [{}]", kind.as_str()))
        .unwrap_or_default();
    format!(
        "{}{}{}-{}{} {}{}{}{}",
        p.dim,
        range.start_line + 1,
        column,
        range.end_line + 1,
        p.reset,
        p.cyan,
        range.collapsed_text,
        p.reset,
        kind
    )
}
