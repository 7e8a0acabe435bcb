use crate::config::FoldingConfig;
use crate::document::Document;
use crate::models::{FoldingRange, FoldingRangeKind, RenderedFile};
use crate::workspace::FoldingEngine;
use std::io::Write;
use std::path::Path;
use termcolor::{Buffer, Color, ColorSpec, WriteColor};

use super::scanner::ScanError;

/// Renders documents the way an editor shows them with some ranges collapsed
#[derive(Debug, Clone, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Render `document` with each outermost range of `folded` collapsed, returning plain text
    pub fn render(&self, document: &Document, folded: &[FoldingRange]) -> String {
        let mut out = String::new();
        for (index, segment) in self.segments(document, folded).into_iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&segment.prefix);
            if let Some(range) = segment.folded {
                out.push_str(&range.collapsed_text);
            }
        }
        out
    }

    /// Render with ANSI colors, the collapsed text tinted by range kind
    pub fn render_ansi(&self, document: &Document, folded: &[FoldingRange]) -> std::io::Result<String> {
        let mut buffer = Buffer::ansi();
        for (index, segment) in self.segments(document, folded).into_iter().enumerate() {
            if index > 0 {
                writeln!(buffer)?;
            }
            write!(buffer, "{}", segment.prefix)?;
            if let Some(range) = segment.folded {
                buffer.set_color(ColorSpec::new().set_fg(Some(kind_color(range.kind))).set_dimmed(true))?;
                write!(buffer, "{}", range.collapsed_text)?;
                buffer.reset()?;
            }
        }
        Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
    }

    fn segments<'r>(&self, document: &Document, folded: &'r [FoldingRange]) -> Vec<Segment<'r>> {
        let mut starts = outermost(folded).into_iter().peekable();
        let mut segments = Vec::new();
        let mut line = 0;

        while line < document.line_count() {
            while starts.peek().is_some_and(|range| range.start_line < line) {
                starts.next();
            }
            let text = document.line(line);
            match starts.next_if(|range| range.start_line == line) {
                Some(range) => {
                    let column = range.start_column.unwrap_or(usize::MAX);
                    segments.push(Segment {
                        prefix: text.chars().take(column).collect(),
                        folded: Some(range),
                    });
                    line = range.end_line + 1;
                }
                None => {
                    segments.push(Segment {
                        prefix: text,
                        folded: None,
                    });
                    line += 1;
                }
            }
        }
        segments
    }
}

struct Segment<'r> {
    prefix: String,
    folded: Option<&'r FoldingRange>,
}

/// Ranges not hidden inside another one, ordered by start line
fn outermost(ranges: &[FoldingRange]) -> Vec<&FoldingRange> {
    let mut ordered: Vec<&FoldingRange> = ranges
        .iter()
        .filter(|range| range.start_line < range.end_line)
        .collect();
    ordered.sort_by_key(|range| (range.start_line, std::cmp::Reverse(range.end_line)));

    let mut kept: Vec<&FoldingRange> = Vec::new();
    for range in ordered {
        if kept.last().is_some_and(|last| range.start_line <= last.end_line) {
            continue;
        }
        kept.push(range);
    }
    kept
}

fn kind_color(kind: Option<FoldingRangeKind>) -> Color {
    match kind {
        None => Color::Cyan,
        Some(FoldingRangeKind::Region) => Color::Green,
        Some(FoldingRangeKind::Markup) => Color::Magenta,
    }
}

/// Compute a file's ranges and render it with the ranges starting on `fold_lines`
/// collapsed, or every outermost range when `fold_lines` is empty.
pub fn render_file(
    path: &Path,
    config: &FoldingConfig,
    fold_lines: &[usize],
    ansi: bool,
) -> Result<RenderedFile, ScanError> {
    let content = std::fs::read_to_string(path)?;
    let language = super::scanner::detect_language(path)?;

    let mut engine = FoldingEngine::new(config.clone())?;
    let id = crate::document::DocumentId::new(path.to_string_lossy());
    engine.open_document(id.clone(), language, &content);
    let ranges = engine.folding_ranges(&id)?.to_vec();

    let folded: Vec<FoldingRange> = if fold_lines.is_empty() {
        outermost(&ranges).into_iter().cloned().collect()
    } else {
        ranges
            .into_iter()
            .filter(|range| fold_lines.contains(&range.start_line))
            .collect()
    };

    let Some(document) = engine.document(&id) else {
        return Err(ScanError::UnknownDocument(id));
    };
    let renderer = Renderer::new();
    let content = if ansi {
        renderer.render_ansi(document, &folded)?
    } else {
        renderer.render(document, &folded)
    };
    let applied = outermost(&folded);

    Ok(RenderedFile {
        path: path.to_path_buf(),
        content,
        fold_count: applied.len(),
        lines_hidden: applied.iter().map(|range| range.hidden_lines()).sum(),
    })
}
