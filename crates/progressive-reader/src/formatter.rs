//! Text rendering of chunks and outlines for terminal or LLM consumption.

use crate::types::{BoundaryTable, Chunk, DeclarationBoundary};
use std::fmt::Write as _;
use unicode_segmentation::UnicodeSegmentation;

/// Inner width of the boxed header and footer, in graphemes
pub const DEFAULT_BOX_WIDTH: usize = 53;

/// What to show around a rendered chunk
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Display path (or document name)
    pub path: Option<String>,
    /// Total number of chunks, when the caller has counted them
    pub total_chunks: Option<usize>,
    /// Declaration the chunk opens with, or the one it continues
    pub declaration: Option<DeclarationBoundary>,
    /// Short description from [`crate::summarizer::chunk_context`]
    pub context: Option<String>,
    /// Continuation token to print in the footer
    pub token: Option<String>,
    pub show_line_numbers: bool,
    pub width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            path: None,
            total_chunks: None,
            declaration: None,
            context: None,
            token: None,
            show_line_numbers: true,
            width: DEFAULT_BOX_WIDTH,
        }
    }
}

impl RenderOptions {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn line_numbers(mut self, enabled: bool) -> Self {
        self.show_line_numbers = enabled;
        self
    }
}

/// Render a chunk with a header box, its (numbered) lines and a footer
#[must_use]
pub fn render_chunk(chunk: &Chunk, options: &RenderOptions) -> String {
    let width = options.width.max(20);
    let mut out = String::new();

    let title = match options.total_chunks {
        Some(total) => format!("Chunk {}/{total}", chunk.sequence + 1),
        None => format!("Chunk {}", chunk.sequence + 1),
    };
    box_top(&mut out, &title, width);
    if let Some(path) = &options.path {
        box_row(&mut out, &format!("File: {path}"), width);
    }
    box_row(
        &mut out,
        &format!("Lines: {}-{}", chunk.start_line, chunk.end_line),
        width,
    );
    if let Some(declaration) = &options.declaration {
        let prefix = if chunk.contains_line(declaration.start_line) {
            ""
        } else {
            "(cont.) "
        };
        box_row(
            &mut out,
            &format!("Declaration: {prefix}{}", declaration.label()),
            width,
        );
    }
    if let Some(context) = &options.context {
        box_row(&mut out, &format!("Context: {context}"), width);
    }
    box_bottom(&mut out, width);
    out.push('\n');

    if options.show_line_numbers {
        for (line_no, line) in (chunk.start_line..).zip(chunk.text.split_inclusive('\n')) {
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            let _ = writeln!(out, "{line_no:6}  {line}");
        }
    } else {
        out.push_str(&chunk.text);
        if !chunk.text.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push('\n');

    box_top(&mut out, "", width);
    if chunk.is_final {
        box_row(&mut out, "End of file", width);
    } else {
        box_row(&mut out, "More content available", width);
        if let Some(token) = &options.token {
            box_row(&mut out, "Continue with token:", width);
            // Tokens are ASCII; wrap instead of truncating so they stay usable
            for piece in token.as_bytes().chunks(width - 2) {
                box_row(&mut out, &String::from_utf8_lossy(piece), width);
            }
        }
    }
    box_bottom(&mut out, width);
    out
}

/// Indented declaration listing of a boundary table
#[must_use]
pub fn render_outline(table: &BoundaryTable, path: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "File: {path}");
    let _ = writeln!(out, "Declarations: {}", table.len());

    let diagnostics = table.diagnostics();
    if diagnostics.is_malformed() {
        let _ = writeln!(
            out,
            "Warning: approximate structure ({} unbalanced delimiters, {} unterminated declarations, {} unterminated literals)",
            diagnostics.unbalanced_delimiters,
            diagnostics.unterminated_declarations,
            diagnostics.unterminated_literals
        );
    }
    out.push('\n');

    for boundary in table.iter() {
        let range = format!("{}-{}", boundary.start_line, boundary.end_line);
        let _ = write!(
            out,
            "{range:>13}  {}{}",
            "  ".repeat(boundary.depth),
            boundary.label()
        );
        if !boundary.terminated {
            out.push_str(" (unterminated)");
        }
        out.push('\n');
    }
    out
}

/// Truncate to at most `max` graphemes, marking the cut with "..."
#[must_use]
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    if text.graphemes(true).count() <= max {
        return text.to_string();
    }
    let kept: String = text.graphemes(true).take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn box_top(out: &mut String, title: &str, width: usize) {
    out.push('┌');
    if title.is_empty() {
        out.push_str(&"─".repeat(width));
    } else {
        let title = truncate_graphemes(title, width.saturating_sub(4));
        let used = title.graphemes(true).count() + 3;
        let _ = write!(out, "─ {title} {}", "─".repeat(width.saturating_sub(used)));
    }
    out.push_str("┐\n");
}

fn box_row(out: &mut String, text: &str, width: usize) {
    let inner = width - 2;
    let text = truncate_graphemes(text, inner);
    let pad = inner.saturating_sub(text.graphemes(true).count());
    let _ = writeln!(out, "│ {text}{} │", " ".repeat(pad));
}

fn box_bottom(out: &mut String, width: usize) {
    let _ = writeln!(out, "└{}┘", "─".repeat(width));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeclarationKind, ScanDiagnostics};
    use pretty_assertions::assert_eq;

    fn chunk(is_final: bool) -> Chunk {
        Chunk {
            sequence: 1,
            start_line: 9,
            end_line: 11,
            text: "class Auth {\r\n  login() {}\n}\n".to_string(),
            is_final,
        }
    }

    fn class(start_line: usize) -> DeclarationBoundary {
        DeclarationBoundary {
            kind: DeclarationKind::Class,
            name: Some("Auth".to_string()),
            start_line,
            end_line: 11,
            depth: 0,
            terminated: true,
        }
    }

    fn box_lines(rendered: &str) -> Vec<&str> {
        rendered
            .lines()
            .filter(|l| l.starts_with(['┌', '│', '└']))
            .collect()
    }

    #[test]
    fn renders_header_content_and_footer() {
        let options = RenderOptions {
            total_chunks: Some(4),
            declaration: Some(class(9)),
            context: Some("Handles login".to_string()),
            ..RenderOptions::default().path("src/auth.ts").token("abc_DEF")
        };
        let rendered = render_chunk(&chunk(false), &options);

        assert!(rendered.starts_with("┌─ Chunk 2/4 ─"));
        assert!(rendered.contains("│ File: src/auth.ts "));
        assert!(rendered.contains("│ Lines: 9-11 "));
        assert!(rendered.contains("│ Declaration: class Auth "));
        assert!(rendered.contains("│ Context: Handles login "));
        assert!(rendered.contains("     9  class Auth {\n    10    login() {}\n    11  }\n"));
        assert!(rendered.contains("More content available"));
        assert!(rendered.contains("│ abc_DEF "));
        assert!(!rendered.contains('\r'));

        for line in box_lines(&rendered) {
            assert_eq!(line.graphemes(true).count(), DEFAULT_BOX_WIDTH + 2, "{line}");
        }
    }

    #[test]
    fn final_chunk_says_end_of_file() {
        let rendered = render_chunk(&chunk(true), &RenderOptions::default());
        assert!(rendered.starts_with("┌─ Chunk 2 ─"));
        assert!(rendered.contains("End of file"));
        assert!(!rendered.contains("More content"));
    }

    #[test]
    fn continued_declaration_is_marked() {
        let options = RenderOptions {
            declaration: Some(class(1)),
            ..RenderOptions::default()
        };
        let rendered = render_chunk(&chunk(false), &options);
        assert!(rendered.contains("Declaration: (cont.) class Auth"));
    }

    #[test]
    fn raw_content_without_line_numbers() {
        let rendered = render_chunk(&chunk(true), &RenderOptions::default().line_numbers(false));
        assert!(rendered.contains("\n\nclass Auth {\r\n  login() {}\n}\n\n"));
    }

    #[test]
    fn long_rows_are_truncated_on_grapheme_boundaries() {
        let path = "src/".to_string() + &"e\u{301}".repeat(80);
        let rendered = render_chunk(&chunk(true), &RenderOptions::default().path(path));
        let row = rendered.lines().find(|l| l.contains("File:")).unwrap();
        assert!(row.ends_with("... │"));
        assert_eq!(row.graphemes(true).count(), DEFAULT_BOX_WIDTH + 2);
        assert!(row.contains("e\u{301}..."));
    }

    #[test]
    fn truncation_keeps_short_text() {
        assert_eq!(truncate_graphemes("short", 10), "short");
        assert_eq!(truncate_graphemes("abcdefghij", 6), "abc...");
    }

    #[test]
    fn outline_lists_nested_declarations() {
        let table = BoundaryTable::new(
            vec![
                class(1),
                DeclarationBoundary {
                    kind: DeclarationKind::Method,
                    name: Some("login".to_string()),
                    start_line: 2,
                    end_line: 4,
                    depth: 1,
                    terminated: false,
                },
            ],
            ScanDiagnostics {
                unterminated_declarations: 1,
                ..ScanDiagnostics::default()
            },
        );
        let outline = render_outline(&table, "src/auth.ts");
        assert_eq!(
            outline,
            "File: src/auth.ts\n\
             Declarations: 2\n\
             Warning: approximate structure (0 unbalanced delimiters, 1 unterminated declarations, 0 unterminated literals)\n\
             \n         1-11  class Auth\n\
             \x20         2-4    method login (unterminated)\n"
        );
    }
}
