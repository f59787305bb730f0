use super::lexer::{is_ident_char, LineLexer};
use super::patterns::{self, Introducer};
use super::StructuralIndexer;
use crate::document::SourceDocument;
use crate::language::{BlockStyle, Language};
use crate::types::{BoundaryTable, DeclarationBoundary, ScanDiagnostics};

/// Single linear scan over lines.
///
/// Strings and comments are masked by a [`LineLexer`] before delimiters are
/// counted. Brace languages track `{}` depth; Python and Ruby track
/// indentation (and `end` lines). Works on any text and never fails:
/// malformed input only coarsens the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicIndexer;

impl HeuristicIndexer {
    pub fn new() -> Self {
        Self
    }
}

impl StructuralIndexer for HeuristicIndexer {
    fn index(&self, document: &SourceDocument) -> BoundaryTable {
        let language = document.language();
        let table = match language.lexical_rules().block_style {
            BlockStyle::Braces => BraceScan::new(language).run(document),
            style => IndentScan::new(language, style).run(document),
        };

        log::debug!(
            "heuristic scan ({}): {} declarations over {} lines",
            language.as_str(),
            table.len(),
            document.total_lines()
        );
        table
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn open_entry(intro: Introducer, start_line: usize, depth: usize) -> DeclarationBoundary {
    DeclarationBoundary {
        kind: intro.kind,
        name: intro.name,
        start_line,
        end_line: start_line,
        depth,
        terminated: true,
    }
}

fn close_entry(entry: &mut DeclarationBoundary, end_line: usize) {
    entry.end_line = end_line.max(entry.start_line);
}

/// Trailing tokens that continue a declaration header on the next line
const CONTINUATIONS: &[&str] = &[",", "(", "=", "=>", "->", ":", "|", "&", "+", "\\", "extends", "implements"];

struct OpenBrace {
    idx: usize,
    /// Brace depth at the declaration's header
    open_depth: usize,
    body_opened: bool,
    /// Unclosed `(`/`[` in the header
    paren: i32,
}

struct BraceScan {
    language: Language,
    lexer: LineLexer,
    diagnostics: ScanDiagnostics,
    entries: Vec<DeclarationBoundary>,
    stack: Vec<OpenBrace>,
    depth: usize,
    decorator_start: Option<usize>,
    /// Last line covered by an already closed entry
    closed_through: usize,
}

impl BraceScan {
    fn new(language: Language) -> Self {
        Self {
            language,
            lexer: LineLexer::new(language.lexical_rules()),
            diagnostics: ScanDiagnostics::default(),
            entries: Vec::new(),
            stack: Vec::new(),
            depth: 0,
            decorator_start: None,
            closed_through: 0,
        }
    }

    /// Headers without a body may end at their own line (`type ID string`)
    fn closes_header_at_eol(&self) -> bool {
        matches!(
            self.language,
            Language::Go | Language::JavaScript | Language::TypeScript
        )
    }

    fn run(mut self, document: &SourceDocument) -> BoundaryTable {
        let total = document.total_lines();

        for (idx, raw) in document.lines().enumerate() {
            let line = idx + 1;
            let starts_in_code = self.lexer.at_code();
            let code = self.lexer.scan(strip_terminator(raw), &mut self.diagnostics);
            let trimmed = code.trim();

            if starts_in_code && !trimmed.is_empty() {
                self.introduce(trimmed, line);
            }
            self.count_delimiters(&code, line);

            if starts_in_code && !trimmed.is_empty() && self.closes_header_at_eol() {
                self.close_header_at_eol(trimmed, line);
            }
        }

        self.lexer.finish(&mut self.diagnostics);
        for open in std::mem::take(&mut self.stack) {
            let entry = &mut self.entries[open.idx];
            entry.end_line = total.max(entry.start_line);
            entry.terminated = false;
            self.diagnostics.unterminated_declarations += 1;
        }
        self.diagnostics.unbalanced_delimiters += self.depth;

        BoundaryTable::new(self.entries, self.diagnostics)
    }

    fn close(&mut self, idx: usize, end_line: usize) {
        close_entry(&mut self.entries[idx], end_line);
        self.closed_through = self.closed_through.max(self.entries[idx].end_line);
    }

    fn introduce(&mut self, trimmed: &str, line: usize) {
        if patterns::is_decorator(self.language, trimmed) {
            // Annotated parameters inside a header's parens are not decorators
            let in_params = self
                .stack
                .last()
                .is_some_and(|top| !top.body_opened && top.paren > 0);
            if !in_params {
                self.decorator_start.get_or_insert(line);
            }
            return;
        }

        let depth = self.depth;
        // Pending headers at this depth or deeper are abandoned by a new declaration
        let keep = self
            .stack
            .iter()
            .rposition(|open| open.body_opened || open.open_depth < depth)
            .map_or(0, |i| i + 1);
        let parent = keep.checked_sub(1).map(|i| &self.stack[i]);

        let accepted = parent.map_or(depth == 0, |p| p.body_opened && depth == p.open_depth + 1);
        let enclosing = parent.map(|p| self.entries[p.idx].kind);
        let decorator_start = self.decorator_start.take();

        if !accepted {
            return;
        }
        let Some(intro) = patterns::detect(self.language, trimmed, enclosing) else {
            return;
        };

        // Decorators never reach back into a declaration that already closed
        let start_line = decorator_start.map_or(line, |first| {
            first.max(self.closed_through + 1).min(line)
        });
        let abandoned: Vec<usize> = self.stack.drain(keep..).map(|open| open.idx).collect();
        for idx in abandoned {
            self.close(idx, start_line.saturating_sub(1));
        }

        self.entries.push(open_entry(intro, start_line, keep));
        self.stack.push(OpenBrace {
            idx: self.entries.len() - 1,
            open_depth: depth,
            body_opened: false,
            paren: 0,
        });
    }

    fn count_delimiters(&mut self, code: &str, line: usize) {
        for ch in code.chars() {
            match ch {
                '{' => {
                    self.depth += 1;
                    if let Some(top) = self.stack.last_mut() {
                        if !top.body_opened && self.depth == top.open_depth + 1 {
                            top.body_opened = true;
                        }
                    }
                }
                '}' => {
                    if self.depth == 0 {
                        self.diagnostics.unbalanced_delimiters += 1;
                        continue;
                    }
                    self.depth -= 1;
                    while let Some(top) = self.stack.last() {
                        let closes = if top.body_opened {
                            self.depth <= top.open_depth
                        } else {
                            self.depth < top.open_depth
                        };
                        if !closes {
                            break;
                        }
                        let idx = top.idx;
                        self.stack.pop();
                        self.close(idx, line);
                    }
                }
                '(' | '[' => self.adjust_header_parens(1),
                ')' | ']' => self.adjust_header_parens(-1),
                ';' => {
                    if let Some(top) = self.stack.last() {
                        if !top.body_opened && top.open_depth == self.depth && top.paren <= 0 {
                            let idx = top.idx;
                            self.stack.pop();
                            self.close(idx, line);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn adjust_header_parens(&mut self, delta: i32) {
        if let Some(top) = self.stack.last_mut() {
            if !top.body_opened {
                top.paren += delta;
            }
        }
    }

    fn close_header_at_eol(&mut self, trimmed: &str, line: usize) {
        let Some(top) = self.stack.last() else {
            return;
        };
        if top.body_opened || top.paren > 0 || top.open_depth != self.depth {
            return;
        }
        if CONTINUATIONS.iter().any(|token| trimmed.ends_with(token)) {
            return;
        }
        let idx = top.idx;
        self.stack.pop();
        self.close(idx, line);
    }
}

struct OpenIndent {
    idx: usize,
    indent: usize,
    /// Indentation of the first body line
    body_indent: Option<usize>,
}

struct IndentScan {
    language: Language,
    style: BlockStyle,
    lexer: LineLexer,
    diagnostics: ScanDiagnostics,
    entries: Vec<DeclarationBoundary>,
    stack: Vec<OpenIndent>,
    /// Open brackets carried across lines (continuation lines)
    paren: usize,
    last_content_line: usize,
    decorator_start: Option<usize>,
    closed_through: usize,
}

impl IndentScan {
    fn new(language: Language, style: BlockStyle) -> Self {
        Self {
            language,
            style,
            lexer: LineLexer::new(language.lexical_rules()),
            diagnostics: ScanDiagnostics::default(),
            entries: Vec::new(),
            stack: Vec::new(),
            paren: 0,
            last_content_line: 0,
            decorator_start: None,
            closed_through: 0,
        }
    }

    fn run(mut self, document: &SourceDocument) -> BoundaryTable {
        let line_comments = self.language.lexical_rules().line_comments;

        for (idx, raw) in document.lines().enumerate() {
            let line = idx + 1;
            let raw = strip_terminator(raw);
            let starts_in_code = self.lexer.at_code();
            let code = self.lexer.scan(raw, &mut self.diagnostics);

            let raw_trimmed = raw.trim();
            let is_comment = line_comments.iter().any(|marker| raw_trimmed.starts_with(marker));
            if starts_in_code && (raw_trimmed.is_empty() || is_comment) {
                continue;
            }

            if starts_in_code && self.paren == 0 {
                self.structure_line(code.trim(), indent_width(raw), line);
            }

            self.last_content_line = line;
            self.count_brackets(&code);
        }

        self.lexer.finish(&mut self.diagnostics);
        let unterminated = self.paren > 0 || !self.lexer.at_code();
        self.diagnostics.unbalanced_delimiters += self.paren;

        let total = document.total_lines();
        for open in std::mem::take(&mut self.stack) {
            let entry = &mut self.entries[open.idx];
            if unterminated {
                entry.end_line = total.max(entry.start_line);
                entry.terminated = false;
                self.diagnostics.unterminated_declarations += 1;
            } else {
                close_entry(entry, self.last_content_line);
            }
        }

        BoundaryTable::new(self.entries, self.diagnostics)
    }

    fn structure_line(&mut self, trimmed: &str, indent: usize, line: usize) {
        let is_end = self.style == BlockStyle::EndKeyword && is_end_line(trimmed);

        // Dedent closes everything at this indentation or deeper; an `end`
        // line additionally closes the entry it lines up with, on itself
        while let Some(top) = self.stack.last() {
            let idx = top.idx;
            if top.indent > indent || (!is_end && top.indent == indent) {
                self.stack.pop();
                self.close(idx, self.last_content_line);
            } else if is_end && top.indent == indent {
                self.stack.pop();
                self.close(idx, line);
                break;
            } else {
                break;
            }
        }
        if is_end {
            self.decorator_start = None;
            return;
        }

        if let Some(top) = self.stack.last_mut() {
            if top.body_indent.is_none() && indent > top.indent {
                top.body_indent = Some(indent);
            }
        }

        if patterns::is_decorator(self.language, trimmed) {
            self.decorator_start.get_or_insert(line);
            return;
        }
        let decorator_start = self.decorator_start.take();

        let parent = self.stack.last();
        let accepted = parent.map_or(indent == 0, |p| p.body_indent == Some(indent));
        if !accepted {
            return;
        }
        let enclosing = parent.map(|p| self.entries[p.idx].kind);
        let Some(intro) = patterns::detect(self.language, trimmed, enclosing) else {
            return;
        };

        let start_line = decorator_start.map_or(line, |first| {
            first.max(self.closed_through + 1).min(line)
        });
        let depth = self.stack.len();
        self.entries.push(open_entry(intro, start_line, depth));
        self.stack.push(OpenIndent {
            idx: self.entries.len() - 1,
            indent,
            body_indent: None,
        });
    }

    fn close(&mut self, idx: usize, end_line: usize) {
        close_entry(&mut self.entries[idx], end_line);
        self.closed_through = self.closed_through.max(self.entries[idx].end_line);
    }

    fn count_brackets(&mut self, code: &str) {
        for ch in code.chars() {
            match ch {
                '(' | '[' | '{' => self.paren += 1,
                ')' | ']' | '}' => {
                    if self.paren == 0 {
                        self.diagnostics.unbalanced_delimiters += 1;
                    } else {
                        self.paren -= 1;
                    }
                }
                _ => {}
            }
        }
    }
}

fn is_end_line(trimmed: &str) -> bool {
    trimmed
        .strip_prefix("end")
        .is_some_and(|rest| !rest.starts_with(is_ident_char))
}

/// Leading whitespace width, tabs counted as 4
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}
