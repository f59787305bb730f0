use crate::formatter::truncate_graphemes;
use crate::language::Language;
use crate::types::{BoundaryTable, Chunk, DeclarationBoundary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum length of a chunk context line, in grapheme clusters
pub const CONTEXT_MAX_CHARS: usize = 60;

/// A declaration as seen from one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDeclaration {
    pub boundary: DeclarationBoundary,
    /// Declaration's first line lies in the chunk
    pub started_in_chunk: bool,
    /// Declaration's last line lies in the chunk
    pub ended_in_chunk: bool,
    /// Declaration continues past the chunk's end
    pub spans_beyond_chunk: bool,
}

impl ChunkDeclaration {
    /// Started before the chunk and is still open inside it
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        !self.started_in_chunk
    }
}

/// Declarations intersecting `chunk`, in table order
#[must_use]
pub fn summarize(chunk: &Chunk, table: &BoundaryTable) -> Vec<ChunkDeclaration> {
    table
        .intersecting(chunk.start_line, chunk.end_line)
        .map(|boundary| ChunkDeclaration {
            boundary: boundary.clone(),
            started_in_chunk: chunk.contains_line(boundary.start_line),
            ended_in_chunk: chunk.contains_line(boundary.end_line),
            spans_beyond_chunk: boundary.end_line > chunk.end_line,
        })
        .collect()
}

/// Short description of a chunk: the first comment text, else the first
/// code line that is not an import
#[must_use]
pub fn chunk_context(chunk: &Chunk, language: Language) -> Option<String> {
    let imports = language.import_patterns();
    let mut first_code: Option<&str> = None;

    for line in chunk.text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(comment) = comment_text(trimmed, language) {
            if !comment.is_empty() {
                return Some(truncate_graphemes(comment, CONTEXT_MAX_CHARS));
            }
            continue;
        }
        if first_code.is_none() && !imports.iter().any(|p| trimmed.starts_with(p)) {
            first_code = Some(trimmed);
        }
    }

    first_code.map(|line| truncate_graphemes(line, CONTEXT_MAX_CHARS))
}

fn comment_text(line: &str, language: Language) -> Option<&str> {
    let rules = language.lexical_rules();
    let mut markers: Vec<&str> = rules.line_comments.to_vec();
    if let Some((open, _)) = rules.block_comment {
        markers.push(open);
    }
    // Doc comment / block comment continuation lines
    if rules.block_comment == Some(("/*", "*/")) {
        markers.extend(["*/", "*"]);
    }

    let marker = markers
        .into_iter()
        .filter(|marker| line.starts_with(marker))
        .max_by_key(|marker| marker.len())?;
    let body = line[marker.len()..]
        .trim_start_matches(['/', '*', '!', '#'])
        .trim_end_matches("*/")
        .trim();
    Some(body)
}

/// Outline built incrementally as chunks are consumed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    /// Keyed by (start line, depth) so chunks can be added in any order
    entries: BTreeMap<(usize, usize), DeclarationBoundary>,
    lines_seen: usize,
}

impl Outline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the declarations that start in a summarized chunk
    pub fn add(&mut self, chunk: &Chunk, declarations: &[ChunkDeclaration]) {
        self.lines_seen += chunk.line_count();
        for declaration in declarations.iter().filter(|d| d.started_in_chunk) {
            let boundary = &declaration.boundary;
            self.entries
                .entry((boundary.start_line, boundary.depth))
                .or_insert_with(|| boundary.clone());
        }
    }

    /// Known declarations ordered by start line
    pub fn declarations(&self) -> impl Iterator<Item = &DeclarationBoundary> {
        self.entries.values()
    }

    /// Named declarations only
    pub fn named(&self) -> impl Iterator<Item = &DeclarationBoundary> {
        self.declarations().filter(|d| d.name.is_some())
    }

    /// Declaration with the given name, if it has been seen
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&DeclarationBoundary> {
        self.declarations().find(|d| d.name.as_deref() == Some(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of document lines covered by the chunks added so far
    #[must_use]
    pub const fn lines_seen(&self) -> usize {
        self.lines_seen
    }
}
