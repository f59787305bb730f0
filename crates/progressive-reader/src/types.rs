use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// A contiguous slice of document lines handed out by one read step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the read sequence (0-based)
    pub sequence: usize,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Raw text, line terminators included
    pub text: String,

    /// True when `end_line` is the document's last line
    pub is_final: bool,
}

impl Chunk {
    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Size of the chunk text in bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.text.len()
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    #[must_use]
    pub const fn line_range(&self) -> RangeInclusive<usize> {
        self.start_line..=self.end_line
    }
}

/// Kind of a detected declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Class,
    Interface,
    Struct,
    Enum,
    /// Rust trait
    Trait,
    /// Rust impl block
    Impl,
    /// Module / namespace
    Module,
    Function,
    /// Function declared inside a class-like body
    Method,
    /// Type alias
    Type,
    /// Exported value without a more specific kind (`export default {`, `module.exports =`)
    Export,
    Other,
}

impl DeclarationKind {
    /// Whether members declared directly in the body are methods
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Class
                | Self::Interface
                | Self::Struct
                | Self::Trait
                | Self::Impl
                | Self::Module
                | Self::Export
        )
    }

    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Impl => "impl",
            Self::Module => "module",
            Self::Function => "function",
            Self::Method => "method",
            Self::Type => "type",
            Self::Export => "export",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line range of one declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclarationBoundary {
    pub kind: DeclarationKind,

    /// Best-effort identifier; absent names are only used for alignment
    pub name: Option<String>,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive). A declaration the scan could not
    /// close ends at the document's last line.
    pub end_line: usize,

    /// Nesting depth (0 = top level)
    pub depth: usize,

    /// False when the end could not be resolved (unbalanced delimiters, EOF)
    pub terminated: bool,
}

impl DeclarationBoundary {
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Whether `other` lies within this declaration's line range
    #[must_use]
    pub const fn encloses(&self, other: &Self) -> bool {
        other.start_line >= self.start_line && other.end_line <= self.end_line
    }

    /// Whether the declaration intersects lines `start..=end`
    #[must_use]
    pub const fn intersects(&self, start: usize, end: usize) -> bool {
        self.start_line <= end && self.end_line >= start
    }

    /// `kind name` or just `kind` for anonymous declarations
    #[must_use]
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {name}", self.kind),
            None => self.kind.to_string(),
        }
    }
}

/// Anomalies met while scanning. Non-zero counts mean the table is coarser
/// than it would be for well-formed source.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanDiagnostics {
    /// Closers with no opener, or openers never closed
    pub unbalanced_delimiters: usize,
    /// Declarations closed at end of input
    pub unterminated_declarations: usize,
    /// String literals or comments still open at end of line/input
    pub unterminated_literals: usize,
}

impl ScanDiagnostics {
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        self.unbalanced_delimiters > 0
            || self.unterminated_declarations > 0
            || self.unterminated_literals > 0
    }
}

/// Declarations of one document, ordered by start line (parents before
/// the children that start on the same line)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundaryTable {
    entries: Vec<DeclarationBoundary>,
    diagnostics: ScanDiagnostics,
}

impl BoundaryTable {
    pub fn new(mut entries: Vec<DeclarationBoundary>, diagnostics: ScanDiagnostics) -> Self {
        entries.sort_by(|a, b| {
            a.start_line
                .cmp(&b.start_line)
                .then_with(|| a.depth.cmp(&b.depth))
                .then_with(|| b.end_line.cmp(&a.end_line))
        });
        Self {
            entries,
            diagnostics,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[DeclarationBoundary] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeclarationBoundary> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn diagnostics(&self) -> &ScanDiagnostics {
        &self.diagnostics
    }

    /// Top-level declarations only
    pub fn top_level(&self) -> impl Iterator<Item = &DeclarationBoundary> {
        self.entries.iter().filter(|entry| entry.depth == 0)
    }

    /// Declarations whose start line lies in `after+1..=up_to`
    pub fn starts_in(
        &self,
        after: usize,
        up_to: usize,
    ) -> impl Iterator<Item = &DeclarationBoundary> {
        let from = self.entries.partition_point(|entry| entry.start_line <= after);
        self.entries[from..]
            .iter()
            .take_while(move |entry| entry.start_line <= up_to)
    }

    /// Largest declaration start line within `after+1..=up_to`
    #[must_use]
    pub fn last_start_in(&self, after: usize, up_to: usize) -> Option<usize> {
        self.starts_in(after, up_to).map(|entry| entry.start_line).last()
    }

    /// Closest declaration start at or before `line`
    #[must_use]
    pub fn nearest_start_at_or_before(&self, line: usize) -> Option<usize> {
        let idx = self.entries.partition_point(|entry| entry.start_line <= line);
        idx.checked_sub(1).map(|i| self.entries[i].start_line)
    }

    /// Most deeply nested declaration containing `line`
    #[must_use]
    pub fn innermost_at(&self, line: usize) -> Option<&DeclarationBoundary> {
        self.entries
            .iter()
            .filter(|entry| entry.contains_line(line))
            .max_by_key(|entry| entry.depth)
    }

    /// Declarations intersecting lines `start..=end`, in table order
    pub fn intersecting(
        &self,
        start: usize,
        end: usize,
    ) -> impl Iterator<Item = &DeclarationBoundary> {
        self.entries
            .iter()
            .take_while(move |entry| entry.start_line <= end)
            .filter(move |entry| entry.end_line >= start)
    }

    /// Check that no two entries partially overlap (ranges nest or are disjoint)
    #[must_use]
    pub fn is_well_nested(&self) -> bool {
        for (idx, outer) in self.entries.iter().enumerate() {
            for inner in &self.entries[idx + 1..] {
                if inner.start_line > outer.end_line {
                    break;
                }
                if !outer.encloses(inner) && !inner.encloses(outer) {
                    return false;
                }
            }
        }
        true
    }
}

impl<'a> IntoIterator for &'a BoundaryTable {
    type Item = &'a DeclarationBoundary;
    type IntoIter = std::slice::Iter<'a, DeclarationBoundary>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
