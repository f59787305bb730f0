use crate::error::{ReaderError, Result};
use crate::language::Language;
use sha2::{Digest, Sha256};
use std::ops::Range;
use std::path::Path;

/// Immutable source text with a line index.
///
/// A line keeps its terminator, so slicing any contiguous line range and
/// concatenating the slices reproduces the original bytes exactly. A
/// trailing newline does not open a new (empty) line.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: Option<String>,
    language: Language,
    content: String,
    /// Byte offset of each line start
    line_starts: Vec<usize>,
    content_sha256: String,
}

impl SourceDocument {
    /// Create a document from in-memory text.
    ///
    /// The language is detected from `name` when it looks like a path.
    pub fn from_text(content: impl Into<String>, name: Option<&str>) -> Self {
        let content = content.into();
        let language = name.map_or(Language::Unknown, Language::from_path);
        let line_starts = index_lines(&content);
        let content_sha256 = sha256_hex(content.as_bytes());

        Self {
            name: name.map(str::to_string),
            language,
            content,
            line_starts,
            content_sha256,
        }
    }

    /// Read a document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReaderError::NotFound(path.to_path_buf()),
            _ => ReaderError::read(&display, e),
        })?;
        let content = String::from_utf8(bytes)
            .map_err(|e| ReaderError::read(&display, format!("not valid UTF-8 text: {e}")))?;

        log::debug!("opened {display} ({} bytes)", content.len());
        Ok(Self::from_text(content, Some(&display)))
    }

    /// Display name (usually the path) if known
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Full text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.content
    }

    /// Number of lines
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.line_starts.len()
    }

    /// Number of bytes
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.content.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Lowercase hex SHA-256 of the content
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_sha256
    }

    /// Byte range covered by lines `start..=end` (1-indexed, clamped)
    #[must_use]
    pub fn byte_range(&self, start_line: usize, end_line: usize) -> Range<usize> {
        let total = self.total_lines();
        if total == 0 || start_line > end_line || start_line > total {
            return 0..0;
        }
        let start_line = start_line.max(1);
        let end_line = end_line.min(total);

        let start = self.line_starts[start_line - 1];
        let end = if end_line == total {
            self.content.len()
        } else {
            self.line_starts[end_line]
        };
        start..end
    }

    /// Text of lines `start..=end`, terminators included
    #[must_use]
    pub fn slice(&self, start_line: usize, end_line: usize) -> &str {
        &self.content[self.byte_range(start_line, end_line)]
    }

    /// Size in bytes of lines `start..=end`
    #[must_use]
    pub fn span_bytes(&self, start_line: usize, end_line: usize) -> usize {
        self.byte_range(start_line, end_line).len()
    }

    /// A single line with its terminator
    #[must_use]
    pub fn line(&self, line: usize) -> Option<&str> {
        (line >= 1 && line <= self.total_lines()).then(|| self.slice(line, line))
    }

    /// Iterate lines, terminators included
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.content.split_inclusive('\n')
    }
}

fn index_lines(content: &str) -> Vec<usize> {
    if content.is_empty() {
        return Vec::new();
    }

    let mut starts = vec![0];
    for (idx, byte) in content.bytes().enumerate() {
        if byte == b'\n' && idx + 1 < content.len() {
            starts.push(idx + 1);
        }
    }
    starts
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_lines_without_phantom_trailing_line() {
        assert_eq!(SourceDocument::from_text("", None).total_lines(), 0);
        assert_eq!(SourceDocument::from_text("a", None).total_lines(), 1);
        assert_eq!(SourceDocument::from_text("a\n", None).total_lines(), 1);
        assert_eq!(SourceDocument::from_text("a\nb", None).total_lines(), 2);
        assert_eq!(SourceDocument::from_text("a\n\n", None).total_lines(), 2);
        assert_eq!(SourceDocument::from_text("\n", None).total_lines(), 1);
    }

    #[test]
    fn slices_keep_terminators() {
        let doc = SourceDocument::from_text("one\r\ntwo\nthree", Some("x.ts"));
        assert_eq!(doc.line(1), Some("one\r\n"));
        assert_eq!(doc.line(2), Some("two\n"));
        assert_eq!(doc.line(3), Some("three"));
        assert_eq!(doc.line(4), None);
        assert_eq!(doc.line(0), None);
        assert_eq!(doc.slice(2, 3), "two\nthree");
        assert_eq!(doc.span_bytes(1, 3), doc.byte_len());
        assert_eq!(doc.language(), Language::TypeScript);
    }

    #[test]
    fn slices_concatenate_to_original() {
        let text = "fn a() {}\n\nfn b() {\n}\n";
        let doc = SourceDocument::from_text(text, None);
        let joined = format!("{}{}", doc.slice(1, 2), doc.slice(3, doc.total_lines()));
        assert_eq!(joined, text);
        assert_eq!(doc.lines().collect::<String>(), text);
        assert_eq!(doc.lines().count(), doc.total_lines());
    }

    #[test]
    fn out_of_range_slices_are_empty() {
        let doc = SourceDocument::from_text("a\nb\n", None);
        assert_eq!(doc.slice(3, 5), "");
        assert_eq!(doc.slice(2, 1), "");
        assert_eq!(doc.slice(2, 99), "b\n");
    }

    #[test]
    fn from_path_reports_missing_and_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.ts");
        assert!(matches!(
            SourceDocument::from_path(&missing),
            Err(ReaderError::NotFound(_))
        ));

        let binary = dir.path().join("blob.bin");
        std::fs::write(&binary, [0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert!(matches!(
            SourceDocument::from_path(&binary),
            Err(ReaderError::ReadError { .. })
        ));

        let source = dir.path().join("ok.py");
        std::fs::write(&source, "def f():\n    pass\n").unwrap();
        let doc = SourceDocument::from_path(&source).unwrap();
        assert_eq!(doc.total_lines(), 2);
        assert_eq!(doc.language(), Language::Python);
        assert_eq!(doc.content_hash().len(), 64);
    }
}
