use crate::config::ReaderConfig;
use crate::document::SourceDocument;
use crate::types::{BoundaryTable, Chunk};
use std::iter::FusedIterator;
use std::sync::Arc;

/// Splits a document into bounded, boundary-aligned chunks.
///
/// The chunker is stateless: each chunk is computed from its start line, so
/// any position can be (re)started without replaying earlier chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    document: Arc<SourceDocument>,
    table: Arc<BoundaryTable>,
    config: ReaderConfig,
}

impl Chunker {
    /// Create a chunker over a shared document and its boundary table
    pub fn new(document: Arc<SourceDocument>, table: Arc<BoundaryTable>, config: ReaderConfig) -> Self {
        Self {
            document,
            table,
            config,
        }
    }

    #[must_use]
    pub fn document(&self) -> &Arc<SourceDocument> {
        &self.document
    }

    #[must_use]
    pub fn table(&self) -> &Arc<BoundaryTable> {
        &self.table
    }

    #[must_use]
    pub const fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Chunk starting at `start_line` (1-indexed), or `None` past the end
    #[must_use]
    pub fn chunk_at(&self, start_line: usize, sequence: usize) -> Option<Chunk> {
        let total = self.document.total_lines();
        if start_line == 0 || start_line > total {
            return None;
        }

        let end_line = self.chunk_end(start_line);
        Some(Chunk {
            sequence,
            start_line,
            end_line,
            text: self.document.slice(start_line, end_line).to_string(),
            is_final: end_line == total,
        })
    }

    /// Last line of the chunk that starts at `start_line`
    #[must_use]
    pub fn chunk_end(&self, start_line: usize) -> usize {
        let naive_end = self.budget_end(start_line);
        if !self.config.prefer_boundary_alignment || naive_end == self.document.total_lines() {
            return naive_end;
        }

        // Closest declaration start to the naive end wins
        match self.table.last_start_in(start_line, naive_end) {
            Some(boundary) if boundary - start_line >= self.config.min_viable_lines() => {
                log::debug!(
                    "chunk at line {start_line}: cut at {} before declaration on line {boundary}",
                    boundary - 1
                );
                boundary - 1
            }
            _ => naive_end,
        }
    }

    /// Largest end line within both budgets. The start line is always
    /// included, even when it alone exceeds the byte budget.
    fn budget_end(&self, start_line: usize) -> usize {
        let total = self.document.total_lines();
        let line_cap = start_line
            .saturating_add(self.config.max_lines_per_chunk.saturating_sub(1))
            .min(total);
        let max_bytes = self.config.max_bytes_per_chunk;

        let mut lo = start_line;
        let mut hi = line_cap;
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if self.document.span_bytes(start_line, mid) <= max_bytes {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        lo
    }

    /// Lazy sequence of every chunk, from line 1. Each call restarts.
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            chunker: self,
            next_line: 1,
            sequence: 0,
        }
    }

    /// Number of chunks in a full read from line 1 (no text is copied)
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        let total = self.document.total_lines();
        let mut line = 1;
        let mut count = 0;
        while line <= total {
            line = self.chunk_end(line) + 1;
            count += 1;
        }
        count
    }

    /// Statistics over a full read
    #[must_use]
    pub fn stats(&self) -> ChunkingStats {
        Self::get_stats(&self.chunks().collect::<Vec<_>>())
    }

    /// Get chunking statistics
    #[must_use]
    pub fn get_stats(chunks: &[Chunk]) -> ChunkingStats {
        let total_lines = chunks.iter().map(Chunk::line_count).sum();
        ChunkingStats {
            total_chunks: chunks.len(),
            total_lines,
            total_bytes: chunks.iter().map(Chunk::byte_len).sum(),
            avg_lines_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_lines / chunks.len()
            },
            min_lines: chunks.iter().map(Chunk::line_count).min().unwrap_or(0),
            max_lines: chunks.iter().map(Chunk::line_count).max().unwrap_or(0),
            max_bytes: chunks.iter().map(Chunk::byte_len).max().unwrap_or(0),
        }
    }
}

/// Iterator returned by [`Chunker::chunks`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    chunker: &'a Chunker,
    next_line: usize,
    sequence: usize,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let chunk = self.chunker.chunk_at(self.next_line, self.sequence)?;
        self.next_line = chunk.end_line + 1;
        self.sequence += 1;
        Some(chunk)
    }
}

impl FusedIterator for Chunks<'_> {}

/// Statistics about chunking results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_lines: usize,
    pub total_bytes: usize,
    pub avg_lines_per_chunk: usize,
    pub min_lines: usize,
    pub max_lines: usize,
    pub max_bytes: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Lines: {} | Bytes: {} | Avg: {} | Range: {}-{} | Max bytes: {}",
            self.total_chunks,
            self.total_lines,
            self.total_bytes,
            self.avg_lines_per_chunk,
            self.min_lines,
            self.max_lines,
            self.max_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeclarationBoundary, DeclarationKind, ScanDiagnostics};
    use pretty_assertions::assert_eq;

    fn numbered(lines: usize) -> String {
        (1..=lines).map(|i| format!("line {i}\n")).collect()
    }

    fn function(start_line: usize, end_line: usize) -> DeclarationBoundary {
        DeclarationBoundary {
            kind: DeclarationKind::Function,
            name: Some(format!("f{start_line}")),
            start_line,
            end_line,
            depth: 0,
            terminated: true,
        }
    }

    fn chunker(text: &str, boundaries: Vec<DeclarationBoundary>, config: ReaderConfig) -> Chunker {
        Chunker::new(
            Arc::new(SourceDocument::from_text(text, None)),
            Arc::new(BoundaryTable::new(boundaries, ScanDiagnostics::default())),
            config,
        )
    }

    fn ranges(chunker: &Chunker) -> Vec<(usize, usize)> {
        chunker.chunks().map(|c| (c.start_line, c.end_line)).collect()
    }

    #[test]
    fn fixed_windows_without_alignment() {
        let chunker = chunker(
            &numbered(100),
            vec![function(28, 45)],
            ReaderConfig::default().max_lines(30).alignment(false),
        );
        assert_eq!(ranges(&chunker), vec![(1, 30), (31, 60), (61, 90), (91, 100)]);

        let chunks: Vec<_> = chunker.chunks().collect();
        assert!(chunks[3].is_final);
        assert!(chunks[..3].iter().all(|c| !c.is_final));
        assert_eq!(
            chunks.iter().map(|c| c.sequence).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn aligns_before_declaration_start() {
        let chunker = chunker(
            &numbered(100),
            vec![function(28, 45)],
            ReaderConfig::default().max_lines(30),
        );
        assert_eq!(
            ranges(&chunker),
            vec![(1, 27), (28, 57), (58, 87), (88, 100)]
        );
    }

    #[test]
    fn alignment_respects_minimum_viable_size() {
        // Cutting before line 3 would leave a 2-line chunk (< 20% of 30)
        let chunker = chunker(
            &numbered(60),
            vec![function(3, 10)],
            ReaderConfig::default().max_lines(30),
        );
        assert_eq!(ranges(&chunker), vec![(1, 30), (31, 60)]);
    }

    #[test]
    fn closest_boundary_to_naive_end_wins() {
        let chunker = chunker(
            &numbered(100),
            vec![function(10, 15), function(20, 24), function(25, 40)],
            ReaderConfig::default().max_lines(30),
        );
        assert_eq!(ranges(&chunker)[0], (1, 24));
    }

    #[test]
    fn final_window_is_not_aligned() {
        let chunker = chunker(
            &numbered(20),
            vec![function(15, 20)],
            ReaderConfig::default().max_lines(30),
        );
        assert_eq!(ranges(&chunker), vec![(1, 20)]);
    }

    #[test]
    fn byte_budget_caps_windows() {
        // "line N\n" is 7 bytes for N < 10
        let chunker = chunker(
            &numbered(9),
            Vec::new(),
            ReaderConfig::default().max_bytes(21),
        );
        assert_eq!(ranges(&chunker), vec![(1, 3), (4, 6), (7, 9)]);
        assert!(chunker.chunks().all(|c| c.byte_len() <= 21));
    }

    #[test]
    fn oversized_line_is_emitted_alone() {
        let text = format!("short\n{}\nshort\n", "x".repeat(100));
        let chunker = chunker(&text, Vec::new(), ReaderConfig::default().max_bytes(16));
        assert_eq!(ranges(&chunker), vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn chunks_cover_document_exactly() {
        let text = numbered(257);
        let chunker = chunker(
            &text,
            vec![function(40, 80), function(90, 91), function(150, 250)],
            ReaderConfig::default().max_lines(37).max_bytes(200),
        );
        let chunks: Vec<_> = chunker.chunks().collect();
        assert_eq!(chunks.iter().map(|c| c.text.as_str()).collect::<String>(), text);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_line + 1, pair[1].start_line);
        }
        assert!(chunks.iter().all(|c| c.line_count() <= 37 && c.byte_len() <= 200));
    }

    #[test]
    fn empty_document_has_no_chunks() {
        let chunker = chunker("", Vec::new(), ReaderConfig::default());
        assert_eq!(chunker.chunks().count(), 0);
        assert_eq!(chunker.chunk_at(1, 0), None);
        assert_eq!(chunker.stats().total_chunks, 0);
    }

    #[test]
    fn chunks_restart_from_the_beginning() {
        let chunker = chunker(&numbered(50), Vec::new(), ReaderConfig::default().max_lines(20));
        let first: Vec<_> = chunker.chunks().collect();
        let second: Vec<_> = chunker.chunks().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunking_stats() {
        let chunker = chunker(&numbered(100), Vec::new(), ReaderConfig::default().max_lines(30));
        let stats = chunker.stats();
        assert_eq!(stats.total_chunks, 4);
        assert_eq!(stats.total_lines, 100);
        assert_eq!(stats.min_lines, 10);
        assert_eq!(stats.max_lines, 30);
        assert_eq!(stats.avg_lines_per_chunk, 25);
        assert_eq!(chunker.chunk_count(), 4);
        assert!(stats.to_string().starts_with("Chunks: 4 | Lines: 100"));
    }
}
