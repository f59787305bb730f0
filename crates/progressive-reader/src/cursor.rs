use crate::chunker::Chunker;
use crate::types::Chunk;
use serde::{Deserialize, Serialize};

/// Lifecycle of a read cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorState {
    /// Nothing read yet (also after `reset`)
    Fresh,
    /// At least one chunk read, or repositioned by `seek`
    Reading,
    /// Final chunk emitted
    Exhausted,
}

/// Per-session read position over a [`Chunker`].
///
/// Owned by one consumer. Concurrent readers of the same document each hold
/// their own cursor; the document and boundary table behind the chunker are
/// shared read-only.
#[derive(Debug, Clone)]
pub struct ReadCursor {
    chunker: Chunker,
    /// Next unread line (1-indexed)
    offset: usize,
    sequence: usize,
    state: CursorState,
}

impl ReadCursor {
    pub fn new(chunker: Chunker) -> Self {
        Self {
            chunker,
            offset: 1,
            sequence: 0,
            state: CursorState::Fresh,
        }
    }

    #[must_use]
    pub const fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    /// Next line to be read (1-indexed)
    #[must_use]
    pub const fn position(&self) -> usize {
        self.offset
    }

    /// Sequence index the next chunk will carry
    #[must_use]
    pub const fn sequence(&self) -> usize {
        self.sequence
    }

    fn total_lines(&self) -> usize {
        self.chunker.document().total_lines()
    }

    /// Whether another chunk is available
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.offset <= self.total_lines()
    }

    /// Read the next chunk; `None` once the document is exhausted
    pub fn next_chunk(&mut self) -> Option<Chunk> {
        let Some(chunk) = self.chunker.chunk_at(self.offset, self.sequence) else {
            self.state = CursorState::Exhausted;
            return None;
        };

        self.offset = chunk.end_line + 1;
        self.sequence += 1;
        self.state = if chunk.is_final {
            CursorState::Exhausted
        } else {
            CursorState::Reading
        };
        Some(chunk)
    }

    /// Reposition so the next chunk starts at or before `line`.
    ///
    /// `line` is clamped into the document. With alignment enabled the read
    /// restarts at the nearest declaration start at or before `line`, as long
    /// as the chunk read from there (line and byte budgets both applied)
    /// still reaches `line`. Returns the new offset.
    pub fn seek(&mut self, line: usize) -> usize {
        let line = line.clamp(1, self.total_lines().max(1));
        self.offset = self.aligned_target(line);
        self.state = CursorState::Reading;
        log::debug!("seek to line {line}: reading resumes at {}", self.offset);
        self.offset
    }

    fn aligned_target(&self, line: usize) -> usize {
        let config = self.chunker.config();
        if !config.prefer_boundary_alignment {
            return line;
        }
        match self.chunker.table().nearest_start_at_or_before(line) {
            Some(start)
                if line - start < config.max_lines_per_chunk
                    && self.chunker.chunk_end(start) >= line =>
            {
                start
            }
            _ => line,
        }
    }

    /// Back to the first line; the boundary table is kept
    pub fn reset(&mut self) {
        self.offset = 1;
        self.sequence = 0;
        self.state = CursorState::Fresh;
    }

    /// Restore a saved position (continuation tokens)
    pub(crate) fn restore(&mut self, offset: usize, sequence: usize) {
        self.offset = offset.max(1);
        self.sequence = sequence;
        self.state = if !self.has_more() {
            CursorState::Exhausted
        } else if self.offset == 1 && sequence == 0 {
            CursorState::Fresh
        } else {
            CursorState::Reading
        };
    }
}

impl Iterator for ReadCursor {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        self.next_chunk()
    }
}
