use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Configuration for progressive reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Maximum number of lines in one chunk (hard limit)
    pub max_lines_per_chunk: usize,

    /// Maximum number of bytes in one chunk. A single line longer than this
    /// is still emitted, alone, so reads always make progress.
    pub max_bytes_per_chunk: usize,

    /// End chunks just before a declaration starts when a clean cut is nearby
    pub prefer_boundary_alignment: bool,

    /// Smallest aligned chunk, as a fraction of `max_lines_per_chunk`
    pub min_alignment_ratio: f32,

    /// How declaration boundaries are detected
    pub indexer: IndexerMode,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_lines_per_chunk: 200,
            max_bytes_per_chunk: 16_384,
            prefer_boundary_alignment: true,
            min_alignment_ratio: 0.2,
            indexer: IndexerMode::Auto,
        }
    }
}

impl ReaderConfig {
    /// Create config with larger windows for LLM context
    pub fn for_llm_context() -> Self {
        Self {
            max_lines_per_chunk: 400,
            max_bytes_per_chunk: 32_768,
            ..Default::default()
        }
    }

    /// Create config for plain line slicing (no alignment, cheap scan)
    pub fn line_only() -> Self {
        Self {
            prefer_boundary_alignment: false,
            indexer: IndexerMode::Heuristic,
            ..Default::default()
        }
    }

    /// Builder: set the line budget
    #[must_use]
    pub const fn max_lines(mut self, lines: usize) -> Self {
        self.max_lines_per_chunk = lines;
        self
    }

    /// Builder: set the byte budget
    #[must_use]
    pub const fn max_bytes(mut self, bytes: usize) -> Self {
        self.max_bytes_per_chunk = bytes;
        self
    }

    /// Builder: toggle boundary alignment
    #[must_use]
    pub const fn alignment(mut self, enabled: bool) -> Self {
        self.prefer_boundary_alignment = enabled;
        self
    }

    /// Builder: select the indexer
    #[must_use]
    pub const fn indexer(mut self, mode: IndexerMode) -> Self {
        self.indexer = mode;
        self
    }

    /// Minimum number of lines an aligned chunk must keep
    #[must_use]
    pub fn min_viable_lines(&self) -> usize {
        let lines = (self.max_lines_per_chunk as f32 * self.min_alignment_ratio).ceil() as usize;
        lines.max(1)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_lines_per_chunk == 0 {
            return Err("max_lines_per_chunk must be > 0".to_string());
        }

        if self.max_bytes_per_chunk == 0 {
            return Err("max_bytes_per_chunk must be > 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.min_alignment_ratio) {
            return Err(format!(
                "min_alignment_ratio ({}) must be within 0.0..=1.0",
                self.min_alignment_ratio
            ));
        }

        Ok(())
    }

    /// Stable fingerprint of the settings that shape chunk boundaries.
    ///
    /// Continuation tokens carry it so a token issued under one chunking
    /// layout is not replayed under another.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.max_lines_per_chunk.to_le_bytes());
        hasher.update(self.max_bytes_per_chunk.to_le_bytes());
        hasher.update([u8::from(self.prefer_boundary_alignment)]);
        hasher.update(self.min_alignment_ratio.to_le_bytes());
        hasher.update(self.indexer.as_str().as_bytes());
        let digest = hasher.finalize();
        u64::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ])
    }
}

/// Strategy for locating declaration boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexerMode {
    /// Syntax tree when a grammar is available and the parse is clean,
    /// otherwise the heuristic scan
    #[default]
    Auto,

    /// Brace/indent based linear scan (works on any text)
    Heuristic,

    /// Tree-sitter grammar; falls back to the heuristic scan for languages
    /// without a grammar
    Syntax,
}

impl IndexerMode {
    /// Get mode name as string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Heuristic => "heuristic",
            Self::Syntax => "syntax",
        }
    }
}
