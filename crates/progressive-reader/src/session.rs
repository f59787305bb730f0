use crate::cache::BoundaryCache;
use crate::chunker::{Chunker, ChunkingStats};
use crate::config::ReaderConfig;
use crate::cursor::{CursorState, ReadCursor};
use crate::document::SourceDocument;
use crate::error::{ReaderError, Result};
use crate::formatter::RenderOptions;
use crate::indexer::build_table;
use crate::summarizer::{chunk_context, summarize, ChunkDeclaration};
use crate::token::ContinuationToken;
use crate::types::{BoundaryTable, Chunk, DeclarationBoundary};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What to read: a file on disk or text already in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Path(PathBuf),
    Text {
        /// Display name; a path-like name also selects the language
        name: Option<String>,
        content: String,
    },
}

impl Input {
    /// Anonymous in-memory text
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            name: None,
            content: content.into(),
        }
    }

    /// In-memory text with a name such as `src/auth.ts`
    pub fn named(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Text {
            name: Some(name.into()),
            content: content.into(),
        }
    }

    fn load(self) -> Result<SourceDocument> {
        match self {
            Self::Path(path) => SourceDocument::from_path(path),
            Self::Text { name, content } => Ok(SourceDocument::from_text(content, name.as_deref())),
        }
    }
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for Input {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Open a progressive read session
pub fn open(input: impl Into<Input>, config: ReaderConfig) -> Result<Session> {
    Session::open(input, config)
}

/// One consumer's progressive read of a document.
///
/// The document and its boundary table are immutable and shared; only the
/// cursor is per session. [`Session::fork`] gives another consumer its own
/// cursor over the same data.
#[derive(Debug, Clone)]
pub struct Session {
    document: Arc<SourceDocument>,
    table: Arc<BoundaryTable>,
    cursor: ReadCursor,
}

impl Session {
    /// Load the input and index it
    pub fn open(input: impl Into<Input>, config: ReaderConfig) -> Result<Self> {
        config.validate().map_err(ReaderError::invalid_config)?;
        let document = input.into().load()?;
        let table = build_table(&document, config.indexer);
        Ok(Self::from_parts(Arc::new(document), Arc::new(table), config))
    }

    /// Like [`Session::open`], reusing a cached boundary table when the
    /// document content is unchanged. Cache failures only cost a rebuild.
    pub fn open_cached(
        input: impl Into<Input>,
        config: ReaderConfig,
        cache: &BoundaryCache,
    ) -> Result<Self> {
        config.validate().map_err(ReaderError::invalid_config)?;
        let document = input.into().load()?;

        let Some(name) = document.name() else {
            let table = build_table(&document, config.indexer);
            return Ok(Self::from_parts(Arc::new(document), Arc::new(table), config));
        };

        let table = match cache.load(name, document.content_hash(), config.indexer) {
            Some(table) => {
                log::debug!("boundary cache hit for {name}");
                table
            }
            None => {
                let table = build_table(&document, config.indexer);
                if let Err(err) = cache.store(name, document.content_hash(), config.indexer, &table) {
                    log::warn!("Failed to cache boundaries for {name}: {err}");
                }
                table
            }
        };
        Ok(Self::from_parts(Arc::new(document), Arc::new(table), config))
    }

    /// Session over an already indexed document
    pub fn from_parts(
        document: Arc<SourceDocument>,
        table: Arc<BoundaryTable>,
        config: ReaderConfig,
    ) -> Self {
        let chunker = Chunker::new(Arc::clone(&document), Arc::clone(&table), config);
        Self {
            document,
            table,
            cursor: ReadCursor::new(chunker),
        }
    }

    /// Reopen `input` and continue where `token` left off.
    ///
    /// Fails with [`ReaderError::StaleToken`] when the content changed since
    /// the token was issued.
    pub fn resume(input: impl Into<Input>, config: ReaderConfig, token: &str) -> Result<Self> {
        let token = ContinuationToken::decode(token)?;
        let mut session = Self::open(input, config)?;
        session.restore(&token)?;
        Ok(session)
    }

    /// Move this session to the position saved in `token`
    pub fn restore(&mut self, token: &ContinuationToken) -> Result<()> {
        token.validate(&self.document, self.config())?;
        self.cursor.restore(token.next_line, token.sequence);
        log::debug!(
            "resumed at line {} (chunk {})",
            token.next_line,
            token.sequence + 1
        );
        Ok(())
    }

    /// Next chunk, or `None` at end of document
    pub fn next_chunk(&mut self) -> Option<Chunk> {
        self.cursor.next_chunk()
    }

    /// Reposition the read so the next chunk covers `line`.
    ///
    /// Line 0 is treated as line 1. With alignment on, reading may restart a
    /// little earlier at the declaration enclosing `line`, but only when the
    /// chunk from there still reaches `line` within both budgets.
    pub fn seek(&mut self, line: usize) -> Result<()> {
        let total_lines = self.document.total_lines();
        if line.max(1) > total_lines {
            return Err(ReaderError::OutOfRange { line, total_lines });
        }
        self.cursor.seek(line);
        Ok(())
    }

    /// Start over from line 1
    pub fn reset(&mut self) {
        self.cursor.reset();
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor.has_more()
    }

    /// Every declaration of the document, ordered by start line
    #[must_use]
    pub fn outline(&self) -> &[DeclarationBoundary] {
        self.table.entries()
    }

    #[must_use]
    pub const fn table(&self) -> &Arc<BoundaryTable> {
        &self.table
    }

    #[must_use]
    pub const fn document(&self) -> &Arc<SourceDocument> {
        &self.document
    }

    #[must_use]
    pub const fn config(&self) -> &ReaderConfig {
        self.cursor.chunker().config()
    }

    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.cursor.state()
    }

    /// Next line to be read (1-indexed)
    #[must_use]
    pub const fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Independent session at the same position, sharing document and table
    #[must_use]
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Declarations that intersect `chunk`
    #[must_use]
    pub fn summarize(&self, chunk: &Chunk) -> Vec<ChunkDeclaration> {
        summarize(chunk, &self.table)
    }

    /// Token for the current position, `None` once everything has been read
    #[must_use]
    pub fn continuation_token(&self) -> Option<ContinuationToken> {
        self.has_more().then(|| {
            ContinuationToken::new(
                &self.document,
                self.config(),
                self.cursor.position(),
                self.cursor.sequence(),
            )
        })
    }

    /// Number of chunks in a full read
    #[must_use]
    pub fn total_chunks(&self) -> usize {
        self.cursor.chunker().chunk_count()
    }

    #[must_use]
    pub fn stats(&self) -> ChunkingStats {
        self.cursor.chunker().stats()
    }

    /// Render options for a chunk this session just returned: path, chunk
    /// count, leading declaration, context and the token to continue with
    #[must_use]
    pub fn render_options(&self, chunk: &Chunk) -> RenderOptions {
        let declaration = self
            .table
            .innermost_at(chunk.start_line)
            .or_else(|| {
                self.table
                    .starts_in(chunk.start_line, chunk.end_line)
                    .next()
            })
            .cloned();

        let token = if chunk.is_final {
            None
        } else {
            self.continuation_token()
                .and_then(|token| match token.encode() {
                    Ok(encoded) => Some(encoded),
                    Err(err) => {
                        log::warn!("Failed to encode continuation token: {err}");
                        None
                    }
                })
        };

        RenderOptions {
            path: self.document.name().map(str::to_string),
            total_chunks: Some(self.total_chunks()),
            declaration,
            context: chunk_context(chunk, self.document.language()),
            token,
            ..RenderOptions::default()
        }
    }
}

impl Iterator for Session {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        self.next_chunk()
    }
}
