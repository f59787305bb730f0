//! # Context Progressive Reader
//!
//! Reads large source files in bounded, structure-aware chunks so a
//! consumer with a limited context window can walk a file step by step,
//! jump around in it and resume later.
//!
//! ## Architecture
//!
//! ```text
//! path / text
//!     │
//!     ├──> SourceDocument (line index, SHA-256, language)
//!     │
//!     ├──> Structural Indexer → BoundaryTable
//!     │    ├─> tree-sitter walk (Rust, Python, JS, TS, Go)
//!     │    ├─> heuristic scan (braces / indentation / `end`)
//!     │    └─> optional disk cache keyed by path + content hash
//!     │
//!     ├──> Chunker (line + byte budgets, cut before declarations)
//!     │
//!     └──> Session (cursor: next / seek / reset, continuation tokens)
//!          ├─> Summarizer (declarations per chunk, outline, context)
//!          └─> Formatter (boxed, line-numbered rendering)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use context_progressive_reader::{open, Input, ReaderConfig};
//!
//! let code = r#"
//! class Auth {
//!   login() {
//!     return true;
//!   }
//! }
//!
//! function helper() {
//!   return 1;
//! }
//! "#;
//!
//! let config = ReaderConfig::default().max_lines(6);
//! let mut session = open(Input::named("auth.ts", code), config).unwrap();
//!
//! while let Some(chunk) = session.next_chunk() {
//!     let names: Vec<_> = session
//!         .summarize(&chunk)
//!         .into_iter()
//!         .filter_map(|d| d.boundary.name)
//!         .collect();
//!     println!("lines {}-{}: {:?}", chunk.start_line, chunk.end_line, names);
//! }
//! assert!(!session.has_more());
//! ```

mod cache;
mod chunker;
mod config;
mod cursor;
mod document;
mod error;
mod formatter;
mod indexer;
mod language;
mod session;
mod summarizer;
mod token;
mod types;

pub use cache::BoundaryCache;
pub use chunker::{Chunker, ChunkingStats, Chunks};
pub use config::{IndexerMode, ReaderConfig};
pub use cursor::{CursorState, ReadCursor};
pub use document::SourceDocument;
pub use error::{ReaderError, Result};
pub use formatter::{render_chunk, render_outline, truncate_graphemes, RenderOptions};
pub use indexer::{
    build_table, indexer_for, AutoIndexer, HeuristicIndexer, StructuralIndexer, SyntaxIndexer,
    SyntaxScan,
};
pub use language::{BlockStyle, CharLiterals, Language, LexicalRules};
pub use session::{open, Input, Session};
pub use summarizer::{chunk_context, summarize, ChunkDeclaration, Outline};
pub use token::ContinuationToken;
pub use types::{BoundaryTable, Chunk, DeclarationBoundary, DeclarationKind, ScanDiagnostics};
