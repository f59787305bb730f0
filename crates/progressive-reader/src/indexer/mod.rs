//! Structural indexing: locate declaration boundaries in a document.
//!
//! ```text
//! SourceDocument
//!     │
//!     ├──> SyntaxIndexer     (tree-sitter, Rust/Python/JS/TS/Go)
//!     │        │ no grammar / parse errors
//!     │        ▼
//!     └──> HeuristicIndexer  (line scan: lexer mask + brace/indent depth)
//!              │
//!              ▼
//!         BoundaryTable + ScanDiagnostics
//! ```

mod heuristic;
mod lexer;
mod patterns;
mod syntax;

pub use heuristic::HeuristicIndexer;
pub use syntax::{SyntaxIndexer, SyntaxScan};

use crate::config::IndexerMode;
use crate::document::SourceDocument;
use crate::types::BoundaryTable;

/// Strategy that turns a document into a boundary table.
///
/// Implementations never fail: malformed input yields a coarser table and
/// non-zero [`crate::ScanDiagnostics`].
pub trait StructuralIndexer {
    fn index(&self, document: &SourceDocument) -> BoundaryTable;

    /// Short strategy name used in logs and cache entries
    fn name(&self) -> &'static str;
}

/// Syntax tree when the parse is clean, heuristic scan otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoIndexer;

impl StructuralIndexer for AutoIndexer {
    fn index(&self, document: &SourceDocument) -> BoundaryTable {
        match SyntaxIndexer::new().scan(document) {
            Some(scan) if scan.clean => scan.table,
            Some(_) => {
                log::warn!(
                    "{}: parse tree has errors, using heuristic boundaries",
                    document.name().unwrap_or("<text>")
                );
                HeuristicIndexer::new().index(document)
            }
            None => HeuristicIndexer::new().index(document),
        }
    }

    fn name(&self) -> &'static str {
        "auto"
    }
}

/// Indexer implementing `mode`
pub fn indexer_for(mode: IndexerMode) -> Box<dyn StructuralIndexer> {
    match mode {
        IndexerMode::Auto => Box::new(AutoIndexer),
        IndexerMode::Heuristic => Box::new(HeuristicIndexer::new()),
        IndexerMode::Syntax => Box::new(SyntaxIndexer::new()),
    }
}

/// Build the boundary table of `document` with the configured strategy
pub fn build_table(document: &SourceDocument, mode: IndexerMode) -> BoundaryTable {
    let indexer = indexer_for(mode);
    let table = indexer.index(document);

    let diagnostics = table.diagnostics();
    if diagnostics.is_malformed() {
        log::warn!(
            "{}: malformed source ({} unbalanced delimiters, {} unterminated declarations, {} unterminated literals); boundaries are approximate",
            document.name().unwrap_or("<text>"),
            diagnostics.unbalanced_delimiters,
            diagnostics.unterminated_declarations,
            diagnostics.unterminated_literals
        );
    }
    log::debug!(
        "{} indexer found {} declarations",
        indexer.name(),
        table.len()
    );
    table
}
