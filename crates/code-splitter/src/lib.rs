//! # Code Splitter
//!
//! Syntax-aware splitting of source code and markup into bounded chunks for
//! embedding models and LLM context windows.
//!
//! ## Philosophy
//!
//! Chunk boundaries fall between statements, blocks and elements whenever the
//! grammar allows it:
//! - Consecutive siblings are packed greedily while they fit the ceiling
//! - A sibling that alone exceeds the ceiling is split along its own children
//! - A leaf that still exceeds the ceiling is emitted whole
//! - Chunks always partition the document exactly (no gaps, no overlap)
//!
//! ## Architecture
//!
//! ```text
//! Document bytes + Language
//!     │
//!     ├──> GrammarRegistry → tree-sitter parse → SyntaxTree (arena)
//!     │
//!     ├──> Splitter walks the tree
//!     │    ├─> Sizer measures candidate byte ranges (chars/words/tokens)
//!     │    ├─> Greedy runs of siblings up to max_size
//!     │    └─> Recurse into oversized children
//!     │
//!     └──> Chunk[] with byte range, size and line span
//! ```
//!
//! ## Example
//!
//! ```rust
//! use code_splitter::{Language, Splitter};
//!
//! let code = b"fn a() {\n    println!(\"a\");\n}\n\nfn b() {\n    println!(\"b\");\n}\n";
//! let splitter = Splitter::chars().with_max_size(32);
//!
//! let chunks = splitter.split(code, Language::Rust).unwrap();
//! for chunk in &chunks {
//!     println!("Chunk at lines {}-{}: {}", chunk.start_line, chunk.end_line, chunk.size);
//! }
//! let joined: Vec<u8> = chunks.iter().flat_map(|c| c.bytes(code).to_vec()).collect();
//! assert_eq!(joined, code);
//! ```

mod config;
mod error;
mod grammar;
mod language;
mod sizer;
mod splitter;
mod tree;
mod types;

pub use config::{MetricConfig, SplitterConfig};
pub use error::{Result, SplitterError};
pub use grammar::{Grammar, GrammarRegistry, TreeSitterGrammar};
pub use language::Language;
pub use sizer::huggingface::load_tokenizer;
pub use sizer::{CharCounter, SizeMetric, Sizer, TiktokenEncoding, WordCounter};
pub use splitter::{ChunkingStats, Splitter, DEFAULT_MAX_SIZE};
pub use tree::{Children, Descendants, NodeId, NodeKind, SyntaxNode, SyntaxTree, TreeBuilder};
pub use types::Chunk;

/// Split `document` with the built-in grammars
///
/// Fails with [`SplitterError::InvalidArgument`] when `max_size` is zero,
/// before the document is parsed.
pub fn split(
    document: &[u8],
    language: Language,
    metric: SizeMetric,
    max_size: usize,
) -> Result<Vec<Chunk>> {
    Splitter::new(metric)
        .with_max_size(max_size)
        .split(document, language)
}
