//! Incremental documents: line contents, an offset chain and a syntax tree per buffer.
//!
//! Line-oriented change notifications are translated into byte/point edits against the
//! document as it was before the change, applied to the previous tree, and the buffer is
//! reparsed with that tree as a reuse hint. The parser sits behind [`SyntaxEngine`] so
//! tests can substitute a recording engine for tree-sitter.
#![cfg_attr(test, allow(unused_crate_dependencies))]

mod document;
mod edit;
/// Parser seam and the tree-sitter implementation.
pub mod engine;
mod error;
mod outline;
mod set;

pub use document::IncrementalDocument;
pub use edit::{InputEdit, Point, compute_edit};
pub use engine::{SyntaxEngine, SyntaxTree, TreeSitterEngine};
pub use error::{BoxError, DocumentError, Result};
pub use outline::outline;
pub use set::{DocumentSet, LineSource, SettledCallback};

/// Bytes of the line terminator appended after every line.
pub const TERMINATOR_LEN: usize = 1;

/// Source text of a document: every line followed by a newline.
pub fn source_text(lines: &[String]) -> Vec<u8> {
	let mut text = Vec::with_capacity(lines.iter().map(|line| line.len() + TERMINATOR_LEN).sum());
	for line in lines {
		text.extend_from_slice(line.as_bytes());
		text.push(b'\n');
	}
	text
}

#[cfg(test)]
mod test_support;
