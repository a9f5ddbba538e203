use tree_sitter::{Language, Parser, Tree};

use crate::{InputEdit, Result, outline};

/// A parse tree that can absorb edits before being handed back as a reuse hint.
pub trait SyntaxTree: Clone + Send + 'static {
	/// Shifts the tree's byte and point ranges to account for `edit`.
	fn edit(&mut self, edit: &InputEdit);

	/// Human readable rendering of the tree.
	fn outline(&self) -> String;
}

/// An incremental parser.
///
/// Parsing never fails loudly: an engine that cannot produce a tree returns `None`
/// and the document simply keeps no tree until the next successful parse.
pub trait SyntaxEngine: Send + 'static {
	type Tree: SyntaxTree;

	fn parse(&mut self, source: &[u8], previous: Option<&Self::Tree>) -> Option<Self::Tree>;
}

impl SyntaxTree for Tree {
	fn edit(&mut self, edit: &InputEdit) {
		Tree::edit(self, &edit.into());
	}

	fn outline(&self) -> String {
		outline(self)
	}
}

/// [`SyntaxEngine`] backed by a tree-sitter parser for a single language.
pub struct TreeSitterEngine {
	parser: Parser,
}

impl TreeSitterEngine {
	pub fn new(language: &Language) -> Result<Self> {
		let mut parser = Parser::new();
		parser.set_language(language)?;
		Ok(Self { parser })
	}
}

impl SyntaxEngine for TreeSitterEngine {
	type Tree = Tree;

	fn parse(&mut self, source: &[u8], previous: Option<&Tree>) -> Option<Tree> {
		self.parser.parse(source, previous)
	}
}
