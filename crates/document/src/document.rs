use bufsync_offset::{OffsetChain, OffsetChainUpdate};
use bufsync_primitives::{BufferId, EditShape, LinesChanged};
use bufsync_worker::DebouncedAction;
use tracing::trace;

use crate::{DocumentError, Result, SyntaxEngine, SyntaxTree, TERMINATOR_LEN, compute_edit, source_text};

/// Tracked state of one host buffer.
///
/// `chain` always has one record per entry of `lines`, each `line.len() + 1` bytes
/// long, so chain offsets are byte offsets into [`text`](Self::text).
pub struct IncrementalDocument<T> {
	buffer: BufferId,
	lines: Vec<String>,
	chain: OffsetChain,
	tree: Option<T>,
	debounce: DebouncedAction,
}

impl<T: SyntaxTree> IncrementalDocument<T> {
	/// Builds a document from the full buffer contents, parses it and arms the debounce.
	pub fn new<E>(buffer: BufferId, lines: Vec<String>, engine: &mut E, debounce: DebouncedAction) -> Self
	where
		E: SyntaxEngine<Tree = T>,
	{
		let mut doc = Self {
			buffer,
			lines: Vec::new(),
			chain: OffsetChain::new(),
			tree: None,
			debounce,
		};
		doc.reload(engine, lines);
		doc
	}

	/// Replaces the whole content and parses it from scratch.
	pub fn reload<E>(&mut self, engine: &mut E, lines: Vec<String>)
	where
		E: SyntaxEngine<Tree = T>,
	{
		self.chain = OffsetChain::from_lengths(lines.iter().map(|line| line.len() + TERMINATOR_LEN));
		self.lines = lines;
		self.tree = engine.parse(&source_text(&self.lines), None);
		trace!(buffer = %self.buffer, lines = self.lines.len(), parsed = self.tree.is_some(), "document.reload");
		self.debounce.reset();
	}

	/// Applies a line-range replacement.
	///
	/// Snapshots reload the document. The tree is edited against the pre-change chain,
	/// reparsed with the edited tree as hint, and only then is the chain updated.
	pub fn apply<E>(&mut self, engine: &mut E, change: &LinesChanged) -> Result<EditShape>
	where
		E: SyntaxEngine<Tree = T>,
	{
		let shape = change.shape();
		let Some(last) = change.last_line else {
			self.reload(engine, change.new_lines.clone());
			return Ok(shape);
		};
		let first = change.first_line;
		if first > last || last > self.lines.len() {
			return Err(DocumentError::RangeOutOfBounds {
				buffer: self.buffer,
				first,
				last,
				len: self.lines.len(),
			});
		}
		if shape == EditShape::Noop {
			return Ok(shape);
		}

		let edit = compute_edit(&self.chain, first, last, &change.new_lines);
		if let Some(tree) = self.tree.as_mut() {
			tree.edit(&edit);
		}
		self.lines.splice(first..last, change.new_lines.iter().cloned());
		self.tree = engine.parse(&source_text(&self.lines), self.tree.as_ref());

		let lengths = change.new_lines.iter().map(|line| line.len() + TERMINATOR_LEN);
		let update = match shape {
			EditShape::Delete => OffsetChainUpdate::Delete {
				indices: (first..last).collect(),
			},
			EditShape::Replace if change.new_lines.len() == last - first => OffsetChainUpdate::Resize {
				lengths: (first..).zip(lengths).collect(),
			},
			_ => OffsetChainUpdate::ReplaceRange {
				start: first,
				end: last,
				lengths: lengths.collect(),
			},
		};
		self.chain.mass_update(update);
		debug_assert_eq!(self.chain.len(), self.lines.len());

		trace!(
			buffer = %self.buffer,
			?shape,
			start_byte = edit.start_byte,
			old_end_byte = edit.old_end_byte,
			new_end_byte = edit.new_end_byte,
			"document.apply"
		);
		self.debounce.reset();
		Ok(shape)
	}

	pub fn buffer(&self) -> BufferId {
		self.buffer
	}

	pub fn lines(&self) -> &[String] {
		&self.lines
	}

	pub fn chain(&self) -> &OffsetChain {
		&self.chain
	}

	pub fn tree(&self) -> Option<&T> {
		self.tree.as_ref()
	}

	/// Current source text as handed to the parser.
	pub fn text(&self) -> Vec<u8> {
		source_text(&self.lines)
	}
}
