//! Translation of line-range replacements into byte/point edits.

use bufsync_offset::OffsetChain;

use crate::TERMINATOR_LEN;

/// A row/column position. Columns are byte offsets within the row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Point {
	pub row: usize,
	pub column: usize,
}

impl Point {
	pub const fn new(row: usize, column: usize) -> Self {
		Self { row, column }
	}
}

/// Byte and point extent of one edit, expressed against the pre-edit text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEdit {
	pub start_byte: usize,
	pub old_end_byte: usize,
	pub new_end_byte: usize,
	pub start_point: Point,
	pub old_end_point: Point,
	pub new_end_point: Point,
}

impl From<&InputEdit> for tree_sitter::InputEdit {
	fn from(edit: &InputEdit) -> Self {
		let point = |p: Point| tree_sitter::Point::new(p.row, p.column);
		tree_sitter::InputEdit {
			start_byte: edit.start_byte,
			old_end_byte: edit.old_end_byte,
			new_end_byte: edit.new_end_byte,
			start_position: point(edit.start_point),
			old_end_position: point(edit.old_end_point),
			new_end_position: point(edit.new_end_point),
		}
	}
}

/// Computes the edit replacing lines `[first, last)` with `new_lines`.
///
/// `chain` must describe the document before the replacement. Every line carries a
/// terminator, so edits always start and end on line boundaries and every column is 0.
///
/// # Panics
///
/// Panics if `first > last` or `last > chain.len()`.
pub fn compute_edit(chain: &OffsetChain, first: usize, last: usize, new_lines: &[String]) -> InputEdit {
	assert!(first <= last, "inverted line range {first}..{last}");
	let start_byte = chain.boundary(first);
	let old_end_byte = chain.boundary(last);
	let inserted: usize = new_lines.iter().map(|line| line.len() + TERMINATOR_LEN).sum();
	InputEdit {
		start_byte,
		old_end_byte,
		new_end_byte: start_byte + inserted,
		start_point: Point::new(first, 0),
		old_end_point: Point::new(last, 0),
		new_end_point: Point::new(first + new_lines.len(), 0),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lines(items: &[&str]) -> Vec<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	fn chain_of(items: &[&str]) -> OffsetChain {
		OffsetChain::from_lengths(items.iter().map(|s| s.len() + TERMINATOR_LEN))
	}

	#[test]
	fn insertion_between_lines() {
		let chain = chain_of(&["a", "bb", "ccc"]);
		let edit = compute_edit(&chain, 1, 1, &lines(&["xy"]));
		assert_eq!((edit.start_byte, edit.old_end_byte, edit.new_end_byte), (2, 2, 5));
		assert_eq!(edit.start_point, Point::new(1, 0));
		assert_eq!(edit.old_end_point, Point::new(1, 0));
		assert_eq!(edit.new_end_point, Point::new(2, 0));
	}

	#[test]
	fn append_after_last_line() {
		let chain = chain_of(&["a", "bb"]);
		let edit = compute_edit(&chain, 2, 2, &lines(&["z"]));
		assert_eq!((edit.start_byte, edit.old_end_byte, edit.new_end_byte), (5, 5, 7));
	}

	#[test]
	fn replacement_with_fewer_lines() {
		let chain = chain_of(&["a", "bb", "ccc", "d"]);
		let edit = compute_edit(&chain, 1, 3, &lines(&["q"]));
		assert_eq!((edit.start_byte, edit.old_end_byte, edit.new_end_byte), (2, 9, 4));
		assert_eq!(edit.old_end_point, Point::new(3, 0));
		assert_eq!(edit.new_end_point, Point::new(2, 0));
	}

	#[test]
	fn deletion_collapses_to_start() {
		let chain = chain_of(&["a", "bb", "ccc"]);
		let edit = compute_edit(&chain, 0, 2, &[]);
		assert_eq!((edit.start_byte, edit.old_end_byte, edit.new_end_byte), (0, 5, 0));
		assert_eq!(edit.new_end_point, edit.start_point);
	}

	#[test]
	fn multibyte_lines_are_measured_in_bytes() {
		let chain = chain_of(&["é", "x"]);
		let edit = compute_edit(&chain, 1, 2, &lines(&["ü€"]));
		assert_eq!((edit.start_byte, edit.old_end_byte, edit.new_end_byte), (3, 5, 9));
	}
}
