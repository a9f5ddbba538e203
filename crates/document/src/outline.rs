use std::collections::VecDeque;
use std::fmt::Write;

use tree_sitter::Tree;

/// Renders the named nodes of `tree` breadth first, one per line, indented by depth.
///
/// Each line reads `kind [start_row:start_col - end_row:end_col]`.
pub fn outline(tree: &Tree) -> String {
	let mut out = String::new();
	let mut queue = VecDeque::from([(tree.root_node(), 0usize)]);
	while let Some((node, depth)) = queue.pop_front() {
		let start = node.start_position();
		let end = node.end_position();
		let _ = writeln!(
			out,
			"{:indent$}{} [{}:{} - {}:{}]",
			"",
			node.kind(),
			start.row,
			start.column,
			end.row,
			end.column,
			indent = depth * 2
		);
		let mut cursor = node.walk();
		for child in node.named_children(&mut cursor) {
			queue.push_back((child, depth + 1));
		}
	}
	out
}
