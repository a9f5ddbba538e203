use serde::{Deserialize, Serialize};

use crate::{BufferId, ChangeTick};

/// A line-range replacement reported by the host.
///
/// Lines `[first_line, last_line)` of the previous buffer state were replaced by
/// `new_lines`. Line terminators are never included in `new_lines`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesChanged {
	pub buffer: BufferId,
	/// `None` when the host did not report a tick for this update.
	pub tick: Option<ChangeTick>,
	/// Zero-based index of the first replaced line.
	pub first_line: usize,
	/// Zero-based, exclusive end of the replaced range.
	///
	/// `None` marks the initial snapshot sent right after attaching, where
	/// `new_lines` holds the complete buffer.
	pub last_line: Option<usize>,
	pub new_lines: Vec<String>,
	/// The host split one change into several notifications.
	pub multipart: bool,
}

/// Shape of a line-range edit, derived from its bounds and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditShape {
	/// Full-buffer snapshot (`last_line` is `None`).
	Snapshot,
	/// Lines inserted at a line boundary without removing anything.
	Insert,
	/// A non-empty range replaced by non-empty content.
	Replace,
	/// A non-empty range removed.
	Delete,
	/// Empty range and empty payload.
	Noop,
}

impl LinesChanged {
	/// Returns true for the full-buffer snapshot that follows an attach.
	pub fn is_snapshot(&self) -> bool {
		self.last_line.is_none()
	}

	/// Classifies the edit.
	///
	/// A range whose end lies before its start is reported as `Replace`/`Delete`
	/// like any other range; bounds are validated by whoever applies the edit.
	pub fn shape(&self) -> EditShape {
		let Some(last_line) = self.last_line else {
			return EditShape::Snapshot;
		};
		match (self.first_line == last_line, self.new_lines.is_empty()) {
			(true, true) => EditShape::Noop,
			(true, false) => EditShape::Insert,
			(false, false) => EditShape::Replace,
			(false, true) => EditShape::Delete,
		}
	}
}

/// A normalized notification from the editing host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
	LinesChanged(LinesChanged),
	/// Updates for the buffer stopped: it was unloaded, reloaded or explicitly detached.
	Detached { buffer: BufferId },
}

impl ChangeEvent {
	/// Buffer the event refers to.
	pub fn buffer(&self) -> BufferId {
		match self {
			Self::LinesChanged(change) => change.buffer,
			Self::Detached { buffer } => *buffer,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn change(first_line: usize, last_line: Option<usize>, new_lines: &[&str]) -> LinesChanged {
		LinesChanged {
			buffer: BufferId(1),
			tick: Some(ChangeTick(3)),
			first_line,
			last_line,
			new_lines: new_lines.iter().map(|s| s.to_string()).collect(),
			multipart: false,
		}
	}

	#[test]
	fn shape_classification() {
		assert_eq!(change(0, None, &["a"]).shape(), EditShape::Snapshot);
		assert_eq!(change(2, Some(2), &["x"]).shape(), EditShape::Insert);
		assert_eq!(change(1, Some(3), &["x"]).shape(), EditShape::Replace);
		assert_eq!(change(1, Some(3), &[]).shape(), EditShape::Delete);
		assert_eq!(change(4, Some(4), &[]).shape(), EditShape::Noop);
	}

	#[test]
	fn event_survives_postcard() {
		let event = ChangeEvent::LinesChanged(change(0, Some(1), &["héllo", ""]));
		let bytes = postcard::to_allocvec(&event).unwrap();
		let decoded: ChangeEvent = postcard::from_bytes(&bytes).unwrap();
		assert_eq!(decoded, event);
		assert_eq!(decoded.buffer(), BufferId(1));
	}
}
