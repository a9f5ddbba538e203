use std::sync::Arc;
use std::time::Duration;

use bufsync_worker::{DebouncedAction, HostClosed, HostContext, HostJob};

use crate::{InputEdit, SyntaxEngine, SyntaxTree};

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}

/// Runs jobs inline on the scheduling thread.
pub(crate) struct InlineHost;

impl HostContext for InlineHost {
	fn schedule(&self, job: HostJob) -> Result<(), HostClosed> {
		job();
		Ok(())
	}
}

/// A debounce that never fires within a test.
pub(crate) fn idle_debounce() -> DebouncedAction {
	DebouncedAction::new(Duration::from_secs(3600), Arc::new(InlineHost), || {})
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTree {
	pub(crate) source: Vec<u8>,
	/// Every edit applied to this tree or the trees it was reparsed from.
	pub(crate) edits: Vec<InputEdit>,
}

impl SyntaxTree for FakeTree {
	fn edit(&mut self, edit: &InputEdit) {
		self.edits.push(*edit);
	}

	fn outline(&self) -> String {
		String::from_utf8_lossy(&self.source).into_owned()
	}
}

#[derive(Debug, Clone)]
pub(crate) struct ParseCall {
	pub(crate) source: Vec<u8>,
	pub(crate) reused: bool,
}

#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
	pub(crate) parses: Vec<ParseCall>,
}

impl SyntaxEngine for RecordingEngine {
	type Tree = FakeTree;

	fn parse(&mut self, source: &[u8], previous: Option<&FakeTree>) -> Option<FakeTree> {
		self.parses.push(ParseCall {
			source: source.to_vec(),
			reused: previous.is_some(),
		});
		Some(FakeTree {
			source: source.to_vec(),
			edits: previous.map(|tree| tree.edits.clone()).unwrap_or_default(),
		})
	}
}
