use std::sync::Arc;
use std::time::Duration;

use bufsync_primitives::{BufferId, EditShape, LinesChanged};
use bufsync_worker::{DebouncedAction, HostContext};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::{BoxError, DocumentError, IncrementalDocument, Result, SyntaxEngine};

/// Reads the current contents of a host buffer.
///
/// Used to initialize a document whose first event is not a snapshot, and to
/// resynchronize a document that diverged from the host.
pub trait LineSource: Send + Sync + 'static {
	fn lines(&self, buffer: BufferId) -> Result<Vec<String>, BoxError>;
}

impl<F> LineSource for F
where
	F: Fn(BufferId) -> Result<Vec<String>, BoxError> + Send + Sync + 'static,
{
	fn lines(&self, buffer: BufferId) -> Result<Vec<String>, BoxError> {
		self(buffer)
	}
}

/// Invoked on the host context once a document has been quiet for the debounce delay.
pub type SettledCallback = Arc<dyn Fn(BufferId) + Send + Sync>;

/// All tracked documents of one syntax engine.
///
/// Documents are created lazily by the first event of a buffer and dropped on detach.
pub struct DocumentSet<E: SyntaxEngine> {
	engine: E,
	documents: FxHashMap<BufferId, IncrementalDocument<E::Tree>>,
	source: Box<dyn LineSource>,
	host: Arc<dyn HostContext>,
	delay: Duration,
	on_settled: SettledCallback,
}

impl<E: SyntaxEngine> DocumentSet<E> {
	pub fn new(engine: E, source: impl LineSource, host: Arc<dyn HostContext>, delay: Duration) -> Self {
		Self {
			engine,
			documents: FxHashMap::default(),
			source: Box::new(source),
			host,
			delay,
			on_settled: Arc::new(|_| {}),
		}
	}

	/// Sets the callback run when a document settles. Applies to documents opened afterwards.
	pub fn with_on_settled(mut self, on_settled: impl Fn(BufferId) + Send + Sync + 'static) -> Self {
		self.on_settled = Arc::new(on_settled);
		self
	}

	/// Applies a change, opening the document first if the buffer is unknown.
	///
	/// Opening and resynchronizing report [`EditShape::Snapshot`]. A change that does not
	/// fit the document triggers a resync from the [`LineSource`] instead of an error.
	pub fn handle_event(&mut self, change: &LinesChanged) -> Result<EditShape> {
		let buffer = change.buffer;
		let Some(doc) = self.documents.get_mut(&buffer) else {
			let lines = match change.last_line {
				None => change.new_lines.clone(),
				Some(_) => read_lines(self.source.as_ref(), buffer)?,
			};
			let on_settled = Arc::clone(&self.on_settled);
			let debounce = DebouncedAction::new(self.delay, Arc::clone(&self.host), move || on_settled(buffer));
			let doc = IncrementalDocument::new(buffer, lines, &mut self.engine, debounce);
			debug!(%buffer, lines = doc.lines().len(), "document.open");
			self.documents.insert(buffer, doc);
			return Ok(EditShape::Snapshot);
		};

		match doc.apply(&mut self.engine, change) {
			Err(err @ DocumentError::RangeOutOfBounds { .. }) => {
				warn!(%buffer, error = %err, "document.resync");
				let lines = read_lines(self.source.as_ref(), buffer)?;
				doc.reload(&mut self.engine, lines);
				Ok(EditShape::Snapshot)
			}
			result => result,
		}
	}

	/// Drops the document of `buffer`. Returns whether one was tracked.
	pub fn detach(&mut self, buffer: BufferId) -> bool {
		let removed = self.documents.remove(&buffer).is_some();
		if removed {
			debug!(%buffer, "document.close");
		}
		removed
	}

	pub fn get(&self, buffer: BufferId) -> Option<&IncrementalDocument<E::Tree>> {
		self.documents.get(&buffer)
	}

	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}

	pub fn engine(&self) -> &E {
		&self.engine
	}
}

fn read_lines(source: &dyn LineSource, buffer: BufferId) -> Result<Vec<String>> {
	source
		.lines(buffer)
		.map_err(|source| DocumentError::LineSource { buffer, source })
}
