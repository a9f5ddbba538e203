use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bufsync_dispatch::Listener;
use bufsync_document::{DocumentSet, LineSource, SyntaxEngine, SyntaxTree};
use bufsync_primitives::{BufferId, LinesChanged};
use bufsync_worker::HostContext;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

type SharedDocuments<E> = Arc<Mutex<DocumentSet<E>>>;

/// Keeps an incremental syntax tree for every matching buffer.
///
/// Once a buffer has been quiet for the debounce delay its tree outline is written to
/// [`outline_file`] inside the outline directory.
pub struct SyntaxListener<E: SyntaxEngine> {
	documents: SharedDocuments<E>,
}

impl<E: SyntaxEngine> SyntaxListener<E> {
	pub const NAME: &'static str = "syntax";

	pub fn new(
		engine: E,
		source: impl LineSource,
		host: Arc<dyn HostContext>,
		delay: Duration,
		outline_dir: PathBuf,
	) -> Self {
		let documents = Arc::new_cyclic(|weak: &Weak<Mutex<DocumentSet<E>>>| {
			let weak = weak.clone();
			let set = DocumentSet::new(engine, source, host, delay).with_on_settled(move |buffer| {
				let Some(documents) = weak.upgrade() else {
					return;
				};
				let outline = documents
					.lock()
					.get(buffer)
					.and_then(|doc| doc.tree().map(|tree| tree.outline()));
				match outline {
					Some(outline) => write_outline(&outline_dir, buffer, &outline),
					None => trace!(%buffer, "syntax.settled_without_tree"),
				}
			});
			Mutex::new(set)
		});
		Self { documents }
	}

	pub fn documents(&self) -> &SharedDocuments<E> {
		&self.documents
	}
}

impl<E: SyntaxEngine> Listener for SyntaxListener<E> {
	fn name(&self) -> &str {
		Self::NAME
	}

	fn handle_event(&self, change: &LinesChanged) -> anyhow::Result<()> {
		let shape = self.documents.lock().handle_event(change)?;
		trace!(buffer = %change.buffer, ?shape, "syntax.change");
		Ok(())
	}

	fn detach(&self, buffer: BufferId) -> anyhow::Result<()> {
		self.documents.lock().detach(buffer);
		Ok(())
	}
}

/// Where the outline of `buffer` is written.
pub fn outline_file(dir: &Path, buffer: BufferId) -> PathBuf {
	dir.join(format!("bufsync-outline.{}.txt", buffer.0))
}

fn write_outline(dir: &Path, buffer: BufferId, outline: &str) {
	let path = outline_file(dir, buffer);
	match std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, outline)) {
		Ok(()) => debug!(%buffer, path = %path.display(), "syntax.outline_written"),
		Err(e) => warn!(%buffer, path = %path.display(), error = %e, "syntax.outline_failed"),
	}
}
