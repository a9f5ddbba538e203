use bufsync_primitives::{BufferId, LinesChanged};
use tracing::info;

/// A consumer of buffer changes.
///
/// Listeners are identified by [`name`](Self::name): registering another listener with
/// the same name under the same selection replaces the earlier one. Both callbacks run
/// on the host context; errors and panics are logged and do not affect other listeners.
pub trait Listener: Send + Sync + 'static {
	fn name(&self) -> &str;

	fn handle_event(&self, change: &LinesChanged) -> anyhow::Result<()>;

	/// Updates for `buffer` stopped.
	fn detach(&self, buffer: BufferId) -> anyhow::Result<()> {
		let _ = buffer;
		Ok(())
	}
}

type ChangeFn = dyn Fn(&LinesChanged) -> anyhow::Result<()> + Send + Sync;
type DetachFn = dyn Fn(BufferId) -> anyhow::Result<()> + Send + Sync;

/// Listener built from closures.
pub struct FnListener {
	name: String,
	on_change: Box<ChangeFn>,
	on_detach: Option<Box<DetachFn>>,
}

impl FnListener {
	pub fn new(
		name: impl Into<String>,
		on_change: impl Fn(&LinesChanged) -> anyhow::Result<()> + Send + Sync + 'static,
	) -> Self {
		Self {
			name: name.into(),
			on_change: Box::new(on_change),
			on_detach: None,
		}
	}

	pub fn with_detach(mut self, on_detach: impl Fn(BufferId) -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
		self.on_detach = Some(Box::new(on_detach));
		self
	}
}

impl Listener for FnListener {
	fn name(&self) -> &str {
		&self.name
	}

	fn handle_event(&self, change: &LinesChanged) -> anyhow::Result<()> {
		(self.on_change)(change)
	}

	fn detach(&self, buffer: BufferId) -> anyhow::Result<()> {
		match &self.on_detach {
			Some(on_detach) => on_detach(buffer),
			None => Ok(()),
		}
	}
}

/// Logs every change and detach.
#[derive(Debug, Default)]
pub struct DebugListener;

impl DebugListener {
	pub const NAME: &'static str = "debug_listener";
}

impl Listener for DebugListener {
	fn name(&self) -> &str {
		Self::NAME
	}

	fn handle_event(&self, change: &LinesChanged) -> anyhow::Result<()> {
		info!(
			buffer = %change.buffer,
			tick = change.tick.map(|t| t.0),
			first_line = change.first_line,
			last_line = change.last_line,
			lines = ?change.new_lines,
			multipart = change.multipart,
			"debug.change"
		);
		Ok(())
	}

	fn detach(&self, buffer: BufferId) -> anyhow::Result<()> {
		info!(%buffer, "debug.detach");
		Ok(())
	}
}
