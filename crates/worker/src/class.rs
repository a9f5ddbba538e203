/// Shared execution classes used for worker scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work that runs on, or feeds, the host execution context.
	Interactive,
	/// Timers and other work that may be delayed.
	Background,
	/// Blocking I/O on dedicated threads (socket readers, the dispatch consumer).
	IoBlocking,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::IoBlocking => "io_blocking",
		}
	}
}
