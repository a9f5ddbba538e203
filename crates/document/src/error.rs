use bufsync_primitives::BufferId;
use thiserror::Error;

/// Boxed error returned by [`LineSource`](crate::LineSource) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = DocumentError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DocumentError {
	/// The change does not fit the tracked lines; host and document have diverged.
	#[error("lines {first}..{last} out of bounds for {buffer} ({len} lines)")]
	RangeOutOfBounds {
		buffer: BufferId,
		first: usize,
		last: usize,
		len: usize,
	},
	/// The host buffer could not be read.
	#[error("failed to read lines of {buffer}: {source}")]
	LineSource {
		buffer: BufferId,
		#[source]
		source: BoxError,
	},
	#[error("grammar rejected by parser: {0}")]
	Language(#[from] tree_sitter::LanguageError),
}
