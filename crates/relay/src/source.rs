use async_trait::async_trait;
use bufsync_primitives::{BufferId, BufferInfo};

use crate::Result;

/// Host side of the relay: buffer enumeration and subscription.
///
/// Change events themselves arrive on a separate stream handed to
/// [`EventRelay::run`](crate::EventRelay::run).
#[async_trait]
pub trait ChangeSource: Send + Sync {
	/// Buffers open right now.
	async fn open_buffers(&self) -> Result<Vec<BufferId>>;

	/// Subscribes to change notifications of `buffer` and resolves its display name.
	///
	/// The first notification after a successful attach is a full snapshot.
	async fn attach(&self, buffer: BufferId) -> Result<BufferInfo>;

	/// Current display name of an attached buffer. Changes when the buffer is renamed.
	async fn name(&self, buffer: BufferId) -> Result<String>;
}
