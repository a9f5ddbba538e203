//! Messages carried by the relay channel.

use bufsync_primitives::{BufferId, BufferInfo, ChangeEvent};
use serde::{Deserialize, Serialize};

/// Relay process to dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayMessage {
	/// The relay subscribed to a buffer. Always precedes that buffer's events.
	Attached(BufferInfo),
	/// A normalized change notification.
	Event(ChangeEvent),
	/// The relay is going away; no further messages follow.
	Shutdown,
}

/// Dispatcher to relay process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostMessage {
	/// Subscribe to a buffer that appeared after startup.
	Watch(BufferId),
	/// The host side is going away; no further messages follow.
	Shutdown,
}
