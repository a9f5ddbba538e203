use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque integer identifier of a host buffer.
///
/// The host hands out extension-typed handles; the relay decodes those into this
/// integer form so nothing host specific is ever framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Value of the host's per-buffer change counter (`b:changedtick`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangeTick(pub u64);

/// A buffer together with its display name at attach time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferInfo {
	pub id: BufferId,
	/// Full display name (usually an absolute path). Empty for scratch buffers.
	pub name: String,
}

impl BufferInfo {
	pub fn new(id: BufferId, name: impl Into<String>) -> Self {
		Self { id, name: name.into() }
	}
}
