//! Socket path resolution for the relay channel.

use std::path::PathBuf;

/// Returns the directory relay channel sockets are created in.
///
/// # Resolution Order
///
/// 1. `BUFSYNC_SOCKET_DIR` environment variable.
/// 2. System runtime directory (e.g., `$XDG_RUNTIME_DIR`), when writable.
/// 3. System temp directory.
#[must_use]
pub fn socket_dir() -> PathBuf {
	if let Ok(p) = std::env::var("BUFSYNC_SOCKET_DIR") {
		return PathBuf::from(p);
	}

	dirs::runtime_dir()
		.filter(|p| std::fs::create_dir_all(p).is_ok())
		.unwrap_or_else(std::env::temp_dir)
}

/// Socket file name for the `seq`-th relay channel opened by process `pid`.
#[must_use]
pub fn channel_socket_name(pid: u32, seq: u32) -> String {
	format!("bufsync-relay.{pid}.{seq}.sock")
}
