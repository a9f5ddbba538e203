use std::process::ExitStatus;

use bufsync_proto::FrameError;
use thiserror::Error;

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DispatchError {
	/// Another dispatcher already holds the slot.
	#[error("a dispatcher is already active")]
	AlreadyActive,
	/// The dispatcher is already connected to a relay.
	#[error("a relay is already attached")]
	RelayAttached,
	#[error("no relay is attached")]
	NotAttached,
	#[error("relay channel: {0}")]
	Frame(#[from] FrameError),
	#[error("relay channel I/O: {0}")]
	Io(#[from] std::io::Error),
	#[error("invalid regex selection: {0}")]
	Regex(#[from] regex::Error),
	#[error("failed to start relay {program}: {source}")]
	RelaySpawn {
		program: String,
		#[source]
		source: std::io::Error,
	},
	#[error("relay exited before connecting ({0})")]
	RelayExited(ExitStatus),
	#[error("relay did not connect within {0:?}")]
	ConnectTimeout(std::time::Duration),
}
