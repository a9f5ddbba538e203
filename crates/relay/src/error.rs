use bufsync_primitives::BufferId;
use bufsync_proto::FrameError;
use bufsync_rpc::RpcError;
use thiserror::Error;

pub type Result<T, E = RelayError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RelayError {
	#[error("host rpc: {0}")]
	Rpc(#[from] RpcError),
	#[error("relay channel: {0}")]
	Frame(#[from] FrameError),
	#[error("host refused to attach {0}")]
	AttachRefused(BufferId),
	/// A host notification did not have the documented shape.
	#[error("malformed {event}: {reason}")]
	Malformed { event: &'static str, reason: String },
}
