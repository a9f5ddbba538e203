//! Error types for the RPC client.

use thiserror::Error;

/// Result alias for RPC operations.
pub type Result<T, E = RpcError> = std::result::Result<T, E>;

/// Failure talking to the RPC peer.
#[derive(Debug, Error)]
pub enum RpcError {
	/// The transport failed.
	#[error("rpc I/O: {0}")]
	Io(#[from] std::io::Error),
	/// The peer sent bytes that are not valid msgpack.
	#[error("malformed msgpack: {0}")]
	Decode(#[from] rmpv::decode::Error),
	/// A message could not be encoded.
	#[error("failed to encode message: {0}")]
	Encode(String),
	/// The peer sent valid msgpack that is not a msgpack-rpc message.
	#[error("protocol violation: {0}")]
	Protocol(String),
	/// The peer answered a request with an error.
	#[error("{method} failed: {message}")]
	Remote {
		/// Method of the failed request.
		method: String,
		/// Error text reported by the peer.
		message: String,
	},
	/// The connection closed before a response arrived.
	#[error("rpc connection closed")]
	Closed,
}
