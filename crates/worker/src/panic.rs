use std::any::Any;

use tokio::task::JoinError;

/// Extracts the message from a caught panic payload.
///
/// Handles the two payload types `panic!` produces; anything else yields `None`.
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		Some((*msg).to_string())
	} else {
		payload.downcast_ref::<String>().cloned()
	}
}

/// Extracts the panic message from a failed task join.
///
/// Returns `None` when the task was cancelled rather than panicking.
pub fn join_error_panic_message(err: JoinError) -> Option<String> {
	if !err.is_panic() {
		return None;
	}
	let payload = err.into_panic();
	Some(panic_message(payload.as_ref()).unwrap_or_else(|| "non-string panic payload".to_string()))
}
