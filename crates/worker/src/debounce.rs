use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{HostContext, TaskClass, spawn};

/// Restartable delayed action.
///
/// Each [`reset`](Self::reset) cancels the pending firing and arms a new one after
/// the configured delay. When the delay elapses without another reset, the action
/// is scheduled once on the host context. Dropping the value cancels any pending
/// firing.
pub struct DebouncedAction {
	delay: Duration,
	action: Arc<dyn Fn() + Send + Sync>,
	host: Arc<dyn HostContext>,
	pending: Option<CancellationToken>,
}

impl DebouncedAction {
	pub fn new(delay: Duration, host: Arc<dyn HostContext>, action: impl Fn() + Send + Sync + 'static) -> Self {
		Self {
			delay,
			action: Arc::new(action),
			host,
			pending: None,
		}
	}

	pub fn delay(&self) -> Duration {
		self.delay
	}

	/// Cancels the pending firing, if any, and arms a new one.
	pub fn reset(&mut self) {
		self.cancel();
		let token = CancellationToken::new();
		self.pending = Some(token.clone());

		let delay = self.delay;
		let action = Arc::clone(&self.action);
		let host = Arc::clone(&self.host);
		spawn(TaskClass::Background, async move {
			let job_token = token.clone();
			tokio::select! {
				_ = token.cancelled() => {}
				_ = tokio::time::sleep(delay) => {
					// A reset can land between the timer firing and the job running.
					let job = Box::new(move || {
						if !job_token.is_cancelled() {
							trace!(delay = ?delay, "debounce.fire");
							action();
						}
					});
					if host.schedule(job).is_err() {
						debug!("debounce.host_closed");
					}
				}
			}
		});
	}

	/// Drops the pending firing without arming a new one.
	pub fn cancel(&mut self) {
		if let Some(token) = self.pending.take() {
			token.cancel();
		}
	}
}

impl Drop for DebouncedAction {
	fn drop(&mut self) {
		self.cancel();
	}
}
