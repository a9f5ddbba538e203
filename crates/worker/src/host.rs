use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{TaskClass, panic_message, spawn_named_thread};

/// A unit of work to run on the host execution context.
pub type HostJob = Box<dyn FnOnce() + Send + 'static>;

/// The host execution context no longer accepts jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("host execution context is closed")]
pub struct HostClosed;

/// Re-entry point into the host's single logical thread.
///
/// Jobs run one at a time, to completion, in submission order. Everything that
/// mutates documents goes through here, which is what makes them single-writer.
pub trait HostContext: Send + Sync + 'static {
	fn schedule(&self, job: HostJob) -> Result<(), HostClosed>;
}

enum HostCommand {
	Run(HostJob),
	Stop,
}

/// Cloneable handle submitting jobs to a [`HostLoop`].
#[derive(Clone)]
pub struct HostHandle {
	tx: mpsc::UnboundedSender<HostCommand>,
}

impl HostContext for HostHandle {
	fn schedule(&self, job: HostJob) -> Result<(), HostClosed> {
		self.tx.send(HostCommand::Run(job)).map_err(|_| HostClosed)
	}
}

/// A dedicated thread acting as the host execution context.
///
/// If spawned from inside a tokio runtime, the thread enters that runtime so jobs
/// can spawn tasks and use timers.
pub struct HostLoop {
	handle: HostHandle,
	thread: Option<JoinHandle<()>>,
}

impl HostLoop {
	pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
		let (tx, mut rx) = mpsc::unbounded_channel();
		let runtime = tokio::runtime::Handle::try_current().ok();
		let thread = spawn_named_thread(TaskClass::Interactive, name, move || {
			let _guard = runtime.as_ref().map(|rt| rt.enter());
			while let Some(command) = rx.blocking_recv() {
				match command {
					HostCommand::Run(job) => {
						if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
							let message = panic_message(payload.as_ref()).unwrap_or_default();
							error!(panic = %message, "host.job_panicked");
						}
					}
					HostCommand::Stop => break,
				}
			}
			debug!("host.loop_exit");
		})?;
		Ok(Self {
			handle: HostHandle { tx },
			thread: Some(thread),
		})
	}

	pub fn handle(&self) -> HostHandle {
		self.handle.clone()
	}

	/// Runs every job queued so far, then stops the thread.
	///
	/// Jobs submitted afterwards fail with [`HostClosed`].
	pub fn shutdown(mut self) {
		self.stop();
	}

	fn stop(&mut self) {
		let _ = self.handle.tx.send(HostCommand::Stop);
		if let Some(thread) = self.thread.take()
			&& thread.join().is_err()
		{
			error!("host.loop_join_failed");
		}
	}
}

impl Drop for HostLoop {
	fn drop(&mut self) {
		self.stop();
	}
}
