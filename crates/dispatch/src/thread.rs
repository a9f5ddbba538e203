use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use bufsync_primitives::{BufferId, ChangeEvent};
use bufsync_proto::RelayMessage;
use bufsync_worker::{HostContext, panic_message};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::{Listener, ListenerRegistry, QueueItem, RelayLink};

/// Consumer of the relay queue.
///
/// Runs on its own thread, blocking on the queue. It keeps the display name of every
/// attached buffer for selection, and hands each event to the host context as one job
/// invoking all matched listeners in order.
pub struct DispatchThread {
	queue: mpsc::Receiver<QueueItem>,
	registry: Arc<RwLock<ListenerRegistry>>,
	host: Arc<dyn HostContext>,
	link: RelayLink,
	names: FxHashMap<BufferId, String>,
}

impl DispatchThread {
	pub fn new(
		queue: mpsc::Receiver<QueueItem>,
		registry: Arc<RwLock<ListenerRegistry>>,
		host: Arc<dyn HostContext>,
		link: RelayLink,
	) -> Self {
		Self {
			queue,
			registry,
			host,
			link,
			names: FxHashMap::default(),
		}
	}

	/// Drains the queue until the relay shuts down or the channel is lost.
	pub fn run(mut self) {
		while let Some(item) = self.queue.blocking_recv() {
			match item {
				QueueItem::Message(RelayMessage::Attached(info)) => {
					debug!(buffer = %info.id, name = %info.name, "dispatch.attached");
					self.names.insert(info.id, info.name);
				}
				QueueItem::Message(RelayMessage::Event(event)) => self.deliver(event),
				QueueItem::Message(RelayMessage::Shutdown) => {
					info!("dispatch.relay_shutdown");
					self.link.send_shutdown();
					break;
				}
				QueueItem::TransportLost => {
					warn!(buffers = self.names.len(), "dispatch.transport_lost");
					let mut buffers: Vec<_> = self.names.keys().copied().collect();
					buffers.sort();
					for buffer in buffers {
						self.deliver(ChangeEvent::Detached { buffer });
					}
					break;
				}
			}
		}
		debug!("dispatch.exit");
	}

	fn deliver(&mut self, event: ChangeEvent) {
		let buffer = event.buffer();
		let name = match &event {
			ChangeEvent::Detached { .. } => self.names.remove(&buffer),
			ChangeEvent::LinesChanged(_) => self.names.get(&buffer).cloned(),
		}
		.unwrap_or_default();

		let listeners = self.registry.read().resolve(buffer, &name);
		if listeners.is_empty() {
			trace!(%buffer, "dispatch.unmatched");
			return;
		}
		trace!(%buffer, listeners = listeners.len(), "dispatch.deliver");
		let job = Box::new(move || invoke_all(&listeners, &event));
		if self.host.schedule(job).is_err() {
			warn!(%buffer, "dispatch.host_closed");
		}
	}
}

/// Runs every listener, isolating failures and panics.
fn invoke_all(listeners: &[Arc<dyn Listener>], event: &ChangeEvent) {
	for listener in listeners {
		let outcome = catch_unwind(AssertUnwindSafe(|| match event {
			ChangeEvent::LinesChanged(change) => listener.handle_event(change),
			ChangeEvent::Detached { buffer } => listener.detach(*buffer),
		}));
		match outcome {
			Ok(Ok(())) => {}
			Ok(Err(e)) => {
				let error = format!("{e:#}");
				error!(listener = listener.name(), buffer = %event.buffer(), %error, "dispatch.listener_failed");
			}
			Err(payload) => {
				let message = panic_message(payload.as_ref()).unwrap_or_default();
				error!(listener = listener.name(), buffer = %event.buffer(), panic = %message, "dispatch.listener_panicked");
			}
		}
	}
}
