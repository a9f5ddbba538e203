//! Dispatcher end of the relay channel.

use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bufsync_proto::{FrameError, HostMessage, RelayMessage, read_frame, write_frame};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Entry of the queue between the relay reader and the dispatch thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
	Message(RelayMessage),
	/// The channel closed or broke without a `Shutdown` from the relay.
	TransportLost,
}

/// Write side of the relay channel, shared by the dispatcher and the dispatch thread.
#[derive(Clone)]
pub struct RelayLink {
	stream: Arc<Mutex<UnixStream>>,
	shutdown_sent: Arc<AtomicBool>,
}

impl RelayLink {
	pub(crate) fn new(stream: UnixStream) -> Self {
		Self {
			stream: Arc::new(Mutex::new(stream)),
			shutdown_sent: Arc::new(AtomicBool::new(false)),
		}
	}

	pub fn send(&self, msg: &HostMessage) -> Result<(), FrameError> {
		trace!(?msg, "relay.send");
		write_frame(&mut *self.stream.lock(), msg)
	}

	/// Sends the shutdown sentinel once; later calls are no-ops.
	pub fn send_shutdown(&self) {
		if self.shutdown_sent.swap(true, Ordering::AcqRel) {
			return;
		}
		if let Err(e) = self.send(&HostMessage::Shutdown) {
			debug!(error = %e, "relay.shutdown_unsent");
		}
	}

	pub fn shutdown_sent(&self) -> bool {
		self.shutdown_sent.load(Ordering::Acquire)
	}
}

/// Pumps relay frames into `queue` until the relay's `Shutdown`, a broken channel, or
/// the consumer going away.
pub(crate) fn pump(mut stream: UnixStream, queue: mpsc::Sender<QueueItem>) {
	loop {
		let item = match read_frame::<RelayMessage>(&mut stream) {
			Ok(Some(msg)) => QueueItem::Message(msg),
			Ok(None) => {
				warn!("relay.eof_without_shutdown");
				QueueItem::TransportLost
			}
			Err(e) => {
				warn!(error = %e, "relay.read_failed");
				QueueItem::TransportLost
			}
		};
		let last = matches!(item, QueueItem::TransportLost | QueueItem::Message(RelayMessage::Shutdown));
		if queue.blocking_send(item).is_err() {
			debug!("relay.queue_closed");
			return;
		}
		if last {
			return;
		}
	}
}
