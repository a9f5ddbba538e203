use bufsync_primitives::{BufferId, BufferInfo, ChangeEvent};
use bufsync_proto::{HostMessage, RelayMessage, read_frame_async, write_frame_async};
use bufsync_worker::{TaskClass, spawn};
use rustc_hash::FxHashMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::{ChangeSource, Result};

/// Why [`EventRelay::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
	/// The host side sent `Shutdown`; the relay answered with its own.
	HostShutdown,
	/// The change source ended. The relay sent `Shutdown` and saw the host's answer.
	SourceClosed,
	/// The relay channel closed without a `Shutdown`.
	ChannelLost,
}

/// Forwards change events from a [`ChangeSource`] over the relay channel.
pub struct EventRelay<S> {
	source: S,
	/// Attached buffers with the name last sent for them.
	attached: FxHashMap<BufferId, String>,
}

impl<S: ChangeSource> EventRelay<S> {
	pub fn new(source: S) -> Self {
		Self {
			source,
			attached: FxHashMap::default(),
		}
	}

	/// Runs the relay session.
	///
	/// Every open buffer is attached first. After that host `Watch` requests and source
	/// events are served in arrival order until either side shuts down. `Attached` is
	/// always written before any event of that buffer, and again whenever a `Watch` for
	/// an attached buffer finds its name changed.
	pub async fn run<R, W>(
		mut self,
		mut events: mpsc::UnboundedReceiver<ChangeEvent>,
		input: R,
		mut output: W,
	) -> Result<RelayExit>
	where
		R: AsyncRead + Unpin + Send + 'static,
		W: AsyncWrite + Unpin,
	{
		let mut host = host_messages(input);

		for buffer in self.source.open_buffers().await? {
			self.attach(buffer, &mut output).await?;
		}
		info!(buffers = self.attached.len(), "relay.ready");

		let exit = loop {
			tokio::select! {
				msg = host.recv() => match msg {
					Some(HostMessage::Watch(buffer)) => self.attach(buffer, &mut output).await?,
					Some(HostMessage::Shutdown) => break RelayExit::HostShutdown,
					None => break RelayExit::ChannelLost,
				},
				event = events.recv() => match event {
					Some(event) => self.forward(event, &mut output).await?,
					None => break RelayExit::SourceClosed,
				},
			}
		};

		match exit {
			RelayExit::HostShutdown => {
				write_frame_async(&mut output, &RelayMessage::Shutdown).await?;
			}
			RelayExit::SourceClosed => {
				write_frame_async(&mut output, &RelayMessage::Shutdown).await?;
				// Late watch requests are moot once the source is gone.
				while let Some(msg) = host.recv().await {
					if msg == HostMessage::Shutdown {
						break;
					}
				}
			}
			RelayExit::ChannelLost => warn!("relay.channel_lost"),
		}
		info!(?exit, "relay.exit");
		Ok(exit)
	}

	async fn attach(&mut self, buffer: BufferId, output: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
		if let Some(known) = self.attached.get(&buffer) {
			let name = match self.source.name(buffer).await {
				Ok(name) => name,
				Err(e) => {
					warn!(%buffer, error = %e, "relay.rename_failed");
					return Ok(());
				}
			};
			if *known == name {
				trace!(%buffer, "relay.attach_duplicate");
				return Ok(());
			}
			debug!(%buffer, from = %known, to = %name, "relay.renamed");
			self.attached.insert(buffer, name.clone());
			write_frame_async(output, &RelayMessage::Attached(BufferInfo::new(buffer, name))).await?;
			return Ok(());
		}
		match self.source.attach(buffer).await {
			Ok(info) => {
				debug!(%buffer, name = %info.name, "relay.attach");
				self.attached.insert(buffer, info.name.clone());
				write_frame_async(output, &RelayMessage::Attached(info)).await?;
			}
			Err(e) => warn!(%buffer, error = %e, "relay.attach_failed"),
		}
		Ok(())
	}

	async fn forward(&mut self, event: ChangeEvent, output: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
		if let ChangeEvent::Detached { buffer } = &event {
			debug!(%buffer, "relay.detached");
			self.attached.remove(buffer);
		}
		trace!(buffer = %event.buffer(), "relay.forward");
		write_frame_async(output, &RelayMessage::Event(event)).await?;
		Ok(())
	}
}

/// Reads host frames on a separate task so the select loop never drops a partial frame.
fn host_messages<R>(mut input: R) -> mpsc::UnboundedReceiver<HostMessage>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	let (tx, rx) = mpsc::unbounded_channel();
	spawn(TaskClass::IoBlocking, async move {
		loop {
			match read_frame_async::<HostMessage>(&mut input).await {
				Ok(Some(msg)) => {
					let last = msg == HostMessage::Shutdown;
					if tx.send(msg).is_err() || last {
						break;
					}
				}
				Ok(None) => break,
				Err(e) => {
					warn!(error = %e, "relay.host_read_failed");
					break;
				}
			}
		}
	});
	rx
}
