use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bufsync_primitives::BufferId;
use bufsync_proto::HostMessage;
use bufsync_proto::paths::{channel_socket_name, socket_dir};
use bufsync_worker::{HostContext, TaskClass, spawn_named_thread};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::transport::pump;
use crate::{
	Config, DebugListener, DispatchError, DispatchThread, DispatcherSlot, Listener, ListenerRegistry, RelayLink,
	Result, Selection, SlotClaim,
};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

static CHANNEL_SEQ: AtomicU32 = AtomicU32::new(0);

struct Connection {
	link: RelayLink,
	reader: JoinHandle<()>,
	dispatch: JoinHandle<()>,
	relay: Option<Child>,
}

impl Connection {
	fn is_finished(&self) -> bool {
		self.reader.is_finished() && self.dispatch.is_finished()
	}

	/// Joins both threads and waits for the relay process. Blocks until they end.
	fn finish(self) {
		for (name, thread) in [("reader", self.reader), ("dispatch", self.dispatch)] {
			if thread.join().is_err() {
				error!(thread = name, "dispatch.thread_panicked");
			}
		}
		if let Some(mut child) = self.relay {
			match child.wait() {
				Ok(status) => debug!(%status, "dispatch.relay_exited"),
				Err(e) => warn!(error = %e, "dispatch.relay_wait_failed"),
			}
		}
		debug!("dispatch.shutdown_complete");
	}
}

/// Owner of the listener registry and of the relay connection.
///
/// At most one dispatcher exists per [`DispatcherSlot`]. Dropping it performs a
/// [`shutdown`](Self::shutdown).
pub struct Dispatcher {
	registry: Arc<RwLock<ListenerRegistry>>,
	host: Arc<dyn HostContext>,
	config: Config,
	connection: Option<Connection>,
	_claim: SlotClaim,
}

impl Dispatcher {
	/// Claims `slot` and creates a dispatcher delivering onto `host`.
	///
	/// Fails with [`DispatchError::AlreadyActive`] while another dispatcher holds the slot.
	pub fn new(slot: &Arc<DispatcherSlot>, host: Arc<dyn HostContext>, config: Config) -> Result<Self> {
		let claim = slot.claim()?;
		let dispatcher = Self {
			registry: Arc::new(RwLock::new(ListenerRegistry::new())),
			host,
			config,
			connection: None,
			_claim: claim,
		};
		if dispatcher.config.debug {
			dispatcher.register_any(Arc::new(DebugListener));
		}
		Ok(dispatcher)
	}

	pub fn registry(&self) -> &Arc<RwLock<ListenerRegistry>> {
		&self.registry
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn register_any(&self, listener: Arc<dyn Listener>) {
		self.registry.write().register(Selection::Any, listener);
	}

	pub fn register_fixed(&self, listener: Arc<dyn Listener>, buffers: impl IntoIterator<Item = BufferId>) {
		self.registry.write().register(Selection::fixed(buffers), listener);
	}

	pub fn register_filetype<S: Into<String>>(&self, listener: Arc<dyn Listener>, suffixes: impl IntoIterator<Item = S>) {
		self.registry.write().register(Selection::filetype(suffixes), listener);
	}

	pub fn register_regex(&self, listener: Arc<dyn Listener>, pattern: &str) -> Result<()> {
		let selection = Selection::regex(pattern)?;
		self.registry.write().register(selection, listener);
		Ok(())
	}

	/// Removes every registration of the named listener.
	pub fn unregister(&self, name: &str) -> usize {
		self.registry.write().unregister(name)
	}

	/// Starts the reader and dispatch threads on an established relay connection.
	pub fn attach_relay(&mut self, stream: UnixStream) -> Result<()> {
		if self.connection.is_some() {
			return Err(DispatchError::RelayAttached);
		}
		let reader_stream = stream.try_clone()?;
		let link = RelayLink::new(stream);
		let (tx, rx) = mpsc::channel(self.config.queue_capacity);

		let reader = spawn_named_thread(TaskClass::IoBlocking, "bufsync-relay-reader", move || {
			pump(reader_stream, tx);
		})?;
		let thread = DispatchThread::new(rx, Arc::clone(&self.registry), Arc::clone(&self.host), link.clone());
		let dispatch = spawn_named_thread(TaskClass::Interactive, "bufsync-dispatch", move || thread.run())?;

		self.connection = Some(Connection {
			link,
			reader,
			dispatch,
			relay: None,
		});
		Ok(())
	}

	/// Launches the relay process against the host RPC address `server` and waits up
	/// to the configured timeout for it to connect back.
	///
	/// Blocks the calling thread while waiting.
	pub fn spawn_relay(&mut self, server: &str) -> Result<()> {
		if self.connection.is_some() {
			return Err(DispatchError::RelayAttached);
		}
		let seq = CHANNEL_SEQ.fetch_add(1, Ordering::Relaxed);
		let path = socket_dir().join(channel_socket_name(std::process::id(), seq));
		remove_stale(&path)?;
		let listener = UnixListener::bind(&path)?;
		listener.set_nonblocking(true)?;

		let program = &self.config.relay_program;
		let spawned = Command::new(program)
			.arg("--server")
			.arg(server)
			.arg("--channel")
			.arg(&path)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.spawn();
		let mut child = match spawned {
			Ok(child) => child,
			Err(source) => {
				let _ = std::fs::remove_file(&path);
				return Err(DispatchError::RelaySpawn {
					program: program.clone(),
					source,
				});
			}
		};
		info!(pid = child.id(), channel = %path.display(), "dispatch.relay_spawned");

		let accepted = accept_relay(&listener, &mut child, self.config.connect_timeout());
		let _ = std::fs::remove_file(&path);
		let stream = match accepted {
			Ok(stream) => stream,
			Err(e) => {
				let _ = child.kill();
				let _ = child.wait();
				return Err(e);
			}
		};
		stream.set_nonblocking(false)?;
		self.attach_relay(stream)?;
		if let Some(connection) = self.connection.as_mut() {
			connection.relay = Some(child);
		}
		Ok(())
	}

	/// Asks the relay to attach to a buffer created after startup.
	pub fn watch(&self, buffer: BufferId) -> Result<()> {
		let connection = self.connection.as_ref().ok_or(DispatchError::NotAttached)?;
		connection.link.send(&HostMessage::Watch(buffer))?;
		Ok(())
	}

	/// Whether the dispatch thread is still consuming relay messages.
	pub fn is_running(&self) -> bool {
		self.connection.as_ref().is_some_and(|c| !c.dispatch.is_finished())
	}

	/// Sends the shutdown sentinel to the relay and waits for both threads and the relay
	/// process to finish. Idempotent.
	///
	/// Shutdown is cooperative: nothing is closed or killed. If the relay has not
	/// answered within the connect timeout the wait continues on a background thread
	/// and this call returns.
	pub fn shutdown(&mut self) {
		let Some(connection) = self.connection.take() else {
			return;
		};
		connection.link.send_shutdown();

		let deadline = Instant::now() + self.config.connect_timeout();
		while !connection.is_finished() && Instant::now() < deadline {
			std::thread::sleep(POLL_INTERVAL);
		}
		if !connection.is_finished() {
			warn!(timeout = ?self.config.connect_timeout(), "dispatch.shutdown_timeout");
			let waiter = spawn_named_thread(TaskClass::Background, "bufsync-relay-waiter", move || connection.finish());
			if let Err(e) = waiter {
				warn!(error = %e, "dispatch.waiter_spawn_failed");
			}
			return;
		}
		connection.finish();
	}
}

impl Drop for Dispatcher {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn remove_stale(path: &Path) -> io::Result<()> {
	match std::fs::remove_file(path) {
		Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
		_ => Ok(()),
	}
}

fn accept_relay(listener: &UnixListener, child: &mut Child, timeout: Duration) -> Result<UnixStream> {
	let deadline = Instant::now() + timeout;
	loop {
		match listener.accept() {
			Ok((stream, _)) => return Ok(stream),
			Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
			Err(e) => return Err(e.into()),
		}
		if let Some(status) = child.try_wait()? {
			return Err(DispatchError::RelayExited(status));
		}
		if Instant::now() >= deadline {
			return Err(DispatchError::ConnectTimeout(timeout));
		}
		std::thread::sleep(POLL_INTERVAL);
	}
}
