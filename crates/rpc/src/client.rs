//! RPC client handle and the main loop owning the transport.

use std::collections::HashMap;
use std::path::Path;

use bufsync_worker::{TaskClass, spawn};
use rmpv::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::message::{Message, MessageReader, Notification, Request, Response, write_message};
use crate::{CounterIdGen, Result, RpcError};

enum MainLoopEvent {
	Call {
		method: String,
		params: Vec<Value>,
		reply: oneshot::Sender<Response>,
	},
	Notify(Notification),
}

/// Cloneable handle to a running connection.
///
/// Calls fail with [`RpcError::Closed`] once the main loop has exited.
#[derive(Clone)]
pub struct RpcClient {
	tx: mpsc::UnboundedSender<MainLoopEvent>,
}

impl RpcClient {
	/// Sends a request and waits for its response.
	pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
		let reply = self.submit(method, params)?;
		reply.await.map_err(|_| RpcError::Closed)?.into_result(method)
	}

	/// Blocking variant of [`call`](Self::call) for threads outside the runtime.
	///
	/// # Panics
	///
	/// Panics when called from within an asynchronous execution context.
	pub fn call_blocking(&self, method: &str, params: Vec<Value>) -> Result<Value> {
		let reply = self.submit(method, params)?;
		reply.blocking_recv().map_err(|_| RpcError::Closed)?.into_result(method)
	}

	/// Sends a notification without waiting for it to be written.
	pub fn notify(&self, method: &str, params: Vec<Value>) -> Result<()> {
		self.tx
			.send(MainLoopEvent::Notify(Notification {
				method: method.to_string(),
				params,
			}))
			.map_err(|_| RpcError::Closed)
	}

	fn submit(&self, method: &str, params: Vec<Value>) -> Result<oneshot::Receiver<Response>> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(MainLoopEvent::Call {
				method: method.to_string(),
				params,
				reply,
			})
			.map_err(|_| RpcError::Closed)?;
		Ok(rx)
	}
}

/// A live connection: the client handle, inbound notifications and the main loop task.
pub struct Connection {
	/// Handle for issuing requests.
	pub client: RpcClient,
	/// Notifications sent by the peer, in arrival order. Closes when the connection ends.
	pub notifications: mpsc::UnboundedReceiver<Notification>,
	/// Resolves when the transport closes or fails.
	pub driver: JoinHandle<Result<()>>,
}

/// Starts a connection over an arbitrary byte stream pair (e.g. stdio).
pub fn connect<R, W>(input: R, output: W) -> Connection
where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin + Send + 'static,
{
	let (tx, rx) = mpsc::unbounded_channel();
	let (notify_tx, notifications) = mpsc::unbounded_channel();
	let main_loop = MainLoop {
		reader: MessageReader::new(input),
		output,
		rx,
		ids: CounterIdGen::new(),
		outgoing: HashMap::new(),
		notifications: notify_tx,
	};
	let driver = spawn(TaskClass::Interactive, main_loop.run());
	Connection {
		client: RpcClient { tx },
		notifications,
		driver,
	}
}

/// Connects to a peer listening on a Unix domain socket.
pub async fn connect_unix(path: impl AsRef<Path>) -> Result<Connection> {
	let stream = UnixStream::connect(path.as_ref()).await?;
	debug!(path = %path.as_ref().display(), "rpc.connected");
	let (read, write) = stream.into_split();
	Ok(connect(read, write))
}

struct MainLoop<R, W> {
	reader: MessageReader<R>,
	output: W,
	rx: mpsc::UnboundedReceiver<MainLoopEvent>,
	ids: CounterIdGen,
	/// Pending outgoing requests awaiting responses.
	outgoing: HashMap<u32, oneshot::Sender<Response>>,
	notifications: mpsc::UnboundedSender<Notification>,
}

impl<R, W> MainLoop<R, W>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	async fn run(mut self) -> Result<()> {
		let ret = loop {
			tokio::select! {
				event = self.rx.recv() => match event {
					Some(event) => {
						if let Err(e) = self.dispatch_event(event).await {
							break Err(e);
						}
					}
					None => break Ok(()),
				},
				msg = self.reader.next() => match msg {
					Ok(Some(msg)) => {
						if let Err(e) = self.dispatch_message(msg).await {
							break Err(e);
						}
					}
					Ok(None) => {
						debug!("rpc.eof");
						break Ok(());
					}
					Err(e) => break Err(e),
				},
			}
		};
		if let Err(e) = &ret {
			warn!(error = %e, "rpc.main_loop_failed");
		}
		// Dropping the senders fails every pending call with `Closed`.
		self.outgoing.clear();
		ret
	}

	async fn dispatch_event(&mut self, event: MainLoopEvent) -> Result<()> {
		let message = match event {
			MainLoopEvent::Call { method, params, reply } => {
				let id = self.ids.next();
				trace!(id, method = %method, "rpc.call");
				self.outgoing.insert(id, reply);
				Message::Request(Request { id, method, params })
			}
			MainLoopEvent::Notify(notification) => {
				trace!(method = %notification.method, "rpc.notify");
				Message::Notification(notification)
			}
		};
		write_message(&mut self.output, message).await
	}

	async fn dispatch_message(&mut self, msg: Message) -> Result<()> {
		match msg {
			Message::Response(response) => match self.outgoing.remove(&response.id) {
				Some(reply) => {
					let _ = reply.send(response);
				}
				None => warn!(id = response.id, "rpc.unknown_response"),
			},
			Message::Notification(notification) => {
				if self.notifications.send(notification).is_err() {
					trace!("rpc.notification_dropped");
				}
			}
			Message::Request(request) => {
				debug!(id = request.id, method = %request.method, "rpc.unsupported_request");
				let response = Response::err(request.id, format!("unsupported request: {}", request.method));
				write_message(&mut self.output, Message::Response(response)).await?;
			}
		}
		Ok(())
	}
}
