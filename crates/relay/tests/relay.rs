#![allow(unused_crate_dependencies)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bufsync_primitives::{BufferId, BufferInfo, ChangeEvent, ChangeTick, LinesChanged};
use bufsync_proto::{HostMessage, RelayMessage, read_frame_async, write_frame_async};
use bufsync_relay::{ChangeSource, EventRelay, NvimChangeSource, RelayError, RelayExit, Result};
use bufsync_rpc::{Message, MessageReader, Notification, Response, Value, write_message};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

#[derive(Default)]
struct FakeSource {
	open: Vec<BufferId>,
	names: Arc<Mutex<HashMap<BufferId, &'static str>>>,
	attaches: Arc<Mutex<Vec<BufferId>>>,
}

#[async_trait]
impl ChangeSource for FakeSource {
	async fn open_buffers(&self) -> Result<Vec<BufferId>> {
		Ok(self.open.clone())
	}

	async fn attach(&self, buffer: BufferId) -> Result<BufferInfo> {
		self.attaches.lock().push(buffer);
		let name = self.names.lock().get(&buffer).copied();
		match name {
			Some(name) => Ok(BufferInfo::new(buffer, name)),
			None => Err(RelayError::AttachRefused(buffer)),
		}
	}

	async fn name(&self, buffer: BufferId) -> Result<String> {
		let name = self.names.lock().get(&buffer).copied();
		name.map(str::to_string).ok_or(RelayError::AttachRefused(buffer))
	}
}

struct HostSide {
	input: ReadHalf<DuplexStream>,
	output: WriteHalf<DuplexStream>,
}

impl HostSide {
	async fn recv(&mut self) -> Option<RelayMessage> {
		read_frame_async(&mut self.input).await.unwrap()
	}

	async fn send(&mut self, msg: HostMessage) {
		write_frame_async(&mut self.output, &msg).await.unwrap();
	}
}

fn channel() -> (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>, HostSide) {
	let (relay_end, host_end) = tokio::io::duplex(64 * 1024);
	let (relay_read, relay_write) = tokio::io::split(relay_end);
	let (input, output) = tokio::io::split(host_end);
	(relay_read, relay_write, HostSide { input, output })
}

fn attached(buffer: u64, name: &str) -> RelayMessage {
	RelayMessage::Attached(BufferInfo::new(BufferId(buffer), name))
}

fn change(buffer: u64) -> ChangeEvent {
	ChangeEvent::LinesChanged(LinesChanged {
		buffer: BufferId(buffer),
		tick: Some(ChangeTick(4)),
		first_line: 0,
		last_line: Some(0),
		new_lines: vec!["import java.util.List;".to_string()],
		multipart: false,
	})
}

fn source(open: &[u64], names: &[(u64, &'static str)]) -> FakeSource {
	FakeSource {
		open: open.iter().copied().map(BufferId).collect(),
		names: Arc::new(Mutex::new(names.iter().map(|&(id, name)| (BufferId(id), name)).collect())),
		attaches: Arc::default(),
	}
}

#[tokio::test]
async fn attaches_open_buffers_then_serves_watch_and_events() {
	let source = source(&[1, 2], &[(1, "/a/A.java"), (2, "/b/B.txt"), (5, "/c/C.java")]);
	let attaches = Arc::clone(&source.attaches);
	let (events_tx, events_rx) = mpsc::unbounded_channel();
	let (input, output, mut host) = channel();

	let host_side = async move {
		assert_eq!(host.recv().await, Some(attached(1, "/a/A.java")));
		assert_eq!(host.recv().await, Some(attached(2, "/b/B.txt")));

		host.send(HostMessage::Watch(BufferId(5))).await;
		assert_eq!(host.recv().await, Some(attached(5, "/c/C.java")));

		host.send(HostMessage::Watch(BufferId(5))).await;
		host.send(HostMessage::Watch(BufferId(1))).await;
		events_tx.send(change(1)).unwrap();
		assert_eq!(host.recv().await, Some(RelayMessage::Event(change(1))));

		host.send(HostMessage::Shutdown).await;
		assert_eq!(host.recv().await, Some(RelayMessage::Shutdown));
		events_tx
	};

	let (exit, _events_tx) = tokio::join!(EventRelay::new(source).run(events_rx, input, output), host_side);
	assert_eq!(exit.unwrap(), RelayExit::HostShutdown);
	assert_eq!(*attaches.lock(), [BufferId(1), BufferId(2), BufferId(5)]);
}

#[tokio::test]
async fn source_end_waits_for_the_host_sentinel() {
	let source = source(&[], &[(3, "/x")]);
	let attaches = Arc::clone(&source.attaches);
	let (events_tx, events_rx) = mpsc::unbounded_channel::<ChangeEvent>();
	let (input, output, mut host) = channel();
	drop(events_tx);

	let host_side = async move {
		assert_eq!(host.recv().await, Some(RelayMessage::Shutdown));
		host.send(HostMessage::Watch(BufferId(3))).await;
		host.send(HostMessage::Shutdown).await;
		assert_eq!(host.recv().await, None);
	};

	let (exit, ()) = tokio::join!(EventRelay::new(source).run(events_rx, input, output), host_side);
	assert_eq!(exit.unwrap(), RelayExit::SourceClosed);
	assert!(attaches.lock().is_empty());
}

#[tokio::test]
async fn channel_loss_ends_the_session() {
	let (_events_tx, events_rx) = mpsc::unbounded_channel::<ChangeEvent>();
	let (input, output, host) = channel();
	drop(host);
	let exit = EventRelay::new(source(&[], &[])).run(events_rx, input, output).await;
	assert_eq!(exit.unwrap(), RelayExit::ChannelLost);
}

#[tokio::test]
async fn failed_attach_is_skipped_and_retried_on_request() {
	let source = source(&[9, 1], &[(1, "/a")]);
	let attaches = Arc::clone(&source.attaches);
	let (events_tx, events_rx) = mpsc::unbounded_channel();
	let (input, output, mut host) = channel();

	let host_side = async move {
		assert_eq!(host.recv().await, Some(attached(1, "/a")));
		host.send(HostMessage::Watch(BufferId(9))).await;

		events_tx.send(ChangeEvent::Detached { buffer: BufferId(1) }).unwrap();
		assert_eq!(
			host.recv().await,
			Some(RelayMessage::Event(ChangeEvent::Detached { buffer: BufferId(1) }))
		);
		host.send(HostMessage::Watch(BufferId(1))).await;
		assert_eq!(host.recv().await, Some(attached(1, "/a")));

		host.send(HostMessage::Shutdown).await;
		assert_eq!(host.recv().await, Some(RelayMessage::Shutdown));
		events_tx
	};

	let (exit, _events_tx) = tokio::join!(EventRelay::new(source).run(events_rx, input, output), host_side);
	assert_eq!(exit.unwrap(), RelayExit::HostShutdown);
	let attaches = attaches.lock().clone();
	assert_eq!(attaches.iter().filter(|&&b| b == BufferId(9)).count(), 2);
	assert_eq!(attaches.iter().filter(|&&b| b == BufferId(1)).count(), 2);
}

#[tokio::test]
async fn watch_after_rename_resends_attached() {
	let source = source(&[1], &[(1, "")]);
	let names = Arc::clone(&source.names);
	let attaches = Arc::clone(&source.attaches);
	let (events_tx, events_rx) = mpsc::unbounded_channel();
	let (input, output, mut host) = channel();

	let host_side = async move {
		assert_eq!(host.recv().await, Some(attached(1, "")));

		names.lock().insert(BufferId(1), "/src/Foo.java");
		host.send(HostMessage::Watch(BufferId(1))).await;
		assert_eq!(host.recv().await, Some(attached(1, "/src/Foo.java")));

		host.send(HostMessage::Watch(BufferId(1))).await;
		events_tx.send(change(1)).unwrap();
		assert_eq!(host.recv().await, Some(RelayMessage::Event(change(1))));

		host.send(HostMessage::Shutdown).await;
		assert_eq!(host.recv().await, Some(RelayMessage::Shutdown));
		events_tx
	};

	let (exit, _events_tx) = tokio::join!(EventRelay::new(source).run(events_rx, input, output), host_side);
	assert_eq!(exit.unwrap(), RelayExit::HostShutdown);
	assert_eq!(*attaches.lock(), [BufferId(1)]);
}

fn ext_buffer(id: u64) -> Value {
	let mut data = Vec::new();
	rmpv::encode::write_value(&mut data, &Value::from(id)).unwrap();
	Value::Ext(0, data)
}

struct FakeNvim {
	reader: MessageReader<ReadHalf<DuplexStream>>,
	writer: WriteHalf<DuplexStream>,
}

impl FakeNvim {
	async fn answer(&mut self, method: &str, result: Value) -> Vec<Value> {
		let Some(Message::Request(request)) = self.reader.next().await.unwrap() else {
			panic!("expected a request for {method}");
		};
		assert_eq!(request.method, method);
		write_message(&mut self.writer, Message::Response(Response::ok(request.id, result)))
			.await
			.unwrap();
		request.params
	}

	async fn notify(&mut self, method: &str, params: Vec<Value>) {
		let notification = Notification {
			method: method.to_string(),
			params,
		};
		write_message(&mut self.writer, Message::Notification(notification)).await.unwrap();
	}
}

#[tokio::test]
async fn relays_neovim_notifications_end_to_end() {
	let (client_end, nvim_end) = tokio::io::duplex(64 * 1024);
	let (client_read, client_write) = tokio::io::split(client_end);
	let (nvim_read, nvim_write) = tokio::io::split(nvim_end);
	let rpc = bufsync_rpc::connect(client_read, client_write);
	let mut nvim = FakeNvim {
		reader: MessageReader::new(nvim_read),
		writer: nvim_write,
	};

	let events = NvimChangeSource::event_stream(rpc.notifications);
	let relay = EventRelay::new(NvimChangeSource::new(rpc.client));
	let (input, output, mut host) = channel();

	let nvim_side = async move {
		nvim.answer("nvim_list_bufs", Value::Array(vec![ext_buffer(1)])).await;
		let params = nvim.answer("nvim_buf_get_name", Value::from("/src/Main.java")).await;
		assert_eq!(params, vec![Value::from(1u64)]);
		let params = nvim.answer("nvim_buf_attach", Value::Boolean(true)).await;
		assert_eq!(params[1], Value::Boolean(true));

		nvim.notify(
			"nvim_buf_lines_event",
			vec![
				ext_buffer(1),
				Value::from(3),
				Value::from(0),
				Value::from(-1),
				Value::Array(vec![Value::from("class Main {}")]),
				Value::Boolean(false),
			],
		)
		.await;
		nvim.notify("nvim_buf_changedtick_event", vec![ext_buffer(1), Value::from(4)]).await;
		nvim.notify("nvim_buf_detach_event", vec![ext_buffer(1)]).await;
		nvim
	};

	let host_side = async move {
		assert_eq!(host.recv().await, Some(attached(1, "/src/Main.java")));
		let Some(RelayMessage::Event(ChangeEvent::LinesChanged(snapshot))) = host.recv().await else {
			panic!("expected the initial snapshot");
		};
		assert!(snapshot.is_snapshot());
		assert_eq!(snapshot.new_lines, vec!["class Main {}".to_string()]);
		assert_eq!(
			host.recv().await,
			Some(RelayMessage::Event(ChangeEvent::Detached { buffer: BufferId(1) }))
		);
		host.send(HostMessage::Shutdown).await;
		assert_eq!(host.recv().await, Some(RelayMessage::Shutdown));
	};

	let (exit, _nvim, ()) = tokio::join!(relay.run(events, input, output), nvim_side, host_side);
	assert_eq!(exit.unwrap(), RelayExit::HostShutdown);
}
