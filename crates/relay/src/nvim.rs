use async_trait::async_trait;
use bufsync_primitives::{BufferId, BufferInfo, ChangeEvent, ChangeTick, LinesChanged};
use bufsync_rpc::{Notification, RpcClient, Value};
use bufsync_worker::{TaskClass, spawn};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::{ChangeSource, RelayError, Result};

const LINES_EVENT: &str = "nvim_buf_lines_event";
const DETACH_EVENT: &str = "nvim_buf_detach_event";

/// [`ChangeSource`] talking to Neovim over msgpack-rpc.
pub struct NvimChangeSource {
	client: RpcClient,
}

impl NvimChangeSource {
	pub fn new(client: RpcClient) -> Self {
		Self { client }
	}

	/// Turns the connection's notification stream into change events.
	///
	/// Notifications other than buffer updates are dropped, malformed ones are logged.
	pub fn event_stream(mut notifications: mpsc::UnboundedReceiver<Notification>) -> mpsc::UnboundedReceiver<ChangeEvent> {
		let (tx, rx) = mpsc::unbounded_channel();
		spawn(TaskClass::Interactive, async move {
			while let Some(notification) = notifications.recv().await {
				match normalize(&notification) {
					Ok(Some(event)) => {
						if tx.send(event).is_err() {
							break;
						}
					}
					Ok(None) => trace!(method = %notification.method, "nvim.notification_ignored"),
					Err(e) => warn!(error = %e, "nvim.notification_malformed"),
				}
			}
		});
		rx
	}
}

#[async_trait]
impl ChangeSource for NvimChangeSource {
	async fn open_buffers(&self) -> Result<Vec<BufferId>> {
		let buffers = self.client.call("nvim_list_bufs", vec![]).await?;
		let handles = match buffers {
			Value::Array(handles) => handles,
			other => {
				return Err(RelayError::Malformed {
					event: "nvim_list_bufs",
					reason: format!("expected array, got {other}"),
				});
			}
		};
		handles
			.iter()
			.map(|handle| {
				buffer_id(handle).ok_or_else(|| RelayError::Malformed {
					event: "nvim_list_bufs",
					reason: format!("invalid buffer handle {handle}"),
				})
			})
			.collect()
	}

	async fn attach(&self, buffer: BufferId) -> Result<BufferInfo> {
		let name = self.name(buffer).await?;
		let attached = self
			.client
			.call(
				"nvim_buf_attach",
				vec![Value::from(buffer.0), Value::Boolean(true), Value::Map(Vec::new())],
			)
			.await?;
		if attached.as_bool() != Some(true) {
			return Err(RelayError::AttachRefused(buffer));
		}
		Ok(BufferInfo::new(buffer, name))
	}

	async fn name(&self, buffer: BufferId) -> Result<String> {
		let name = self.client.call("nvim_buf_get_name", vec![Value::from(buffer.0)]).await?;
		Ok(text(&name).unwrap_or_default())
	}
}

/// Decodes a buffer handle: an extension value wrapping an integer, or a bare integer.
pub fn buffer_id(value: &Value) -> Option<BufferId> {
	match value {
		Value::Ext(_, data) => rmpv::decode::read_value(&mut data.as_slice())
			.ok()?
			.as_u64()
			.map(BufferId),
		other => other.as_u64().map(BufferId),
	}
}

fn text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(String::from_utf8_lossy(s.as_bytes()).into_owned()),
		Value::Binary(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
		_ => None,
	}
}

/// Maps a buffer notification to a [`ChangeEvent`].
///
/// Returns `Ok(None)` for notifications that are not buffer changes or detaches.
pub fn normalize(notification: &Notification) -> Result<Option<ChangeEvent>> {
	let params = notification.params.as_slice();
	match notification.method.as_str() {
		LINES_EVENT => {
			let [buffer, tick, first, last, lines, more] = params else {
				return Err(malformed(LINES_EVENT, format!("expected 6 arguments, got {}", params.len())));
			};
			let buffer = buffer_id(buffer).ok_or_else(|| malformed(LINES_EVENT, format!("invalid buffer {buffer}")))?;
			let first_line = first
				.as_u64()
				.ok_or_else(|| malformed(LINES_EVENT, format!("invalid firstline {first}")))?;
			let last_line = match last.as_i64() {
				Some(-1) => None,
				Some(n) if n >= 0 => Some(n as usize),
				_ => return Err(malformed(LINES_EVENT, format!("invalid lastline {last}"))),
			};
			let Value::Array(lines) = lines else {
				return Err(malformed(LINES_EVENT, format!("invalid linedata {lines}")));
			};
			let new_lines = lines
				.iter()
				.map(|line| text(line).ok_or_else(|| malformed(LINES_EVENT, format!("invalid line {line}"))))
				.collect::<Result<Vec<_>>>()?;
			Ok(Some(ChangeEvent::LinesChanged(LinesChanged {
				buffer,
				tick: tick.as_u64().map(ChangeTick),
				first_line: first_line as usize,
				last_line,
				new_lines,
				multipart: more.as_bool().unwrap_or(false),
			})))
		}
		DETACH_EVENT => {
			let buffer = params
				.first()
				.and_then(buffer_id)
				.ok_or_else(|| malformed(DETACH_EVENT, format!("invalid arguments {params:?}")))?;
			Ok(Some(ChangeEvent::Detached { buffer }))
		}
		_ => Ok(None),
	}
}

fn malformed(event: &'static str, reason: String) -> RelayError {
	RelayError::Malformed { event, reason }
}
