//! msgpack-rpc message shapes and stream codec.

use std::io::Cursor;

use rmpv::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Result, RpcError};

const REQUEST: u64 = 0;
const RESPONSE: u64 = 1;
const NOTIFICATION: u64 = 2;

/// `[0, id, method, params]`
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
	/// Correlates the response.
	pub id: u32,
	/// Method name.
	pub method: String,
	/// Positional arguments.
	pub params: Vec<Value>,
}

/// `[1, id, error, result]`
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
	/// Id of the answered request.
	pub id: u32,
	/// `Nil` on success.
	pub error: Value,
	/// `Nil` on failure.
	pub result: Value,
}

/// `[2, method, params]`
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
	/// Event or method name.
	pub method: String,
	/// Positional arguments.
	pub params: Vec<Value>,
}

/// A msgpack-rpc message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
	/// A call expecting a response.
	Request(Request),
	/// The answer to a call.
	Response(Response),
	/// A one-way message.
	Notification(Notification),
}

impl Response {
	/// Successful response.
	pub fn ok(id: u32, result: Value) -> Self {
		Self {
			id,
			error: Value::Nil,
			result,
		}
	}

	/// Error response with a plain message.
	pub fn err(id: u32, message: impl Into<String>) -> Self {
		Self {
			id,
			error: Value::from(message.into()),
			result: Value::Nil,
		}
	}

	/// Splits the response into the result or a [`RpcError::Remote`] for `method`.
	pub fn into_result(self, method: &str) -> Result<Value> {
		if self.error.is_nil() {
			return Ok(self.result);
		}
		Err(RpcError::Remote {
			method: method.to_string(),
			message: remote_message(&self.error),
		})
	}
}

/// Neovim reports errors as `[kind, message]`; anything else is rendered verbatim.
fn remote_message(error: &Value) -> String {
	if let Some(s) = error.as_str() {
		return s.to_string();
	}
	if let Some([_, message]) = error.as_array().map(Vec::as_slice)
		&& let Some(message) = message.as_str()
	{
		return message.to_string();
	}
	error.to_string()
}

impl Message {
	/// Encodes the message as a msgpack value.
	pub fn into_value(self) -> Value {
		match self {
			Self::Request(Request { id, method, params }) => Value::Array(vec![
				Value::from(REQUEST),
				Value::from(id),
				Value::from(method),
				Value::Array(params),
			]),
			Self::Response(Response { id, error, result }) => {
				Value::Array(vec![Value::from(RESPONSE), Value::from(id), error, result])
			}
			Self::Notification(Notification { method, params }) => Value::Array(vec![
				Value::from(NOTIFICATION),
				Value::from(method),
				Value::Array(params),
			]),
		}
	}

	/// Decodes a msgpack value into a message.
	pub fn from_value(value: Value) -> Result<Self> {
		let items = match value {
			Value::Array(items) => items,
			other => return Err(RpcError::Protocol(format!("expected array, got {other}"))),
		};
		let mut items = items.into_iter();
		let kind = items.next().and_then(|v| v.as_u64());
		let message = match kind {
			Some(REQUEST) => {
				let id = take_id(items.next())?;
				let method = take_string(items.next())?;
				let params = take_params(items.next())?;
				Self::Request(Request { id, method, params })
			}
			Some(RESPONSE) => {
				let id = take_id(items.next())?;
				let error = items.next().unwrap_or(Value::Nil);
				let result = items.next().unwrap_or(Value::Nil);
				Self::Response(Response { id, error, result })
			}
			Some(NOTIFICATION) => {
				let method = take_string(items.next())?;
				let params = take_params(items.next())?;
				Self::Notification(Notification { method, params })
			}
			other => return Err(RpcError::Protocol(format!("unknown message type {other:?}"))),
		};
		Ok(message)
	}
}

fn take_id(value: Option<Value>) -> Result<u32> {
	value
		.as_ref()
		.and_then(Value::as_u64)
		.and_then(|id| u32::try_from(id).ok())
		.ok_or_else(|| RpcError::Protocol(format!("invalid message id {value:?}")))
}

fn take_string(value: Option<Value>) -> Result<String> {
	match value {
		Some(Value::String(s)) => s
			.into_str()
			.ok_or_else(|| RpcError::Protocol("method name is not UTF-8".into())),
		other => Err(RpcError::Protocol(format!("invalid method name {other:?}"))),
	}
}

fn take_params(value: Option<Value>) -> Result<Vec<Value>> {
	match value {
		Some(Value::Array(params)) => Ok(params),
		other => Err(RpcError::Protocol(format!("invalid params {other:?}"))),
	}
}

/// Encodes and writes one message, then flushes.
pub async fn write_message(output: &mut (impl AsyncWrite + Unpin), message: Message) -> Result<()> {
	let mut buf = Vec::new();
	rmpv::encode::write_value(&mut buf, &message.into_value()).map_err(|e| RpcError::Encode(e.to_string()))?;
	output.write_all(&buf).await?;
	output.flush().await?;
	Ok(())
}

/// Decodes messages from a byte stream that may split them arbitrarily.
///
/// [`next`](Self::next) is cancel safe: partially received bytes stay buffered.
pub struct MessageReader<R> {
	input: R,
	buf: Vec<u8>,
	scan: ValueScan,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
	/// Wraps a byte stream.
	pub fn new(input: R) -> Self {
		Self {
			input,
			buf: Vec::new(),
			scan: ValueScan::default(),
		}
	}

	/// Reads the next message. Returns `Ok(None)` when the stream ends between messages.
	pub async fn next(&mut self) -> Result<Option<Message>> {
		loop {
			if let Some(end) = self.scan.advance(&self.buf)? {
				self.scan = ValueScan::default();
				let value = rmpv::decode::read_value(&mut Cursor::new(&self.buf[..end]))?;
				self.buf.drain(..end);
				return Message::from_value(value).map(Some);
			}

			self.buf.reserve(64 * 1024);
			if self.input.read_buf(&mut self.buf).await? == 0 {
				if self.buf.is_empty() {
					return Ok(None);
				}
				return Err(RpcError::Protocol(format!(
					"stream ended inside a message ({} bytes pending)",
					self.buf.len()
				)));
			}
		}
	}
}

/// Resumable search for the end of the first msgpack value in a growing buffer.
///
/// Only value headers are inspected and scanning resumes where the last call stopped,
/// so a message arriving in many reads is walked once.
#[derive(Debug, Clone, Copy)]
struct ValueScan {
	/// Offset of the next header to read.
	pos: usize,
	/// Values still expected before the top-level value is complete.
	pending: usize,
}

impl Default for ValueScan {
	fn default() -> Self {
		Self { pos: 0, pending: 1 }
	}
}

impl ValueScan {
	/// Returns the length of the first complete value, or `None` until `buf` holds one.
	fn advance(&mut self, buf: &[u8]) -> Result<Option<usize>> {
		while self.pending > 0 {
			let Some((size, children)) = header(&buf[self.pos..])? else {
				return Ok(None);
			};
			if buf.len() - self.pos < size {
				return Ok(None);
			}
			self.pos += size;
			self.pending = (self.pending - 1).saturating_add(children);
		}
		Ok(Some(self.pos))
	}
}

/// Size of the value starting at `buf[0]`, excluding nested values, and the number of
/// nested values that follow it. `None` while the header itself is incomplete.
fn header(buf: &[u8]) -> Result<Option<(usize, usize)>> {
	let Some(&marker) = buf.first() else {
		return Ok(None);
	};
	let len = |width: usize| -> Option<usize> {
		let bytes = buf.get(1..1 + width)?;
		Some(bytes.iter().fold(0usize, |acc, b| (acc << 8) | usize::from(*b)))
	};
	let sized = |width: usize, extra: usize| len(width).map(|n| (1 + width + extra + n, 0));
	let nested = |width: usize, per: usize| len(width).map(|n| (1 + width, n.saturating_mul(per)));

	let parsed = match marker {
		0x00..=0x7f | 0xc0 | 0xc2 | 0xc3 | 0xe0..=0xff => Some((1, 0)),
		0x80..=0x8f => Some((1, 2 * usize::from(marker & 0x0f))),
		0x90..=0x9f => Some((1, usize::from(marker & 0x0f))),
		0xa0..=0xbf => Some((1 + usize::from(marker & 0x1f), 0)),
		0xc4 | 0xd9 => sized(1, 0),
		0xc5 | 0xda => sized(2, 0),
		0xc6 | 0xdb => sized(4, 0),
		0xc7 => sized(1, 1),
		0xc8 => sized(2, 1),
		0xc9 => sized(4, 1),
		0xcc | 0xd0 => Some((2, 0)),
		0xcd | 0xd1 => Some((3, 0)),
		0xca | 0xce | 0xd2 => Some((5, 0)),
		0xcb | 0xcf | 0xd3 => Some((9, 0)),
		0xd4 => Some((3, 0)),
		0xd5 => Some((4, 0)),
		0xd6 => Some((6, 0)),
		0xd7 => Some((10, 0)),
		0xd8 => Some((18, 0)),
		0xdc => nested(2, 1),
		0xdd => nested(4, 1),
		0xde => nested(2, 2),
		0xdf => nested(4, 2),
		0xc1 => return Err(RpcError::Protocol("reserved msgpack marker 0xc1".into())),
	};
	Ok(parsed)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn encode(message: Message) -> Vec<u8> {
		let mut buf = Vec::new();
		rmpv::encode::write_value(&mut buf, &message.into_value()).unwrap();
		buf
	}

	#[test]
	fn value_shapes_follow_msgpack_rpc() {
		let request = Message::Request(Request {
			id: 7,
			method: "nvim_buf_attach".into(),
			params: vec![Value::from(1), Value::Boolean(true)],
		});
		let value = request.clone().into_value();
		assert_eq!(value.as_array().unwrap()[0], Value::from(0));
		assert_eq!(value.as_array().unwrap()[2], Value::from("nvim_buf_attach"));
		assert_eq!(Message::from_value(value).unwrap(), request);
	}

	#[test]
	fn malformed_messages_are_protocol_errors() {
		for value in [
			Value::from(3),
			Value::Array(vec![Value::from(9)]),
			Value::Array(vec![Value::from(0), Value::from(-1), Value::from("m"), Value::Array(vec![])]),
			Value::Array(vec![Value::from(2), Value::from("m"), Value::Nil]),
		] {
			assert!(matches!(Message::from_value(value), Err(RpcError::Protocol(_))));
		}
	}

	#[test]
	fn remote_errors_use_the_message_part() {
		let response = Response {
			id: 1,
			error: Value::Array(vec![Value::from(0), Value::from("Invalid buffer id: 99")]),
			result: Value::Nil,
		};
		match response.into_result("nvim_buf_get_name") {
			Err(RpcError::Remote { method, message }) => {
				assert_eq!(method, "nvim_buf_get_name");
				assert_eq!(message, "Invalid buffer id: 99");
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[tokio::test]
	async fn reader_reassembles_split_messages() {
		let first = encode(Message::Notification(Notification {
			method: "nvim_buf_lines_event".into(),
			params: vec![Value::from("x".repeat(300))],
		}));
		let second = encode(Message::Response(Response::ok(3, Value::from(42))));

		let (mut tx, rx) = tokio::io::duplex(16);
		let writer = tokio::spawn(async move {
			let mut all = first.clone();
			all.extend_from_slice(&second);
			for chunk in all.chunks(5) {
				tx.write_all(chunk).await.unwrap();
			}
		});

		let mut reader = MessageReader::new(rx);
		let Some(Message::Notification(n)) = reader.next().await.unwrap() else {
			panic!("expected notification");
		};
		assert_eq!(n.method, "nvim_buf_lines_event");
		assert_eq!(reader.next().await.unwrap(), Some(Message::Response(Response::ok(3, Value::from(42)))));
		writer.await.unwrap();
		assert_eq!(reader.next().await.unwrap(), None);
	}

	#[test]
	fn scan_finds_value_end_across_nested_shapes() {
		let mut bytes = Vec::new();
		let value = Value::Array(vec![
			Value::from(2),
			Value::from("m"),
			Value::Map(vec![(Value::from("k"), Value::Binary(vec![7; 300]))]),
			Value::Ext(1, vec![0; 4]),
			Value::F64(1.5),
			Value::from(-70_000),
			Value::Array((0..20).map(Value::from).collect()),
		]);
		rmpv::encode::write_value(&mut bytes, &value).unwrap();
		let end = bytes.len();
		bytes.extend_from_slice(&[0x91, 0x01]);

		let mut scan = ValueScan::default();
		for cut in 0..end {
			assert_eq!(scan.advance(&bytes[..cut]).unwrap(), None, "cut at {cut}");
		}
		assert_eq!(scan.advance(&bytes).unwrap(), Some(end));
		assert!(matches!(ValueScan::default().advance(&[0xc1]), Err(RpcError::Protocol(_))));
	}

	#[tokio::test]
	async fn large_message_in_small_reads_decodes_once_complete() {
		let lines: Vec<Value> = (0..2_000).map(|i| Value::from(format!("line {i:05} of a big buffer"))).collect();
		let notification = Message::Notification(Notification {
			method: "nvim_buf_lines_event".into(),
			params: vec![Value::Array(lines)],
		});
		let bytes = encode(notification.clone());
		assert!(bytes.len() > 64 * 1024 / 2);

		let (mut tx, rx) = tokio::io::duplex(64);
		let writer = tokio::spawn(async move {
			for chunk in bytes.chunks(7) {
				tx.write_all(chunk).await.unwrap();
			}
		});

		let mut reader = MessageReader::new(rx);
		assert_eq!(reader.next().await.unwrap(), Some(notification));
		writer.await.unwrap();
		assert_eq!(reader.next().await.unwrap(), None);
	}

	#[tokio::test]
	async fn truncated_stream_is_an_error() {
		let mut bytes = encode(Message::Response(Response::ok(1, Value::from("done"))));
		bytes.truncate(bytes.len() - 2);
		let mut reader = MessageReader::new(bytes.as_slice());
		assert!(matches!(reader.next().await, Err(RpcError::Protocol(_))));
	}
}
