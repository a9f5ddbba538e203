//! Neovim side of the plugin: server socket, autocommands and buffer reads.

use std::path::Path;

use anyhow::Context;
use bufsync_document::{BoxError, LineSource};
use bufsync_primitives::BufferId;
use bufsync_rpc::{Notification, RpcClient, Value};

/// Sent with a buffer number when a buffer is added or renamed.
pub const WATCH_NOTIFICATION: &str = "bufsync_watch";
/// Sent by the `VimLeavePre` autocommand.
pub const SHUTDOWN_NOTIFICATION: &str = "bufsync_shutdown";

const AUGROUP: &str = "bufsync";

/// A notification the plugin acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
	Watch(BufferId),
	Shutdown,
}

impl HostRequest {
	pub fn parse(notification: &Notification) -> Option<Self> {
		match notification.method.as_str() {
			WATCH_NOTIFICATION => notification
				.params
				.first()
				.and_then(Value::as_u64)
				.map(|id| Self::Watch(BufferId(id))),
			SHUTDOWN_NOTIFICATION => Some(Self::Shutdown),
			_ => None,
		}
	}
}

/// Id of the RPC channel this process is connected on.
pub async fn channel_id(client: &RpcClient) -> anyhow::Result<u64> {
	let info = client.call("nvim_get_api_info", vec![]).await?;
	info.as_array()
		.and_then(|info| info.first())
		.and_then(Value::as_u64)
		.context("nvim_get_api_info returned no channel id")
}

/// Starts an additional RPC server of the host at `path` and returns its address.
pub async fn start_server(client: &RpcClient, path: &Path) -> anyhow::Result<String> {
	let path = path.to_string_lossy();
	let address = client
		.call(
			"nvim_call_function",
			vec![Value::from("serverstart"), Value::Array(vec![Value::from(path.as_ref())])],
		)
		.await
		.with_context(|| format!("serverstart({path})"))?;
	address
		.as_str()
		.map(str::to_owned)
		.context("serverstart returned no address")
}

/// Autocommands notifying `channel` about new and renamed buffers and editor exit.
pub fn autocmds(channel: u64) -> Vec<String> {
	vec![
		format!("augroup {AUGROUP}"),
		"autocmd!".to_string(),
		"augroup END".to_string(),
		format!(
			"autocmd {AUGROUP} BufAdd * call rpcnotify({channel}, '{WATCH_NOTIFICATION}', str2nr(expand('<abuf>')))"
		),
		format!(
			"autocmd {AUGROUP} BufFilePost * call rpcnotify({channel}, '{WATCH_NOTIFICATION}', str2nr(expand('<abuf>')))"
		),
		format!("autocmd {AUGROUP} VimLeavePre * call rpcnotify({channel}, '{SHUTDOWN_NOTIFICATION}')"),
	]
}

/// Installs [`autocmds`], replacing any left by an earlier instance.
pub async fn install_autocmds(client: &RpcClient, channel: u64) -> anyhow::Result<()> {
	for command in autocmds(channel) {
		client
			.call("nvim_command", vec![Value::from(command.as_str())])
			.await
			.with_context(|| format!("running `{command}`"))?;
	}
	Ok(())
}

/// [`LineSource`] reading whole buffers with `nvim_buf_get_lines`.
///
/// Blocks the calling thread; use it from the host context, never from the runtime.
pub fn buffer_lines(client: RpcClient) -> impl LineSource {
	move |buffer: BufferId| -> Result<Vec<String>, BoxError> {
		let params = vec![Value::from(buffer.0), Value::from(0), Value::from(-1), Value::Boolean(false)];
		let lines = client.call_blocking("nvim_buf_get_lines", params)?;
		decode_lines(&lines).ok_or_else(|| format!("nvim_buf_get_lines returned {lines}").into())
	}
}

fn decode_lines(value: &Value) -> Option<Vec<String>> {
	value
		.as_array()?
		.iter()
		.map(|line| match line {
			Value::String(s) => Some(String::from_utf8_lossy(s.as_bytes()).into_owned()),
			Value::Binary(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
			_ => None,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn notification(method: &str, params: Vec<Value>) -> Notification {
		Notification {
			method: method.to_string(),
			params,
		}
	}

	#[test]
	fn parses_plugin_notifications() {
		assert_eq!(
			HostRequest::parse(&notification(WATCH_NOTIFICATION, vec![Value::from(7)])),
			Some(HostRequest::Watch(BufferId(7)))
		);
		assert_eq!(
			HostRequest::parse(&notification(SHUTDOWN_NOTIFICATION, vec![])),
			Some(HostRequest::Shutdown)
		);
		assert_eq!(HostRequest::parse(&notification(WATCH_NOTIFICATION, vec![])), None);
		assert_eq!(HostRequest::parse(&notification("nvim_buf_lines_event", vec![])), None);
	}

	#[test]
	fn autocmds_target_the_channel() {
		let commands = autocmds(3);
		assert_eq!(&commands[..3], ["augroup bufsync", "autocmd!", "augroup END"]);
		assert_eq!(
			commands[3],
			"autocmd bufsync BufAdd * call rpcnotify(3, 'bufsync_watch', str2nr(expand('<abuf>')))"
		);
		assert_eq!(
			commands[4],
			"autocmd bufsync BufFilePost * call rpcnotify(3, 'bufsync_watch', str2nr(expand('<abuf>')))"
		);
		assert_eq!(commands[5], "autocmd bufsync VimLeavePre * call rpcnotify(3, 'bufsync_shutdown')");
	}

	#[test]
	fn decodes_buffer_lines() {
		let value = Value::Array(vec![Value::from("class A {"), Value::Binary(b"}".to_vec())]);
		assert_eq!(decode_lines(&value), Some(vec!["class A {".to_string(), "}".to_string()]));
		assert_eq!(decode_lines(&Value::Array(vec![Value::from(1)])), None);
		assert_eq!(decode_lines(&Value::Nil), None);
	}
}
