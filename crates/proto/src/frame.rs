//! Length-prefixed postcard framing, blocking and async flavours.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Largest accepted payload. Initial snapshots of huge buffers stay well below this.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Failure to read or write a frame.
#[derive(Debug, Error)]
pub enum FrameError {
	/// The underlying stream failed.
	#[error("relay channel I/O: {0}")]
	Io(#[from] io::Error),
	/// The payload could not be encoded or decoded.
	#[error("relay channel codec: {0}")]
	Codec(#[from] postcard::Error),
	/// A length prefix exceeded [`MAX_FRAME_LEN`].
	#[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
	TooLarge(usize),
	/// The stream ended in the middle of a frame.
	#[error("relay channel closed mid-frame")]
	Truncated,
}

fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, FrameError> {
	let payload = postcard::to_allocvec(msg)?;
	if payload.len() > MAX_FRAME_LEN {
		return Err(FrameError::TooLarge(payload.len()));
	}
	let mut buf = Vec::with_capacity(4 + payload.len());
	buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
	buf.extend_from_slice(&payload);
	Ok(buf)
}

fn check_len(len: u32) -> Result<usize, FrameError> {
	let len = len as usize;
	if len > MAX_FRAME_LEN {
		return Err(FrameError::TooLarge(len));
	}
	Ok(len)
}

/// Writes one frame and flushes.
pub fn write_frame<T: Serialize>(output: &mut impl Write, msg: &T) -> Result<(), FrameError> {
	output.write_all(&encode(msg)?)?;
	output.flush()?;
	Ok(())
}

/// Reads one frame.
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary.
pub fn read_frame<T: DeserializeOwned>(input: &mut impl Read) -> Result<Option<T>, FrameError> {
	let mut prefix = [0u8; 4];
	let mut filled = 0;
	while filled < prefix.len() {
		match input.read(&mut prefix[filled..]) {
			Ok(0) if filled == 0 => return Ok(None),
			Ok(0) => return Err(FrameError::Truncated),
			Ok(n) => filled += n,
			Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
			Err(e) => return Err(e.into()),
		}
	}
	let len = check_len(u32::from_le_bytes(prefix))?;
	let mut payload = vec![0u8; len];
	input.read_exact(&mut payload).map_err(|e| match e.kind() {
		io::ErrorKind::UnexpectedEof => FrameError::Truncated,
		_ => FrameError::Io(e),
	})?;
	Ok(Some(postcard::from_bytes(&payload)?))
}

/// Async counterpart of [`write_frame`].
pub async fn write_frame_async<T: Serialize>(
	output: &mut (impl tokio::io::AsyncWrite + Unpin),
	msg: &T,
) -> Result<(), FrameError> {
	output.write_all(&encode(msg)?).await?;
	output.flush().await?;
	Ok(())
}

/// Async counterpart of [`read_frame`].
pub async fn read_frame_async<T: DeserializeOwned>(
	input: &mut (impl tokio::io::AsyncRead + Unpin),
) -> Result<Option<T>, FrameError> {
	let len = match input.read_u32_le().await {
		Ok(len) => check_len(len)?,
		Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
		Err(e) => return Err(e.into()),
	};
	let mut payload = vec![0u8; len];
	input.read_exact(&mut payload).await.map_err(|e| match e.kind() {
		io::ErrorKind::UnexpectedEof => FrameError::Truncated,
		_ => FrameError::Io(e),
	})?;
	Ok(Some(postcard::from_bytes(&payload)?))
}
