//! Shared wire types for the relay channel.
//!
//! The relay process and the dispatcher exchange length-prefixed postcard frames over
//! a Unix domain socket: a little-endian `u32` byte count followed by the payload.
//! Both directions end with an explicit `Shutdown` message; a closed socket without
//! one means the peer died.

#![warn(missing_docs)]

pub mod frame;
pub mod paths;
pub mod types;

pub use frame::{FrameError, MAX_FRAME_LEN, read_frame, read_frame_async, write_frame, write_frame_async};
pub use types::{HostMessage, RelayMessage};
