//! msgpack-rpc client for the editing host.
//!
//! This crate provides the pieces needed to drive a Neovim-style RPC peer:
//! * [`Message`]: the three msgpack-rpc message shapes and their value encoding
//! * [`MessageReader`]: incremental decoding of a message stream
//! * [`RpcClient`]: cloneable handle issuing requests and notifications
//! * [`connect`]: spawns the main loop that owns the transport

#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod message;
pub mod protocol;

pub use client::{Connection, RpcClient, connect, connect_unix};
pub use error::{Result, RpcError};
pub use message::{Message, MessageReader, Notification, Request, Response, write_message};
pub use protocol::CounterIdGen;
pub use rmpv::Value;
