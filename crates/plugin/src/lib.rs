//! Host side of bufsync.
//!
//! The `bufsync` binary runs as a Neovim RPC job. It owns the [`Dispatcher`], launches
//! the relay against a server socket of the same Neovim instance and registers the
//! [`SyntaxListener`] for the configured file types.
//!
//! [`Dispatcher`]: bufsync_dispatch::Dispatcher

mod nvim;
mod syntax;

// Used by the `bufsync` binary.
use bufsync_proto as _;
use clap as _;
use tracing_subscriber as _;
use tokio as _;
use tree_sitter_java as _;

pub use nvim::{
	HostRequest, SHUTDOWN_NOTIFICATION, WATCH_NOTIFICATION, buffer_lines, channel_id, install_autocmds, start_server,
};
pub use syntax::{SyntaxListener, outline_file};
