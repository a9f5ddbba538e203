//! The relay process.
//!
//! Runs outside the host process, subscribes to the host's buffer notifications over
//! RPC and forwards them, normalized, over the relay channel. The host side can ask
//! for additional buffers to be watched; either side ends the session with a
//! `Shutdown` sentinel.
#![cfg_attr(test, allow(unused_crate_dependencies))]

mod error;
/// Neovim implementation of [`ChangeSource`].
pub mod nvim;
mod relay;
mod source;

// Used by the `bufsync-relay` binary.
use anyhow as _;
use clap as _;
use tracing_subscriber as _;

pub use error::{RelayError, Result};
pub use nvim::NvimChangeSource;
pub use relay::{EventRelay, RelayExit};
pub use source::ChangeSource;
