//! Listener registry and the dispatch side of the relay channel.
//!
//! A [`Dispatcher`] owns the registry, the connection to the relay process and two
//! threads: a reader pumping relay frames into a bounded queue, and the
//! [dispatch thread](DispatchThread) draining that queue. For every change the dispatch
//! thread resolves the matching listeners and schedules one job on the host context
//! that invokes them in order. Listeners never run on the dispatch thread itself.

/// Typed configuration loaded from TOML.
pub mod config;
mod dispatcher;
mod error;
mod listener;
mod registry;
mod selection;
mod slot;
mod thread;
mod transport;

pub use config::{Config, ConfigError, SyntaxConfig};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, Result};
pub use listener::{DebugListener, FnListener, Listener};
pub use registry::ListenerRegistry;
pub use selection::{Selection, SelectionKind};
pub use slot::{DispatcherSlot, SlotClaim};
pub use thread::DispatchThread;
pub use transport::{QueueItem, RelayLink};
