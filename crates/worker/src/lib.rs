//! Worker primitives shared by the dispatcher, the relay and the document layer.
//!
//! * [`spawn`] and friends route tasks and threads through one place with a
//!   [`TaskClass`] label for tracing.
//! * [`HostContext`] is the re-entry point into the host's single logical thread;
//!   [`HostLoop`] is the in-process implementation of that thread.
//! * [`DebouncedAction`] coalesces bursts of resets into one host job.

mod class;
mod debounce;
mod host;
mod panic;
mod spawn;

pub use class::TaskClass;
pub use debounce::DebouncedAction;
pub use host::{HostClosed, HostContext, HostHandle, HostJob, HostLoop};
pub use panic::{join_error_panic_message, panic_message};
pub use spawn::{spawn, spawn_blocking, spawn_named_thread};
