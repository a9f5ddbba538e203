//! Shared value types for buffer change synchronization.
//!
//! Everything in this crate is plain data: it crosses the relay process boundary,
//! so host handles are always normalized to [`BufferId`] before they get here.

/// Change events emitted by the editing host.
pub mod event;
/// Identifier types for host buffers.
pub mod ids;

pub use event::{ChangeEvent, EditShape, LinesChanged};
pub use ids::{BufferId, BufferInfo, ChangeTick};
