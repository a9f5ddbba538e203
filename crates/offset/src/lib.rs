//! Ordered per-line length records with derived cumulative byte offsets.
//!
//! An [`OffsetChain`] maps a line index to the byte offset at which that line starts.
//! Elements live in a slab arena and link to their neighbours by arena key, while a
//! separate ordering vector keeps them index addressable. Every mutation reports the
//! lowest index whose offset may have moved and offsets are recomputed from there to
//! the end of the chain.

mod chain;
mod update;

pub use chain::{OffsetChain, OffsetChainElement};
pub use update::OffsetChainUpdate;
