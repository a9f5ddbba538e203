use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{DispatchError, Result};

/// Ownership token allowing at most one active [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Default)]
pub struct DispatcherSlot {
	active: AtomicBool,
}

/// Proof of holding a [`DispatcherSlot`]. Releases the slot on drop.
#[derive(Debug)]
pub struct SlotClaim {
	slot: Arc<DispatcherSlot>,
}

impl DispatcherSlot {
	pub const fn new() -> Self {
		Self {
			active: AtomicBool::new(false),
		}
	}

	pub fn claim(self: &Arc<Self>) -> Result<SlotClaim> {
		self.active
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.map_err(|_| DispatchError::AlreadyActive)?;
		Ok(SlotClaim { slot: Arc::clone(self) })
	}

	pub fn is_active(&self) -> bool {
		self.active.load(Ordering::Acquire)
	}
}

impl Drop for SlotClaim {
	fn drop(&mut self) {
		self.slot.active.store(false, Ordering::Release);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn second_claim_fails_until_the_first_is_released() {
		let slot = Arc::new(DispatcherSlot::new());
		let claim = slot.claim().unwrap();
		assert!(matches!(slot.claim(), Err(DispatchError::AlreadyActive)));
		drop(claim);
		assert!(!slot.is_active());
		assert!(slot.claim().is_ok());
	}
}
