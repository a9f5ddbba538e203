//! Request id generation.

/// Simple counter-based ID generator.
///
/// msgpack-rpc ids are 32-bit; the counter wraps around.
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterIdGen(pub u32);

impl CounterIdGen {
	/// Creates a new counter starting at 0.
	#[must_use]
	pub const fn new() -> Self {
		Self(0)
	}

	/// Generates the next ID and increments the counter.
	#[allow(clippy::should_implement_trait, reason = "convention")]
	pub fn next(&mut self) -> u32 {
		let id = self.0;
		self.0 = self.0.wrapping_add(1);
		id
	}
}
