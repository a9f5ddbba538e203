use slab::Slab;

use crate::OffsetChainUpdate;

/// One line record of an [`OffsetChain`].
///
/// `prev`/`next` are arena keys of the neighbouring records, not positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetChainElement {
	length: usize,
	offset: usize,
	prev: Option<usize>,
	next: Option<usize>,
}

impl OffsetChainElement {
	/// Byte length of the line, terminator included.
	pub fn length(&self) -> usize {
		self.length
	}

	/// Byte offset at which the line starts.
	pub fn offset(&self) -> usize {
		self.offset
	}

	/// Byte offset one past the end of the line.
	pub fn end(&self) -> usize {
		self.offset + self.length
	}
}

/// Index-addressable chain of line lengths with cumulative offsets.
///
/// Invariant: for every element `e` with predecessor `p`,
/// `offset(e) == offset(p) + length(p)`, and the first element has offset 0.
///
/// Indices passed to the mutating methods must be in range; violating that is a
/// caller bug and panics.
#[derive(Debug, Clone, Default)]
pub struct OffsetChain {
	nodes: Slab<OffsetChainElement>,
	/// Arena keys in line order.
	order: Vec<usize>,
}

impl OffsetChain {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a chain from line lengths in order.
	pub fn from_lengths(lengths: impl IntoIterator<Item = usize>) -> Self {
		let mut chain = Self::new();
		let mut prev = None;
		for length in lengths {
			let key = chain.nodes.insert(OffsetChainElement {
				length,
				offset: 0,
				prev,
				next: None,
			});
			chain.link(prev, Some(key));
			chain.order.push(key);
			prev = Some(key);
		}
		chain.recompute_from(0);
		chain
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&OffsetChainElement> {
		self.order.get(index).map(|&key| &self.nodes[key])
	}

	/// Start offset of line `index`.
	pub fn offset(&self, index: usize) -> usize {
		self.element(index).offset
	}

	/// Length of line `index`.
	pub fn length(&self, index: usize) -> usize {
		self.element(index).length
	}

	/// Start offset of line `index`, or the total length when `index == len()`.
	///
	/// This is the byte position of a line boundary, which is what edits are
	/// expressed against.
	pub fn boundary(&self, index: usize) -> usize {
		if index == self.len() {
			self.total_len()
		} else {
			self.offset(index)
		}
	}

	/// Sum of all tracked lengths.
	pub fn total_len(&self) -> usize {
		self.order.last().map_or(0, |&key| self.nodes[key].end())
	}

	/// Element preceding line `index`, following the arena link.
	pub fn prev(&self, index: usize) -> Option<&OffsetChainElement> {
		self.element(index).prev.map(|key| &self.nodes[key])
	}

	/// Element following line `index`, following the arena link.
	pub fn next(&self, index: usize) -> Option<&OffsetChainElement> {
		self.element(index).next.map(|key| &self.nodes[key])
	}

	pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
		self.order.iter().map(|&key| self.nodes[key].length)
	}

	pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
		self.order.iter().map(|&key| self.nodes[key].offset)
	}

	/// Appends a line record.
	pub fn append(&mut self, length: usize) {
		let prev = self.order.last().copied();
		let key = self.nodes.insert(OffsetChainElement {
			length,
			offset: 0,
			prev,
			next: None,
		});
		self.link(prev, Some(key));
		self.order.push(key);
		self.recompute_from(self.len() - 1);
	}

	/// Inserts a line record so that it ends up at `index`.
	pub fn insert(&mut self, index: usize, length: usize) {
		assert!(index <= self.len(), "insert index {index} out of range for chain of {}", self.len());
		if index == self.len() {
			self.append(length);
			return;
		}
		let next = self.order[index];
		let prev = self.nodes[next].prev;
		let key = self.nodes.insert(OffsetChainElement {
			length,
			offset: 0,
			prev,
			next: Some(next),
		});
		self.link(prev, Some(key));
		self.link(Some(key), Some(next));
		self.order.insert(index, key);
		self.recompute_from(index);
	}

	/// Removes line record `index` and returns its length.
	pub fn remove(&mut self, index: usize) -> usize {
		let length = self.unlink_at(index);
		self.recompute_from(index);
		length
	}

	/// Applies a bulk update and recomputes offsets from the lowest affected index.
	///
	/// Returns that index; it equals `len()` when nothing downstream moved.
	pub fn mass_update(&mut self, update: OffsetChainUpdate) -> usize {
		let index = update.perform(self);
		self.recompute_from(index);
		index
	}

	/// Replaces records `[start, end)` with fresh records of the given lengths,
	/// linked to the original neighbours.
	pub(crate) fn splice(&mut self, start: usize, end: usize, lengths: &[usize]) {
		assert!(
			start <= end && end <= self.len(),
			"splice range {start}..{end} out of range for chain of {}",
			self.len()
		);
		let mut prev = start.checked_sub(1).map(|i| self.order[i]);
		let next = self.order.get(end).copied();

		for &key in &self.order[start..end] {
			self.nodes.remove(key);
		}

		let mut fresh = Vec::with_capacity(lengths.len());
		for &length in lengths {
			let key = self.nodes.insert(OffsetChainElement {
				length,
				offset: 0,
				prev,
				next: None,
			});
			self.link(prev, Some(key));
			fresh.push(key);
			prev = Some(key);
		}
		self.link(prev, next);
		self.order.splice(start..end, fresh);
	}

	/// Detaches record `index` without recomputing offsets.
	pub(crate) fn unlink_at(&mut self, index: usize) -> usize {
		assert!(index < self.len(), "remove index {index} out of range for chain of {}", self.len());
		let key = self.order.remove(index);
		let element = self.nodes.remove(key);
		self.link(element.prev, element.next);
		element.length
	}

	/// Overwrites the length of record `index` without recomputing offsets.
	pub(crate) fn set_length(&mut self, index: usize, length: usize) {
		let key = *self
			.order
			.get(index)
			.unwrap_or_else(|| panic!("resize index {index} out of range for chain of {}", self.order.len()));
		self.nodes[key].length = length;
	}

	fn element(&self, index: usize) -> &OffsetChainElement {
		match self.get(index) {
			Some(element) => element,
			None => panic!("index {index} out of range for chain of {}", self.len()),
		}
	}

	fn link(&mut self, prev: Option<usize>, next: Option<usize>) {
		if let Some(prev) = prev {
			self.nodes[prev].next = next;
		}
		if let Some(next) = next {
			self.nodes[next].prev = prev;
		}
	}

	/// Walks the `next` links from `index` to the end, accumulating offsets.
	///
	/// No early exit: every downstream offset shifts with any upstream change.
	fn recompute_from(&mut self, index: usize) {
		let mut cursor = self.order.get(index).copied();
		while let Some(key) = cursor {
			let offset = self.nodes[key].prev.map_or(0, |prev| self.nodes[prev].end());
			let element = &mut self.nodes[key];
			element.offset = offset;
			cursor = element.next;
		}
	}

	/// Checks link symmetry and the offset invariant.
	#[cfg(test)]
	pub(crate) fn assert_consistent(&self) {
		let mut expected = 0;
		for (index, &key) in self.order.iter().enumerate() {
			let element = &self.nodes[key];
			assert_eq!(element.offset, expected, "offset mismatch at {index}");
			assert_eq!(element.prev, index.checked_sub(1).map(|i| self.order[i]), "prev link at {index}");
			assert_eq!(element.next, self.order.get(index + 1).copied(), "next link at {index}");
			expected += element.length;
		}
		assert_eq!(self.nodes.len(), self.order.len(), "arena holds orphaned records");
	}
}
