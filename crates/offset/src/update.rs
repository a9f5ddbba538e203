use crate::OffsetChain;

/// A structural edit applied to an [`OffsetChain`] in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffsetChainUpdate {
	/// Replace records `[start, end)` with records of the given lengths.
	///
	/// `start == end` inserts, an empty `lengths` deletes.
	ReplaceRange { start: usize, end: usize, lengths: Vec<usize> },
	/// Remove the records at the given indices.
	///
	/// Indices refer to the chain before the update. They are applied highest
	/// first so earlier removals never shift later ones; duplicates are ignored.
	Delete { indices: Vec<usize> },
	/// Overwrite the lengths of existing records, keeping the structure.
	Resize { lengths: Vec<(usize, usize)> },
}

impl OffsetChainUpdate {
	/// Applies the structural part of the update and returns the lowest index whose
	/// offset must be recomputed.
	pub(crate) fn perform(self, chain: &mut OffsetChain) -> usize {
		match self {
			Self::ReplaceRange { start, end, lengths } => {
				chain.splice(start, end, &lengths);
				start
			}
			Self::Delete { mut indices } => {
				indices.sort_unstable_by(|a, b| b.cmp(a));
				indices.dedup();
				for &index in &indices {
					chain.unlink_at(index);
				}
				indices.last().copied().unwrap_or(chain.len())
			}
			Self::Resize { lengths } => {
				let mut lowest = chain.len();
				for (index, length) in lengths {
					chain.set_length(index, length);
					lowest = lowest.min(index);
				}
				lowest
			}
		}
	}
}
