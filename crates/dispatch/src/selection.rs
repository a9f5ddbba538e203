use std::fmt;

use bufsync_primitives::BufferId;
use regex::Regex;
use rustc_hash::FxHashSet;

/// Selection types in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SelectionKind {
	Any,
	Fixed,
	Filetype,
	Regex,
}

impl SelectionKind {
	pub const ALL: [Self; 4] = [Self::Any, Self::Fixed, Self::Filetype, Self::Regex];

	pub(crate) fn index(self) -> usize {
		self as usize
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Any => "any",
			Self::Fixed => "fixed",
			Self::Filetype => "filetype",
			Self::Regex => "regex",
		}
	}
}

/// Which buffers a listener registration applies to.
#[derive(Clone)]
pub enum Selection {
	/// Every buffer.
	Any,
	/// An explicit set of buffers.
	Fixed(FxHashSet<BufferId>),
	/// Buffers whose name ends with one of the suffixes (e.g. `".java"`).
	Filetype(Vec<String>),
	/// Buffers whose name matches the pattern at its start.
	Regex(Regex),
}

impl Selection {
	pub fn fixed(buffers: impl IntoIterator<Item = BufferId>) -> Self {
		Self::Fixed(buffers.into_iter().collect())
	}

	pub fn filetype<S: Into<String>>(suffixes: impl IntoIterator<Item = S>) -> Self {
		Self::Filetype(suffixes.into_iter().map(Into::into).collect())
	}

	/// Compiles `pattern` anchored at the start of the name but not at its end.
	pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
		Regex::new(&format!("^(?:{pattern})")).map(Self::Regex)
	}

	pub fn kind(&self) -> SelectionKind {
		match self {
			Self::Any => SelectionKind::Any,
			Self::Fixed(_) => SelectionKind::Fixed,
			Self::Filetype(_) => SelectionKind::Filetype,
			Self::Regex(_) => SelectionKind::Regex,
		}
	}

	pub fn matches(&self, buffer: BufferId, name: &str) -> bool {
		match self {
			Self::Any => true,
			Self::Fixed(buffers) => buffers.contains(&buffer),
			Self::Filetype(suffixes) => suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())),
			Self::Regex(regex) => regex.is_match(name),
		}
	}
}

impl fmt::Debug for Selection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Any => f.write_str("Any"),
			Self::Fixed(buffers) => {
				let mut sorted: Vec<_> = buffers.iter().copied().collect();
				sorted.sort();
				f.debug_tuple("Fixed").field(&sorted).finish()
			}
			Self::Filetype(suffixes) => f.debug_tuple("Filetype").field(suffixes).finish(),
			Self::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
		}
	}
}
