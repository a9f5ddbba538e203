use std::sync::Arc;

use bufsync_primitives::BufferId;
use tracing::debug;

use crate::{Listener, Selection, SelectionKind};

struct Registration {
	selection: Selection,
	listener: Arc<dyn Listener>,
}

/// Listener registrations grouped by selection type.
///
/// Resolution walks the groups in [`SelectionKind`] order and each group in
/// registration order.
#[derive(Default)]
pub struct ListenerRegistry {
	groups: [Vec<Registration>; 4],
}

impl ListenerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `listener` for `selection`.
	///
	/// A listener with the same name already registered under the same selection type is
	/// replaced in place and returned.
	pub fn register(&mut self, selection: Selection, listener: Arc<dyn Listener>) -> Option<Arc<dyn Listener>> {
		let kind = selection.kind();
		let group = &mut self.groups[kind.index()];
		debug!(listener = listener.name(), kind = kind.as_str(), "registry.register");
		match group.iter_mut().find(|r| r.listener.name() == listener.name()) {
			Some(existing) => {
				existing.selection = selection;
				Some(std::mem::replace(&mut existing.listener, listener))
			}
			None => {
				group.push(Registration { selection, listener });
				None
			}
		}
	}

	/// Removes every registration of the named listener. Returns how many were removed.
	pub fn unregister(&mut self, name: &str) -> usize {
		let mut removed = 0;
		for group in &mut self.groups {
			let before = group.len();
			group.retain(|r| r.listener.name() != name);
			removed += before - group.len();
		}
		if removed > 0 {
			debug!(listener = name, removed, "registry.unregister");
		}
		removed
	}

	/// Listeners applying to `buffer` (displayed as `name`), in invocation order.
	///
	/// A listener registered under several matching selection types appears once per
	/// registration.
	pub fn resolve(&self, buffer: BufferId, name: &str) -> Vec<Arc<dyn Listener>> {
		SelectionKind::ALL
			.iter()
			.flat_map(|kind| &self.groups[kind.index()])
			.filter(|r| r.selection.matches(buffer, name))
			.map(|r| Arc::clone(&r.listener))
			.collect()
	}

	/// Number of registrations across all selection types.
	pub fn len(&self) -> usize {
		self.groups.iter().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Selection of the named listener under `kind`, if registered.
	pub fn selection(&self, kind: SelectionKind, name: &str) -> Option<&Selection> {
		self.groups[kind.index()]
			.iter()
			.find(|r| r.listener.name() == name)
			.map(|r| &r.selection)
	}
}
