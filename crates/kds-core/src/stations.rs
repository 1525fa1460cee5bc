//! Shared handle to the active workstation sequence.
//!
//! The sequence is read on every routing decision but replaced only when the
//! surrounding system pushes a refresh, so it lives in an `arc-swap` cell:
//! readers take a cheap snapshot and are never blocked by a replacement. A
//! published sequence is immutable; replacing is the only write.

use arc_swap::ArcSwap;
use kds_types::WorkstationSequence;
use std::sync::Arc;

/// Holds the workstation sequence all routing decisions are made against.
pub struct StationRegistry {
	current: ArcSwap<WorkstationSequence>,
}

impl StationRegistry {
	/// Creates a registry holding the given sequence.
	pub fn new(sequence: WorkstationSequence) -> Self {
		Self {
			current: ArcSwap::from_pointee(sequence),
		}
	}

	/// Returns a snapshot of the current sequence.
	///
	/// The snapshot stays valid for the caller even if the registry is
	/// refreshed mid-operation; a routing decision always runs against one
	/// consistent sequence.
	pub fn current(&self) -> Arc<WorkstationSequence> {
		self.current.load_full()
	}

	/// Replaces the active sequence.
	///
	/// An empty replacement is refused and the previous sequence stays
	/// active: a board with no stations cannot route anything, so a refresh
	/// that would produce one is treated as a bad upstream payload.
	pub fn replace(&self, sequence: WorkstationSequence) -> bool {
		if sequence.is_empty() {
			tracing::warn!("refusing to replace workstation sequence with an empty one");
			return false;
		}
		self.current.store(Arc::new(sequence));
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kds_types::Workstation;

	fn station(id: &str, position: i64) -> Workstation {
		Workstation {
			id: id.to_string(),
			name: id.to_string(),
			position,
		}
	}

	#[test]
	fn replace_swaps_the_sequence() {
		let registry = StationRegistry::new(WorkstationSequence::new(vec![station("a", 0)]));
		assert!(registry.replace(WorkstationSequence::new(vec![
			station("a", 0),
			station("b", 1),
		])));
		assert_eq!(registry.current().len(), 2);
	}

	#[test]
	fn empty_replacement_is_refused() {
		let registry = StationRegistry::new(WorkstationSequence::new(vec![station("a", 0)]));
		assert!(!registry.replace(WorkstationSequence::new(vec![])));
		assert_eq!(registry.current().len(), 1);
	}

	#[test]
	fn snapshots_outlive_a_replacement() {
		let registry = StationRegistry::new(WorkstationSequence::new(vec![station("a", 0)]));
		let snapshot = registry.current();
		registry.replace(WorkstationSequence::new(vec![station("b", 0)]));

		assert_eq!(snapshot.first().map(|w| w.id.as_str()), Some("a"));
		assert_eq!(registry.current().first().map(|w| w.id.as_str()), Some("b"));
	}
}
