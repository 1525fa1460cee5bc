//! Status/workstation consistency guard.
//!
//! The workstation sequence can change shape after items were assigned, so
//! the terminal invariant (anything sitting at the terminal workstation reads
//! Ready) is enforced on read rather than trusted from storage.

use kds_types::{ItemStatus, OrderItem, WorkstationSequence};

/// Returns the status the rest of the system should see for an item.
///
/// A non-served item whose assignment resolves to the terminal workstation is
/// forced to [`ItemStatus::Ready`] regardless of its stored status. An
/// unknown workstation id is treated as not terminal, so stale assignments
/// degrade to their stored status instead of failing the read. Served items
/// pass through untouched.
pub fn effective_status(item: &OrderItem, sequence: &WorkstationSequence) -> ItemStatus {
	if item.status.is_served() {
		return ItemStatus::Served;
	}
	let at_terminal = match item.workstation_id.as_deref() {
		Some(id) => sequence.is_terminal(id),
		// No assignment means the first workstation, which is also the
		// terminal one only in a single-station sequence.
		None => sequence.len() == 1,
	};
	if at_terminal {
		ItemStatus::Ready
	} else {
		item.status
	}
}

/// Rewrites an item's stored status to its guard-corrected value.
pub fn apply_guard(item: &mut OrderItem, sequence: &WorkstationSequence) {
	item.status = effective_status(item, sequence);
}
