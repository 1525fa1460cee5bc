//! Stacking engine for the kitchen display.
//!
//! Collapses visually identical order items into single display groups with
//! aggregate counts, so five identical burgers render as one card with a
//! count instead of five cards. Groups are derived fresh on every render and
//! never stored.

use kds_types::{ItemStatus, OrderItem, StackedItemGroup};
use std::collections::HashMap;

/// Identity of a display group.
///
/// Two items stack when every field here matches exactly. Extras compare as
/// sets (selection order does not matter), notes compare verbatim with
/// absent and present notes never mixing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
	menu_item_id: String,
	status: ItemStatus,
	workstation_id: Option<String>,
	notes: Option<String>,
	extras: Vec<String>,
}

impl GroupKey {
	fn of(item: &OrderItem) -> Self {
		let mut extras = item.selected_extra_ids.clone();
		extras.sort();
		Self {
			menu_item_id: item.menu_item_id.clone(),
			status: item.status,
			workstation_id: item.workstation_id.clone(),
			notes: item.notes.clone(),
			extras,
		}
	}
}

/// Groups the items visible at one workstation into display stacks.
///
/// Items are expected in display order and the result is order-stable: each
/// group appears at the position of its first member. The representative is
/// a clone of that first member with its quantity overwritten by the group
/// total. Served items never stack; they are skipped entirely.
pub fn stack_items(items: &[OrderItem]) -> Vec<StackedItemGroup> {
	let mut groups: Vec<StackedItemGroup> = Vec::new();
	let mut index: HashMap<GroupKey, usize> = HashMap::new();

	for item in items {
		if item.status.is_served() {
			continue;
		}
		match index.get(&GroupKey::of(item)) {
			Some(&slot) => {
				let group = &mut groups[slot];
				group.member_count += 1;
				group.total_quantity += item.quantity;
				group.representative.quantity = group.total_quantity;
			},
			None => {
				index.insert(GroupKey::of(item), groups.len());
				groups.push(StackedItemGroup {
					representative: item.clone(),
					member_count: 1,
					total_quantity: item.quantity,
				});
			},
		}
	}

	groups
}
