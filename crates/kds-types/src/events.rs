//! Event types for in-process notification.
//!
//! Events flow through the engine's broadcast bus so that display adapters,
//! logs and tests can react to board changes without polling the store. They
//! never leave the process; the surrounding system has its own refresh
//! mechanism.

use crate::transition::Transition;
use serde::{Deserialize, Serialize};

/// Main event type encompassing all board events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KdsEvent {
	/// Events about a single order item.
	Item(ItemEvent),
	/// Events about an order as a whole.
	Order(OrderEvent),
	/// Events about whole-store synchronization.
	Sync(SyncEvent),
}

/// Events describing item routing outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemEvent {
	/// An item took a forward step and the change was confirmed.
	Advanced {
		order_id: i64,
		item_id: String,
		transition: Transition,
	},
	/// An item took a backward step and the change was confirmed.
	Reverted {
		order_id: i64,
		item_id: String,
		transition: Transition,
	},
	/// An item was handed off and left the board.
	Served { order_id: i64, item_id: String },
	/// An optimistic change was undone after a persistence failure.
	RolledBack {
		order_id: i64,
		item_id: String,
		reason: String,
	},
}

/// Events describing order-level changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// The pin flag was flipped.
	PinToggled { order_id: i64, is_pinned: bool },
	/// The order was spliced to a new slot in the display ordering.
	Repositioned { order_id: i64, position: i64 },
	/// Every item of the order has been served.
	Completed { order_id: i64 },
}

/// Events describing store and station refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
	/// The whole store was replaced by an external snapshot.
	StoreRefreshed { order_count: usize, generation: u64 },
	/// The workstation sequence was replaced.
	StationsRefreshed { station_count: usize },
}
