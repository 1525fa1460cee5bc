//! Order types for the kitchen routing system.
//!
//! An order is the unit the kitchen receives: a set of order items plus the
//! display state (pinning, position) the board needs. Order status is derived
//! from the items and never set directly by routing.

use crate::item::OrderItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an order as a whole.
///
/// Purely derived: an order is [`OrderStatus::Completed`] exactly when every
/// one of its items has been served. The routing engine never writes this
/// field; [`Order::is_complete`] is the authoritative predicate and the
/// stored value is only a convenience for display layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
	/// At least one item has not been served yet.
	Pending,
	/// Every item has been served.
	Completed,
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Pending => write!(f, "pending"),
			OrderStatus::Completed => write!(f, "completed"),
		}
	}
}

fn default_status() -> OrderStatus {
	OrderStatus::Pending
}

fn default_created_at() -> DateTime<Utc> {
	Utc::now()
}

/// A customer order as tracked on the kitchen board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Numeric order identifier from the upstream point of sale.
	pub id: i64,
	/// The order's items in display order.
	pub items: Vec<OrderItem>,
	/// Whether the board keeps this order at the top.
	#[serde(default)]
	pub is_pinned: bool,
	/// Display ordering among orders. Assigned at ingestion.
	#[serde(default)]
	pub position: i64,
	/// When the order was placed.
	#[serde(default = "default_created_at")]
	pub created_at: DateTime<Utc>,
	/// Derived status; see [`Order::is_complete`].
	#[serde(default = "default_status")]
	pub status: OrderStatus,
}

impl Order {
	/// Whether every item of this order has been served.
	///
	/// An order with no items is trivially complete.
	pub fn is_complete(&self) -> bool {
		self.items.iter().all(|item| item.status.is_served())
	}

	/// Recomputes the stored status from the items.
	pub fn derived_status(&self) -> OrderStatus {
		if self.is_complete() {
			OrderStatus::Completed
		} else {
			OrderStatus::Pending
		}
	}

	/// Looks up an item by id.
	pub fn item(&self, item_id: &str) -> Option<&OrderItem> {
		self.items.iter().find(|item| item.id == item_id)
	}

	/// Looks up an item by id for mutation.
	pub fn item_mut(&mut self, item_id: &str) -> Option<&mut OrderItem> {
		self.items.iter_mut().find(|item| item.id == item_id)
	}
}
