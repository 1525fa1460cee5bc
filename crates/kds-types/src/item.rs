//! Order item types and the per-item status lifecycle.
//!
//! An order item is one line of an order (a menu item, its quantity, notes
//! and extras) together with its routing state: which workstation currently
//! holds it and where it is in that workstation's New / InProgress / Ready
//! lifecycle. Served marks an item that has left the board entirely.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when an incoming status string cannot be normalized.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("unrecognized item status: {0}")]
pub struct StatusParseError(pub String);

/// Lifecycle status of an order item within its current workstation.
///
/// This is the single canonical status representation. Status strings from
/// external sources arrive in inconsistent casing ("New", "IN PROGRESS",
/// "in_progress"); they are normalized exactly once, at the deserialization
/// boundary, through [`ItemStatus::from_str`]. All internal logic compares
/// enum values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
	/// Queued at a workstation, not yet picked up.
	New,
	/// Being worked on at the current workstation.
	InProgress,
	/// Finished at the current workstation.
	Ready,
	/// Handed off to the guest; the item is off the board.
	Served,
}

impl ItemStatus {
	/// Canonical wire form of this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			ItemStatus::New => "new",
			ItemStatus::InProgress => "in_progress",
			ItemStatus::Ready => "ready",
			ItemStatus::Served => "served",
		}
	}

	/// Whether the item has left the board.
	pub fn is_served(&self) -> bool {
		matches!(self, ItemStatus::Served)
	}
}

impl fmt::Display for ItemStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ItemStatus {
	type Err = StatusParseError;

	/// Normalizes an external status string.
	///
	/// Matching ignores case and the separators (spaces, underscores,
	/// hyphens) that upstream sources disagree on.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let folded: String = s
			.chars()
			.filter(|c| !matches!(c, ' ' | '_' | '-'))
			.flat_map(char::to_lowercase)
			.collect();
		match folded.as_str() {
			"new" => Ok(ItemStatus::New),
			"inprogress" => Ok(ItemStatus::InProgress),
			"ready" => Ok(ItemStatus::Ready),
			"served" => Ok(ItemStatus::Served),
			_ => Err(StatusParseError(s.to_string())),
		}
	}
}

impl<'de> Deserialize<'de> for ItemStatus {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(serde::de::Error::custom)
	}
}

/// One line of an order as tracked on the kitchen board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
	/// Identifier, unique within its order.
	pub id: String,
	/// The menu item this line refers to.
	pub menu_item_id: String,
	/// How many units this line represents. Always at least 1.
	pub quantity: u32,
	/// Current lifecycle status at the current workstation.
	pub status: ItemStatus,
	/// Current workstation assignment. `None` means the first workstation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub workstation_id: Option<String>,
	/// Free-text preparation notes, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Selected extras/modifiers, in selection order.
	#[serde(default)]
	pub selected_extra_ids: Vec<String>,
	/// Display ordering within the order.
	#[serde(default)]
	pub position: i64,
}

impl OrderItem {
	/// Whether this item still appears on the board.
	pub fn is_on_board(&self) -> bool {
		!self.status.is_served()
	}
}

/// A display group of identical items at one workstation.
///
/// Derived fresh on every render and never persisted. The representative is
/// the first member in display order with its `quantity` overwritten by the
/// group total, so display layers can treat a group like a single item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackedItemGroup {
	/// First member of the group, quantity replaced with `total_quantity`.
	pub representative: OrderItem,
	/// Number of order items collapsed into this group.
	pub member_count: usize,
	/// Sum of the members' quantities.
	pub total_quantity: u32,
}
