//! Transition types produced by the routing engine.
//!
//! A transition describes one legal step of an item: the status it moves to
//! and, when the step crosses workstations, the target workstation. The
//! persistence record is the flattened form handed to the persistence
//! collaborator.

use crate::item::ItemStatus;
use serde::{Deserialize, Serialize};

/// Which way an item moved across the workstation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionDirection {
	/// Status changed within the current workstation.
	None,
	/// Item moved to the next workstation.
	Forward,
	/// Item moved to the previous workstation.
	Backward,
}

/// One computed routing step for an order item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
	/// Status the item takes after this step.
	pub new_status: ItemStatus,
	/// Target workstation when the step crosses stations; `None` leaves the
	/// current assignment untouched.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub new_workstation_id: Option<String>,
	/// Direction of the step across the sequence.
	pub direction: TransitionDirection,
}

impl Transition {
	/// A status-only step at the current workstation.
	pub fn stay(new_status: ItemStatus) -> Self {
		Self {
			new_status,
			new_workstation_id: None,
			direction: TransitionDirection::None,
		}
	}

	/// A step onto the next workstation.
	pub fn forward(new_status: ItemStatus, workstation_id: impl Into<String>) -> Self {
		Self {
			new_status,
			new_workstation_id: Some(workstation_id.into()),
			direction: TransitionDirection::Forward,
		}
	}

	/// A step back onto the previous workstation.
	pub fn backward(new_status: ItemStatus, workstation_id: impl Into<String>) -> Self {
		Self {
			new_status,
			new_workstation_id: Some(workstation_id.into()),
			direction: TransitionDirection::Backward,
		}
	}

	/// Flattens this transition into the persistence payload.
	pub fn to_record(&self) -> TransitionRecord {
		TransitionRecord {
			status: self.new_status,
			move_forward: self.direction == TransitionDirection::Forward,
			move_backward: self.direction == TransitionDirection::Backward,
			target_workstation_id: self.new_workstation_id.clone(),
		}
	}
}

/// Payload handed to the persistence collaborator, at most once per
/// transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRecord {
	/// Status being persisted.
	pub status: ItemStatus,
	/// Whether the item advanced one workstation.
	pub move_forward: bool,
	/// Whether the item went back one workstation.
	pub move_backward: bool,
	/// Explicit target workstation, when the step crossed stations.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_workstation_id: Option<String>,
}
