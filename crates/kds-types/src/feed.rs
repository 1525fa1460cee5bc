//! Snapshot types pushed by the external refresh mechanism.
//!
//! The surrounding system periodically hands the core a complete picture of
//! the board. The core does not interpret how the snapshot was produced; it
//! replaces its own state wholesale, accepting that a snapshot may clobber
//! optimistic local changes still awaiting confirmation.

use crate::order::Order;
use crate::workstation::Workstation;
use serde::{Deserialize, Serialize};

/// A whole-store snapshot delivered by a feed source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
	/// Every order currently on the board, replacing the store contents.
	pub orders: Vec<Order>,
	/// Replacement workstation sequence, when the layout changed too.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub workstations: Option<Vec<Workstation>>,
}
