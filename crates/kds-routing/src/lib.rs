//! Routing engine for order items moving across workstations.
//!
//! Implements the item lifecycle state machine: the legal forward and
//! backward steps an item can take across the workstation sequence, plus the
//! serve step that takes a finished item off the board. All functions here
//! are pure; they compute transitions without touching any store.

use kds_types::ItemStatus;
use std::fmt;
use thiserror::Error;

/// The step a caller asked the routing engine for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
	/// Forward through the lifecycle and the sequence.
	Advance,
	/// Backward through the lifecycle and the sequence.
	Revert,
	/// Off the board entirely.
	Serve,
}

impl fmt::Display for StepDirection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StepDirection::Advance => write!(f, "advance"),
			StepDirection::Revert => write!(f, "revert"),
			StepDirection::Serve => write!(f, "serve"),
		}
	}
}

/// Errors that can occur while computing a routing step.
///
/// A routing error never mutates anything; the item is exactly as it was
/// before the request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoutingError {
	/// The requested step has no legal target from the item's current state.
	#[error("no {requested} step from status {status} at rank {rank}")]
	InvalidTransition {
		status: ItemStatus,
		rank: usize,
		requested: StepDirection,
	},
	/// The item references a workstation absent from the active sequence.
	#[error("workstation {0} is not in the active sequence")]
	UnknownWorkstation(String),
	/// The active sequence has no workstations at all.
	#[error("workstation sequence is empty")]
	EmptySequence,
}

mod engine;
mod guard;

pub use engine::{advance, revert, serve};
pub use guard::{apply_guard, effective_status};
