//! Workstation types for the kitchen routing system.
//!
//! A workstation is one physical preparation stage (e.g. Kitchen, Grill,
//! Ready). Workstations form a totally ordered sequence; items move across
//! that sequence one rank at a time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single preparation stage in the kitchen pipeline.
///
/// Workstations are supplied by an external source and are read-only to the
/// routing core. The `position` field defines the pipeline ordering; the
/// highest position is the terminal "Ready" stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workstation {
	/// Unique identifier for this workstation.
	pub id: String,
	/// Human-readable name shown on the display.
	pub name: String,
	/// Ordering key within the pipeline. Ties are broken by input order.
	pub position: i64,
}

/// An immutable, rank-indexed view of the workstation pipeline.
///
/// Built once from an unsorted workstation list; all routing decisions are
/// made against ranks (zero-based indices into the sorted sequence) rather
/// than raw positions. A sequence is never mutated after construction; a
/// refreshed station list produces a whole new sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkstationSequence {
	/// Workstations sorted by position, input order preserved on ties.
	stations: Vec<Workstation>,
	/// Workstation id to rank lookup.
	ranks: HashMap<String, usize>,
}

impl WorkstationSequence {
	/// Builds a sequence from an unordered station list.
	///
	/// Sorting is stable, so stations sharing a position keep their input
	/// order. Duplicate ids keep the first occurrence's rank.
	pub fn new(mut stations: Vec<Workstation>) -> Self {
		stations.sort_by_key(|s| s.position);
		let mut ranks = HashMap::with_capacity(stations.len());
		for (rank, station) in stations.iter().enumerate() {
			ranks.entry(station.id.clone()).or_insert(rank);
		}
		Self { stations, ranks }
	}

	/// Returns the rank of a workstation id, or `None` if unknown.
	pub fn rank_of(&self, id: &str) -> Option<usize> {
		self.ranks.get(id).copied()
	}

	/// Returns the workstation at the given rank.
	pub fn at_rank(&self, rank: usize) -> Option<&Workstation> {
		self.stations.get(rank)
	}

	/// Returns the first (lowest-ranked) workstation.
	///
	/// Items with no workstation assignment implicitly reside here.
	pub fn first(&self) -> Option<&Workstation> {
		self.stations.first()
	}

	/// Returns the terminal (highest-ranked) workstation.
	pub fn terminal(&self) -> Option<&Workstation> {
		self.stations.last()
	}

	/// Returns the rank of the terminal workstation.
	pub fn terminal_rank(&self) -> Option<usize> {
		self.stations.len().checked_sub(1)
	}

	/// Whether the given id names the terminal workstation.
	///
	/// Unknown ids are treated as not terminal so that stale assignments
	/// degrade gracefully instead of crashing a read path.
	pub fn is_terminal(&self, id: &str) -> bool {
		match (self.rank_of(id), self.terminal_rank()) {
			(Some(rank), Some(terminal)) => rank == terminal,
			_ => false,
		}
	}

	/// Resolves an item's workstation assignment to a rank.
	///
	/// A missing assignment means the first workstation. Returns `None` when
	/// the id is unknown to this sequence or the sequence is empty.
	pub fn resolve_rank(&self, workstation_id: Option<&str>) -> Option<usize> {
		match workstation_id {
			Some(id) => self.rank_of(id),
			None => {
				if self.stations.is_empty() {
					None
				} else {
					Some(0)
				}
			},
		}
	}

	/// Returns the workstation one rank after the given id.
	pub fn next_after(&self, id: &str) -> Option<&Workstation> {
		self.at_rank(self.rank_of(id)? + 1)
	}

	/// Returns the workstation one rank before the given id.
	pub fn previous_before(&self, id: &str) -> Option<&Workstation> {
		let rank = self.rank_of(id)?;
		self.at_rank(rank.checked_sub(1)?)
	}

	/// All workstations in rank order.
	pub fn stations(&self) -> &[Workstation] {
		&self.stations
	}

	/// Number of workstations in the sequence.
	pub fn len(&self) -> usize {
		self.stations.len()
	}

	/// Whether the sequence contains no workstations.
	pub fn is_empty(&self) -> bool {
		self.stations.is_empty()
	}
}
