//! Transition computation for the item lifecycle.
//!
//! Every function resolves the item's rank in the sequence, applies the read
//! guard, and walks the transition table. Advancing never decreases rank;
//! rank only decreases through [`revert`].

use crate::guard::effective_status;
use crate::{RoutingError, StepDirection};
use kds_types::{ItemStatus, OrderItem, Transition, WorkstationSequence};

fn resolved_rank(
	item: &OrderItem,
	sequence: &WorkstationSequence,
) -> Result<usize, RoutingError> {
	if sequence.is_empty() {
		return Err(RoutingError::EmptySequence);
	}
	match item.workstation_id.as_deref() {
		Some(id) => sequence
			.rank_of(id)
			.ok_or_else(|| RoutingError::UnknownWorkstation(id.to_string())),
		None => Ok(0),
	}
}

/// Computes the forward step for an item.
///
/// Within a workstation the lifecycle runs New -> InProgress -> Ready; once a
/// workstation is done with an item the item re-enters the next workstation
/// as New. A Ready item below the terminal rank also advances to the next
/// workstation, healing a state that normal flow does not produce. Ready at
/// the terminal rank has nowhere to go and is rejected.
pub fn advance(
	item: &OrderItem,
	sequence: &WorkstationSequence,
) -> Result<Transition, RoutingError> {
	let rank = resolved_rank(item, sequence)?;
	let status = effective_status(item, sequence);
	let reject = || RoutingError::InvalidTransition {
		status,
		rank,
		requested: StepDirection::Advance,
	};

	match status {
		ItemStatus::New => Ok(Transition::stay(ItemStatus::InProgress)),
		ItemStatus::InProgress => match sequence.at_rank(rank + 1) {
			Some(next) => Ok(Transition::forward(ItemStatus::New, next.id.clone())),
			None => Ok(Transition::stay(ItemStatus::Ready)),
		},
		ItemStatus::Ready => match sequence.at_rank(rank + 1) {
			Some(next) => Ok(Transition::forward(ItemStatus::New, next.id.clone())),
			None => Err(reject()),
		},
		ItemStatus::Served => Err(reject()),
	}
}

/// Computes the backward step for an item.
///
/// InProgress steps back to New at the same workstation; New and Ready step
/// back onto the previous workstation as InProgress. At rank zero there is no
/// previous workstation, so New and Ready are rejected there.
pub fn revert(
	item: &OrderItem,
	sequence: &WorkstationSequence,
) -> Result<Transition, RoutingError> {
	let rank = resolved_rank(item, sequence)?;
	let status = effective_status(item, sequence);
	let reject = || RoutingError::InvalidTransition {
		status,
		rank,
		requested: StepDirection::Revert,
	};
	let previous = |rank: usize| rank.checked_sub(1).and_then(|r| sequence.at_rank(r));

	match status {
		ItemStatus::New => match previous(rank) {
			Some(prev) => Ok(Transition::backward(ItemStatus::InProgress, prev.id.clone())),
			None => Err(reject()),
		},
		ItemStatus::InProgress => Ok(Transition::stay(ItemStatus::New)),
		ItemStatus::Ready => match previous(rank) {
			Some(prev) => Ok(Transition::backward(ItemStatus::InProgress, prev.id.clone())),
			None => Err(reject()),
		},
		ItemStatus::Served => Err(reject()),
	}
}

/// Computes the hand-off step for an item.
///
/// Only a Ready item at the terminal workstation can be served; everything
/// else is rejected. Serving changes status only, the workstation assignment
/// stays where it is.
pub fn serve(
	item: &OrderItem,
	sequence: &WorkstationSequence,
) -> Result<Transition, RoutingError> {
	let rank = resolved_rank(item, sequence)?;
	let status = effective_status(item, sequence);

	if status == ItemStatus::Ready && Some(rank) == sequence.terminal_rank() {
		Ok(Transition::stay(ItemStatus::Served))
	} else {
		Err(RoutingError::InvalidTransition {
			status,
			rank,
			requested: StepDirection::Serve,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kds_types::{TransitionDirection, Workstation};

	fn sequence() -> WorkstationSequence {
		WorkstationSequence::new(vec![
			Workstation {
				id: "kitchen".to_string(),
				name: "Kitchen".to_string(),
				position: 0,
			},
			Workstation {
				id: "grill".to_string(),
				name: "Grill".to_string(),
				position: 1,
			},
			Workstation {
				id: "ready".to_string(),
				name: "Ready".to_string(),
				position: 2,
			},
		])
	}

	fn item_at(status: ItemStatus, workstation: Option<&str>) -> OrderItem {
		OrderItem {
			id: "i1".to_string(),
			menu_item_id: "burger".to_string(),
			quantity: 1,
			status,
			workstation_id: workstation.map(str::to_string),
			notes: None,
			selected_extra_ids: Vec::new(),
			position: 0,
		}
	}

	fn apply(item: &mut OrderItem, transition: &Transition) {
		item.status = transition.new_status;
		if let Some(ws) = &transition.new_workstation_id {
			item.workstation_id = Some(ws.clone());
		}
	}

	#[test]
	fn new_advances_to_in_progress_in_place() {
		let t = advance(&item_at(ItemStatus::New, Some("kitchen")), &sequence()).unwrap();
		assert_eq!(t, Transition::stay(ItemStatus::InProgress));
	}

	#[test]
	fn in_progress_advances_to_next_station_as_new() {
		let t = advance(&item_at(ItemStatus::InProgress, Some("kitchen")), &sequence()).unwrap();
		assert_eq!(t, Transition::forward(ItemStatus::New, "grill"));
	}

	#[test]
	fn last_station_hop_lands_as_new_at_terminal() {
		let t = advance(&item_at(ItemStatus::InProgress, Some("grill")), &sequence()).unwrap();
		assert_eq!(t, Transition::forward(ItemStatus::New, "ready"));
		assert_eq!(t.direction, TransitionDirection::Forward);
	}

	#[test]
	fn ready_below_terminal_self_heals_forward() {
		let t = advance(&item_at(ItemStatus::Ready, Some("kitchen")), &sequence()).unwrap();
		assert_eq!(t, Transition::forward(ItemStatus::New, "grill"));
	}

	#[test]
	fn ready_at_terminal_rejects_advance() {
		let err = advance(&item_at(ItemStatus::Ready, Some("ready")), &sequence()).unwrap_err();
		assert_eq!(
			err,
			RoutingError::InvalidTransition {
				status: ItemStatus::Ready,
				rank: 2,
				requested: StepDirection::Advance,
			}
		);
	}

	#[test]
	fn served_rejects_both_directions() {
		let item = item_at(ItemStatus::Served, Some("ready"));
		assert!(advance(&item, &sequence()).is_err());
		assert!(revert(&item, &sequence()).is_err());
	}

	#[test]
	fn missing_assignment_means_first_station() {
		let t = advance(&item_at(ItemStatus::InProgress, None), &sequence()).unwrap();
		assert_eq!(t, Transition::forward(ItemStatus::New, "grill"));
	}

	#[test]
	fn unknown_station_is_a_routing_error() {
		let err = advance(&item_at(ItemStatus::New, Some("dishwasher")), &sequence()).unwrap_err();
		assert_eq!(err, RoutingError::UnknownWorkstation("dishwasher".to_string()));
	}

	#[test]
	fn empty_sequence_is_a_routing_error() {
		let empty = WorkstationSequence::new(Vec::new());
		let err = advance(&item_at(ItemStatus::New, None), &empty).unwrap_err();
		assert_eq!(err, RoutingError::EmptySequence);
	}

	#[test]
	fn guard_applies_before_the_table() {
		// Stored New or InProgress at the terminal station reads Ready, so
		// advance has nowhere to go.
		for stored in [ItemStatus::New, ItemStatus::InProgress] {
			let err = advance(&item_at(stored, Some("ready")), &sequence()).unwrap_err();
			assert!(matches!(
				err,
				RoutingError::InvalidTransition {
					status: ItemStatus::Ready,
					..
				}
			));
		}
	}

	#[test]
	fn in_progress_reverts_to_new_in_place() {
		let t = revert(&item_at(ItemStatus::InProgress, Some("grill")), &sequence()).unwrap();
		assert_eq!(t, Transition::stay(ItemStatus::New));
	}

	#[test]
	fn new_reverts_onto_previous_station() {
		let t = revert(&item_at(ItemStatus::New, Some("grill")), &sequence()).unwrap();
		assert_eq!(t, Transition::backward(ItemStatus::InProgress, "kitchen"));
	}

	#[test]
	fn new_at_first_station_rejects_revert() {
		let err = revert(&item_at(ItemStatus::New, Some("kitchen")), &sequence()).unwrap_err();
		assert_eq!(
			err,
			RoutingError::InvalidTransition {
				status: ItemStatus::New,
				rank: 0,
				requested: StepDirection::Revert,
			}
		);
	}

	#[test]
	fn ready_reverts_onto_previous_station() {
		let t = revert(&item_at(ItemStatus::Ready, Some("ready")), &sequence()).unwrap();
		assert_eq!(t, Transition::backward(ItemStatus::InProgress, "grill"));
	}

	#[test]
	fn serve_requires_ready_at_terminal() {
		let t = serve(&item_at(ItemStatus::Ready, Some("ready")), &sequence()).unwrap();
		assert_eq!(t, Transition::stay(ItemStatus::Served));

		assert!(serve(&item_at(ItemStatus::Ready, Some("kitchen")), &sequence()).is_err());
		assert!(serve(&item_at(ItemStatus::InProgress, Some("grill")), &sequence()).is_err());
		assert!(serve(&item_at(ItemStatus::Served, Some("ready")), &sequence()).is_err());
	}

	#[test]
	fn full_walkthrough_reaches_ready_in_four_advances() {
		let seq = sequence();
		let mut item = item_at(ItemStatus::New, None);
		let mut ranks = Vec::new();

		for _ in 0..4 {
			let t = advance(&item, &seq).unwrap();
			apply(&mut item, &t);
			ranks.push(seq.resolve_rank(item.workstation_id.as_deref()).unwrap());
		}

		// Stored as New at the terminal station; the guard presents Ready.
		assert_eq!(item.workstation_id.as_deref(), Some("ready"));
		assert_eq!(effective_status(&item, &seq), ItemStatus::Ready);
		// Rank never decreased along the way.
		assert!(ranks.windows(2).all(|w| w[0] <= w[1]));

		// Terminal advance keeps rejecting without mutating anything.
		let before = item.clone();
		assert!(advance(&item, &seq).is_err());
		assert!(advance(&item, &seq).is_err());
		assert_eq!(item, before);
	}

	#[test]
	fn full_walkthrough_reverts_back_to_the_first_station() {
		let seq = sequence();
		let mut item = item_at(ItemStatus::New, Some("ready"));

		let expected = [
			(ItemStatus::InProgress, Some("grill")),
			(ItemStatus::New, Some("grill")),
			(ItemStatus::InProgress, Some("kitchen")),
			(ItemStatus::New, Some("kitchen")),
		];
		for (status, station) in expected {
			let t = revert(&item, &seq).unwrap();
			apply(&mut item, &t);
			assert_eq!(item.status, status);
			assert_eq!(item.workstation_id.as_deref(), station);
		}

		assert!(revert(&item, &seq).is_err());
	}

	#[test]
	fn adjacent_revert_undoes_an_advance() {
		let seq = sequence();
		let mut item = item_at(ItemStatus::InProgress, Some("grill"));
		let before = (item.status, item.workstation_id.clone());

		let forward = advance(&item, &seq).unwrap();
		apply(&mut item, &forward);
		let back = revert(&item, &seq).unwrap();
		apply(&mut item, &back);

		assert_eq!((item.status, item.workstation_id.clone()), before);
	}
}
