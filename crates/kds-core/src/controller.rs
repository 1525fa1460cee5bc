//! Optimistic mutation controller for board commands.
//!
//! Every command follows the same saga: snapshot the affected state, apply
//! the change to the store so readers see it immediately, then confirm it
//! with the persistence backend. A failed confirmation restores the snapshot
//! and surfaces [`CommandError::PersistenceFailure`], so after any error the
//! store equals its pre-command state. The only suspension point is the
//! persistence call itself.

use crate::event_bus::EventBus;
use crate::stations::StationRegistry;
use dashmap::DashMap;
use kds_persistence::PersistenceService;
use kds_routing::{RoutingError, StepDirection};
use kds_store::{OrderStore, StoreError};
use kds_types::{short_id, ItemEvent, KdsEvent, Order, OrderEvent, Transition};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Errors surfaced to command callers.
///
/// None of these are fatal; the board keeps running after every one of them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
	/// The requested step has no legal target from the item's current state.
	/// Nothing was mutated.
	#[error("invalid transition: {0}")]
	InvalidTransition(String),
	/// The item references a workstation absent from the active sequence.
	#[error("workstation {0} is not in the active sequence")]
	UnknownWorkstation(String),
	/// The backend refused the change. The optimistic mutation has been
	/// rolled back, unless a board refresh already superseded it.
	#[error("persistence failed, change rolled back: {0}")]
	PersistenceFailure(String),
	/// Another transition for the same item is still awaiting confirmation.
	#[error("a transition for item {item_id} of order {order_id} is already in flight")]
	ConcurrentTransitionConflict { order_id: i64, item_id: String },
	/// No order with the given id is on the board.
	#[error("order not found: {0}")]
	OrderNotFound(i64),
	/// The order exists but has no item with the given id.
	#[error("item {item_id} not found in order {order_id}")]
	ItemNotFound { order_id: i64, item_id: String },
	/// An unexpected internal failure, such as a poisoned store lock.
	#[error("internal error: {0}")]
	Internal(String),
}

impl From<RoutingError> for CommandError {
	fn from(err: RoutingError) -> Self {
		match err {
			RoutingError::UnknownWorkstation(id) => CommandError::UnknownWorkstation(id),
			other => CommandError::InvalidTransition(other.to_string()),
		}
	}
}

impl From<StoreError> for CommandError {
	fn from(err: StoreError) -> Self {
		match err {
			StoreError::OrderNotFound(id) => CommandError::OrderNotFound(id),
			StoreError::ItemNotFound { order_id, item_id } => {
				CommandError::ItemNotFound { order_id, item_id }
			},
			StoreError::Lock(msg) => CommandError::Internal(msg),
		}
	}
}

/// Applies board commands optimistically and reconciles them with the
/// persistence backend.
pub struct MutationController {
	store: Arc<OrderStore>,
	stations: Arc<StationRegistry>,
	persistence: Arc<PersistenceService>,
	event_bus: EventBus,
	/// Items with a confirmation still in flight, keyed by (order, item).
	in_flight: DashMap<(i64, String), ()>,
}

impl MutationController {
	/// Creates a controller over the given store, sequence and backend.
	pub fn new(
		store: Arc<OrderStore>,
		stations: Arc<StationRegistry>,
		persistence: Arc<PersistenceService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			store,
			stations,
			persistence,
			event_bus,
			in_flight: DashMap::new(),
		}
	}

	/// Moves an item one step forward through its lifecycle.
	pub async fn advance_item(&self, order_id: i64, item_id: &str) -> Result<Order, CommandError> {
		self.step_item(order_id, item_id, StepDirection::Advance)
			.await
	}

	/// Moves an item one step backward through its lifecycle.
	pub async fn revert_item(&self, order_id: i64, item_id: &str) -> Result<Order, CommandError> {
		self.step_item(order_id, item_id, StepDirection::Revert)
			.await
	}

	/// Hands an item off the board. Legal only when the item reads Ready at
	/// the terminal workstation.
	pub async fn serve_item(&self, order_id: i64, item_id: &str) -> Result<Order, CommandError> {
		self.step_item(order_id, item_id, StepDirection::Serve)
			.await
	}

	/// Serializes steps per item: a second request while one is pending is
	/// rejected instead of queued. Steps for different items interleave
	/// freely.
	async fn step_item(
		&self,
		order_id: i64,
		item_id: &str,
		direction: StepDirection,
	) -> Result<Order, CommandError> {
		let key = (order_id, item_id.to_string());
		if self.in_flight.insert(key.clone(), ()).is_some() {
			return Err(CommandError::ConcurrentTransitionConflict {
				order_id,
				item_id: item_id.to_string(),
			});
		}
		let result = self.step_item_guarded(order_id, item_id, direction).await;
		self.in_flight.remove(&key);
		result
	}

	#[instrument(skip_all, fields(order_id, item_id = %short_id(item_id), step = %direction))]
	async fn step_item_guarded(
		&self,
		order_id: i64,
		item_id: &str,
		direction: StepDirection,
	) -> Result<Order, CommandError> {
		let sequence = self.stations.current();
		let snapshot = self.store.snapshot_order(order_id)?;
		let item = snapshot
			.order
			.item(item_id)
			.ok_or_else(|| CommandError::ItemNotFound {
				order_id,
				item_id: item_id.to_string(),
			})?;

		let transition = match direction {
			StepDirection::Advance => kds_routing::advance(item, &sequence)?,
			StepDirection::Revert => kds_routing::revert(item, &sequence)?,
			StepDirection::Serve => kds_routing::serve(item, &sequence)?,
		};

		// Optimistic apply: visible to every reader before the backend is
		// asked to confirm.
		let updated = self.store.update_item_with(order_id, item_id, |item| {
			item.status = transition.new_status;
			if let Some(target) = &transition.new_workstation_id {
				item.workstation_id = Some(target.clone());
			}
		})?;
		self.publish_step(order_id, item_id, direction, &transition);

		let record = transition.to_record();
		if let Err(e) = self
			.persistence
			.confirm_transition(order_id, item_id, &record)
			.await
		{
			// The snapshot covers the whole order, so the rollback also
			// rewinds sibling items changed while this confirmation was in
			// flight.
			if self.store.restore_order(snapshot)? {
				self.event_bus
					.publish(KdsEvent::Item(ItemEvent::RolledBack {
						order_id,
						item_id: item_id.to_string(),
						reason: e.to_string(),
					}))
					.ok();
			} else {
				tracing::debug!("rollback discarded, board was refreshed during confirmation");
			}
			tracing::warn!(error = %e, "transition rejected by backend");
			return Err(CommandError::PersistenceFailure(e.to_string()));
		}

		if direction == StepDirection::Serve && updated.is_complete() {
			self.event_bus
				.publish(KdsEvent::Order(OrderEvent::Completed { order_id }))
				.ok();
		}
		Ok(updated)
	}

	fn publish_step(
		&self,
		order_id: i64,
		item_id: &str,
		direction: StepDirection,
		transition: &Transition,
	) {
		let event = match direction {
			StepDirection::Advance => ItemEvent::Advanced {
				order_id,
				item_id: item_id.to_string(),
				transition: transition.clone(),
			},
			StepDirection::Revert => ItemEvent::Reverted {
				order_id,
				item_id: item_id.to_string(),
				transition: transition.clone(),
			},
			StepDirection::Serve => ItemEvent::Served {
				order_id,
				item_id: item_id.to_string(),
			},
		};
		self.event_bus.publish(KdsEvent::Item(event)).ok();
	}

	/// Flips an order's pin flag.
	#[instrument(skip_all, fields(order_id))]
	pub async fn toggle_pin(&self, order_id: i64) -> Result<Order, CommandError> {
		let snapshot = self.store.snapshot_order(order_id)?;
		let was_pinned = snapshot.order.is_pinned;

		let updated = self.store.update_order_with(order_id, |order| {
			order.is_pinned = !order.is_pinned;
		})?;
		self.event_bus
			.publish(KdsEvent::Order(OrderEvent::PinToggled {
				order_id,
				is_pinned: updated.is_pinned,
			}))
			.ok();

		if let Err(e) = self.persistence.confirm_pin(order_id, updated.is_pinned).await {
			if self.store.restore_order(snapshot)? {
				// Corrective event so subscribers see the flag flip back.
				self.event_bus
					.publish(KdsEvent::Order(OrderEvent::PinToggled {
						order_id,
						is_pinned: was_pinned,
					}))
					.ok();
			}
			return Err(CommandError::PersistenceFailure(e.to_string()));
		}
		Ok(updated)
	}

	/// Splices an order to a new slot in the display ordering and renumbers
	/// every order's position. Returns the resulting (order, position)
	/// assignments in display order.
	#[instrument(skip_all, fields(order_id, target_index))]
	pub async fn reposition_order(
		&self,
		order_id: i64,
		target_index: usize,
	) -> Result<Vec<(i64, i64)>, CommandError> {
		let snapshot = self.store.snapshot_positions()?;
		let assignments = self.store.apply_reposition(order_id, target_index)?;

		if let Some(&(_, position)) = assignments.iter().find(|(id, _)| *id == order_id) {
			self.event_bus
				.publish(KdsEvent::Order(OrderEvent::Repositioned { order_id, position }))
				.ok();
		}

		if let Err(e) = self.persistence.confirm_positions(&assignments).await {
			let old_position = snapshot
				.positions
				.iter()
				.find(|(id, _)| *id == order_id)
				.map(|&(_, position)| position);
			if self.store.restore_positions(&snapshot)? {
				if let Some(position) = old_position {
					self.event_bus
						.publish(KdsEvent::Order(OrderEvent::Repositioned {
							order_id,
							position,
						}))
						.ok();
				}
			}
			return Err(CommandError::PersistenceFailure(e.to_string()));
		}
		Ok(assignments)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use kds_persistence::implementations::memory::{MemoryPersistence, PersistCall};
	use kds_types::{ItemStatus, OrderItem, OrderStatus, Workstation, WorkstationSequence};

	fn stations() -> Vec<Workstation> {
		["kitchen", "grill", "ready"]
			.iter()
			.enumerate()
			.map(|(position, id)| Workstation {
				id: id.to_string(),
				name: id.to_string(),
				position: position as i64,
			})
			.collect()
	}

	fn item(id: &str, status: ItemStatus, workstation: Option<&str>) -> OrderItem {
		OrderItem {
			id: id.to_string(),
			menu_item_id: "burger".to_string(),
			quantity: 1,
			status,
			workstation_id: workstation.map(str::to_string),
			notes: None,
			selected_extra_ids: Vec::new(),
			position: 0,
		}
	}

	fn order(id: i64, items: Vec<OrderItem>) -> Order {
		Order {
			id,
			items,
			is_pinned: false,
			position: id,
			created_at: Utc::now(),
			status: OrderStatus::Pending,
		}
	}

	struct Harness {
		controller: Arc<MutationController>,
		store: Arc<OrderStore>,
		backend: MemoryPersistence,
		bus: EventBus,
	}

	fn setup(orders: Vec<Order>) -> Harness {
		let backend = MemoryPersistence::new();
		let store = Arc::new(OrderStore::new(orders));
		let registry = Arc::new(StationRegistry::new(WorkstationSequence::new(stations())));
		let bus = EventBus::new(64);
		let controller = Arc::new(MutationController::new(
			store.clone(),
			registry,
			Arc::new(PersistenceService::new(Box::new(backend.clone()))),
			bus.clone(),
		));
		Harness {
			controller,
			store,
			backend,
			bus,
		}
	}

	fn item_state(store: &OrderStore, order_id: i64, item_id: &str) -> (ItemStatus, Option<String>) {
		let order = store.order(order_id).unwrap();
		let item = order.item(item_id).unwrap();
		(item.status, item.workstation_id.clone())
	}

	#[tokio::test]
	async fn advance_walks_the_full_pipeline() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, Some("kitchen"))])]);

		let expected = [
			(ItemStatus::InProgress, Some("kitchen".to_string())),
			(ItemStatus::New, Some("grill".to_string())),
			(ItemStatus::InProgress, Some("grill".to_string())),
			// The hop onto the terminal station lands as New; the guard
			// presents it as Ready from then on.
			(ItemStatus::New, Some("ready".to_string())),
		];
		for step in &expected {
			h.controller.advance_item(1, "a").await.unwrap();
			assert_eq!(&item_state(&h.store, 1, "a"), step);
		}

		// Ready at the terminal station has nowhere to go.
		let err = h.controller.advance_item(1, "a").await.unwrap_err();
		assert!(matches!(err, CommandError::InvalidTransition(_)));
		assert_eq!(&item_state(&h.store, 1, "a"), expected.last().unwrap());
		// Four confirmations, none for the rejected fifth step.
		assert_eq!(h.backend.call_count(), 4);
	}

	#[tokio::test]
	async fn revert_walks_back_to_the_first_station() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::Ready, Some("ready"))])]);

		let expected = [
			(ItemStatus::InProgress, Some("grill".to_string())),
			(ItemStatus::New, Some("grill".to_string())),
			(ItemStatus::InProgress, Some("kitchen".to_string())),
			(ItemStatus::New, Some("kitchen".to_string())),
		];
		for step in &expected {
			h.controller.revert_item(1, "a").await.unwrap();
			assert_eq!(&item_state(&h.store, 1, "a"), step);
		}

		let err = h.controller.revert_item(1, "a").await.unwrap_err();
		assert!(matches!(err, CommandError::InvalidTransition(_)));
		assert_eq!(&item_state(&h.store, 1, "a"), expected.last().unwrap());
	}

	#[tokio::test]
	async fn advanced_events_carry_the_transition() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, None)])]);
		let mut rx = h.bus.subscribe();

		h.controller.advance_item(1, "a").await.unwrap();

		match rx.recv().await.unwrap() {
			KdsEvent::Item(ItemEvent::Advanced {
				order_id,
				item_id,
				transition,
			}) => {
				assert_eq!((order_id, item_id.as_str()), (1, "a"));
				assert_eq!(transition.new_status, ItemStatus::InProgress);
				assert_eq!(transition.new_workstation_id, None);
			},
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[tokio::test]
	async fn persist_failure_rolls_back_and_reports() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, Some("kitchen"))])]);
		h.backend.set_fail_all(true);
		let before = h.store.order(1).unwrap();
		let mut rx = h.bus.subscribe();

		let err = h.controller.advance_item(1, "a").await.unwrap_err();

		assert!(matches!(err, CommandError::PersistenceFailure(_)));
		assert_eq!(h.store.order(1).unwrap(), before);
		// Subscribers saw the optimistic step, then the rollback.
		assert!(matches!(
			rx.recv().await.unwrap(),
			KdsEvent::Item(ItemEvent::Advanced { .. })
		));
		assert!(matches!(
			rx.recv().await.unwrap(),
			KdsEvent::Item(ItemEvent::RolledBack { .. })
		));
	}

	#[tokio::test]
	async fn optimistic_state_is_visible_while_confirmation_is_parked() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, Some("kitchen"))])]);
		h.backend.hold();

		let pending = {
			let controller = h.controller.clone();
			tokio::spawn(async move { controller.advance_item(1, "a").await })
		};
		tokio::task::yield_now().await;

		// The mutation landed before the backend answered.
		assert!(!pending.is_finished());
		assert_eq!(
			item_state(&h.store, 1, "a"),
			(ItemStatus::InProgress, Some("kitchen".to_string()))
		);

		h.backend.release();
		pending.await.unwrap().unwrap();
		assert_eq!(
			item_state(&h.store, 1, "a"),
			(ItemStatus::InProgress, Some("kitchen".to_string()))
		);
	}

	#[tokio::test]
	async fn concurrent_steps_on_one_item_are_rejected() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, Some("kitchen"))])]);
		h.backend.hold();

		let pending = {
			let controller = h.controller.clone();
			tokio::spawn(async move { controller.advance_item(1, "a").await })
		};
		tokio::task::yield_now().await;

		let err = h.controller.advance_item(1, "a").await.unwrap_err();
		assert_eq!(
			err,
			CommandError::ConcurrentTransitionConflict {
				order_id: 1,
				item_id: "a".to_string(),
			}
		);

		h.backend.release();
		pending.await.unwrap().unwrap();
		// The guard clears once the first confirmation resolves.
		h.controller.advance_item(1, "a").await.unwrap();
	}

	#[tokio::test]
	async fn steps_on_different_items_interleave() {
		let h = setup(vec![order(
			1,
			vec![
				item("a", ItemStatus::New, Some("kitchen")),
				item("b", ItemStatus::New, Some("grill")),
			],
		)]);
		h.backend.hold();

		let first = {
			let controller = h.controller.clone();
			tokio::spawn(async move { controller.advance_item(1, "a").await })
		};
		let second = {
			let controller = h.controller.clone();
			tokio::spawn(async move { controller.advance_item(1, "b").await })
		};
		tokio::task::yield_now().await;

		// Both are parked in the backend; neither was rejected as a
		// conflict.
		assert!(!first.is_finished());
		assert!(!second.is_finished());

		h.backend.release();
		first.await.unwrap().unwrap();
		second.await.unwrap().unwrap();
	}

	#[tokio::test]
	async fn refresh_during_confirmation_wins_over_the_rollback() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, Some("kitchen"))])]);
		h.backend.hold();
		h.backend.set_fail_all(true);

		let pending = {
			let controller = h.controller.clone();
			tokio::spawn(async move { controller.advance_item(1, "a").await })
		};
		tokio::task::yield_now().await;

		// An external refresh replaces the board while the confirmation is
		// still parked.
		h.store
			.replace_all(vec![order(1, vec![item("a", ItemStatus::Ready, Some("grill"))])])
			.unwrap();

		h.backend.release();
		let err = pending.await.unwrap().unwrap_err();
		assert!(matches!(err, CommandError::PersistenceFailure(_)));

		// The refreshed state stands; the stale rollback was discarded.
		assert_eq!(
			item_state(&h.store, 1, "a"),
			(ItemStatus::Ready, Some("grill".to_string()))
		);
	}

	#[tokio::test]
	async fn serve_takes_a_ready_item_off_the_board() {
		let h = setup(vec![order(
			1,
			vec![
				item("a", ItemStatus::Ready, Some("ready")),
				item("b", ItemStatus::Served, Some("ready")),
			],
		)]);
		let mut rx = h.bus.subscribe();

		let updated = h.controller.serve_item(1, "a").await.unwrap();

		assert!(updated.is_complete());
		assert_eq!(updated.status, OrderStatus::Completed);
		assert!(matches!(
			rx.recv().await.unwrap(),
			KdsEvent::Item(ItemEvent::Served { .. })
		));
		assert!(matches!(
			rx.recv().await.unwrap(),
			KdsEvent::Order(OrderEvent::Completed { order_id: 1 })
		));
	}

	#[tokio::test]
	async fn serve_rejects_items_not_ready_at_the_terminal() {
		let h = setup(vec![order(
			1,
			vec![
				item("a", ItemStatus::Ready, Some("grill")),
				item("b", ItemStatus::Served, Some("ready")),
			],
		)]);

		let err = h.controller.serve_item(1, "a").await.unwrap_err();
		assert!(matches!(err, CommandError::InvalidTransition(_)));

		let err = h.controller.serve_item(1, "b").await.unwrap_err();
		assert!(matches!(err, CommandError::InvalidTransition(_)));
	}

	#[tokio::test]
	async fn guard_presents_terminal_items_as_ready_to_routing() {
		// Stored as New at the terminal station; the guard reads it as
		// Ready, so advancing rejects instead of marking it InProgress.
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, Some("ready"))])]);

		let err = h.controller.advance_item(1, "a").await.unwrap_err();
		assert!(matches!(err, CommandError::InvalidTransition(_)));

		// Serving works directly from the guarded view.
		h.controller.serve_item(1, "a").await.unwrap();
		assert_eq!(item_state(&h.store, 1, "a").0, ItemStatus::Served);
	}

	#[tokio::test]
	async fn unknown_workstations_are_reported_not_crashed() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, Some("fryer"))])]);

		let err = h.controller.advance_item(1, "a").await.unwrap_err();
		assert_eq!(err, CommandError::UnknownWorkstation("fryer".to_string()));
	}

	#[tokio::test]
	async fn missing_targets_report_precise_errors() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, None)])]);

		assert_eq!(
			h.controller.advance_item(9, "a").await.unwrap_err(),
			CommandError::OrderNotFound(9)
		);
		assert_eq!(
			h.controller.advance_item(1, "zz").await.unwrap_err(),
			CommandError::ItemNotFound {
				order_id: 1,
				item_id: "zz".to_string(),
			}
		);
	}

	#[tokio::test]
	async fn toggle_pin_confirms_and_round_trips() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, None)])]);

		assert!(h.controller.toggle_pin(1).await.unwrap().is_pinned);
		assert!(!h.controller.toggle_pin(1).await.unwrap().is_pinned);

		assert_eq!(
			h.backend.recorded(),
			vec![
				PersistCall::Pin {
					order_id: 1,
					is_pinned: true,
				},
				PersistCall::Pin {
					order_id: 1,
					is_pinned: false,
				},
			]
		);
	}

	#[tokio::test]
	async fn toggle_pin_rolls_back_on_failure() {
		let h = setup(vec![order(1, vec![item("a", ItemStatus::New, None)])]);
		h.backend.set_fail_all(true);

		let err = h.controller.toggle_pin(1).await.unwrap_err();
		assert!(matches!(err, CommandError::PersistenceFailure(_)));
		assert!(!h.store.order(1).unwrap().is_pinned);
	}

	#[tokio::test]
	async fn reposition_confirms_the_new_assignments() {
		let h = setup(vec![
			order(1, vec![item("a", ItemStatus::New, None)]),
			order(2, vec![item("a", ItemStatus::New, None)]),
			order(3, vec![item("a", ItemStatus::New, None)]),
		]);

		let assignments = h.controller.reposition_order(3, 0).await.unwrap();
		assert_eq!(assignments, [(3, 0), (1, 1), (2, 2)]);
		assert_eq!(
			h.backend.recorded(),
			vec![PersistCall::Positions {
				assignments: vec![(3, 0), (1, 1), (2, 2)],
			}]
		);
	}

	#[tokio::test]
	async fn reposition_rolls_back_on_failure() {
		let h = setup(vec![
			order(1, vec![item("a", ItemStatus::New, None)]),
			order(2, vec![item("a", ItemStatus::New, None)]),
		]);
		h.backend.set_fail_all(true);

		let err = h.controller.reposition_order(2, 0).await.unwrap_err();
		assert!(matches!(err, CommandError::PersistenceFailure(_)));

		let display: Vec<i64> = h.store.orders().unwrap().iter().map(|o| o.id).collect();
		assert_eq!(display, [1, 2]);
	}
}
