//! Read surface over the order store.
//!
//! Every accessor returns guard-corrected clones: items sitting at the
//! terminal workstation read as Ready regardless of their stored status.
//! The store itself is never mutated by a read.

use crate::stations::StationRegistry;
use kds_routing::apply_guard;
use kds_stacking::stack_items;
use kds_store::{OrderStore, StoreError};
use kds_types::{Order, OrderItem, StackedItemGroup, Workstation, WorkstationSequence};
use std::sync::Arc;

/// Read-only view of the board for display layers.
#[derive(Clone)]
pub struct BoardView {
	store: Arc<OrderStore>,
	stations: Arc<StationRegistry>,
}

impl BoardView {
	pub fn new(store: Arc<OrderStore>, stations: Arc<StationRegistry>) -> Self {
		Self { store, stations }
	}

	/// The active workstation sequence.
	pub fn stations(&self) -> Arc<WorkstationSequence> {
		self.stations.current()
	}

	/// The rank of a workstation in the active sequence.
	pub fn station_rank(&self, workstation_id: &str) -> Option<usize> {
		self.stations.current().rank_of(workstation_id)
	}

	/// The workstation one rank after the given id.
	pub fn next_station(&self, workstation_id: &str) -> Option<Workstation> {
		self.stations.current().next_after(workstation_id).cloned()
	}

	/// The workstation one rank before the given id.
	pub fn previous_station(&self, workstation_id: &str) -> Option<Workstation> {
		self.stations.current().previous_before(workstation_id).cloned()
	}

	/// All orders in display order, pinned orders first.
	pub fn orders(&self) -> Result<Vec<Order>, StoreError> {
		let sequence = self.stations.current();
		let mut orders = self.store.orders()?;
		for order in &mut orders {
			guard_order(order, &sequence);
		}
		Ok(orders)
	}

	/// A single order with guard-corrected items.
	pub fn order(&self, order_id: i64) -> Result<Order, StoreError> {
		let sequence = self.stations.current();
		let mut order = self.store.order(order_id)?;
		guard_order(&mut order, &sequence);
		Ok(order)
	}

	/// The items of one order currently sitting at one workstation, in
	/// position order.
	///
	/// An item with no assignment yet sits at the first workstation. Served
	/// items have left the board and never appear. A workstation outside the
	/// active sequence holds nothing.
	pub fn items_at_station(
		&self,
		order_id: i64,
		workstation_id: &str,
	) -> Result<Vec<OrderItem>, StoreError> {
		let sequence = self.stations.current();
		let order = self.store.order(order_id)?;
		let Some(target) = sequence.rank_of(workstation_id) else {
			return Ok(Vec::new());
		};

		let mut items: Vec<OrderItem> = order
			.items
			.into_iter()
			.filter(|item| item.is_on_board())
			.filter(|item| sequence.resolve_rank(item.workstation_id.as_deref()) == Some(target))
			.collect();
		items.sort_by_key(|item| item.position);
		for item in &mut items {
			apply_guard(item, &sequence);
		}
		Ok(items)
	}

	/// Same view as [`BoardView::items_at_station`], with identical items
	/// collapsed into stacked groups for the ticket rail.
	pub fn stacked_items_at_station(
		&self,
		order_id: i64,
		workstation_id: &str,
	) -> Result<Vec<StackedItemGroup>, StoreError> {
		let items = self.items_at_station(order_id, workstation_id)?;
		Ok(stack_items(&items))
	}
}

fn guard_order(order: &mut Order, sequence: &WorkstationSequence) {
	for item in &mut order.items {
		apply_guard(item, sequence);
	}
}
