//! In-memory order store for the kitchen board.
//!
//! The store is the single owner of order state for a session. Mutations are
//! applied under a synchronous lock so concurrent readers always observe a
//! fully applied change, never a half-written one; the lock is never held
//! across an await point. A whole-store replacement bumps a generation
//! counter that lets stale rollbacks detect they no longer apply.

use kds_types::{Order, OrderItem};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
	/// No order with the given id is on the board.
	#[error("order not found: {0}")]
	OrderNotFound(i64),
	/// The order exists but has no item with the given id.
	#[error("item {item_id} not found in order {order_id}")]
	ItemNotFound { order_id: i64, item_id: String },
	/// The store lock was poisoned by a panicking writer.
	#[error("store lock poisoned: {0}")]
	Lock(String),
}

/// A point-in-time copy of one order, tied to the store generation it was
/// taken from. Used by the optimistic controller to restore state after a
/// failed persistence call.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSnapshot {
	/// The order exactly as stored at snapshot time.
	pub order: Order,
	/// Store generation at snapshot time.
	pub generation: u64,
}

/// A point-in-time copy of the display-position assignments of all orders.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionsSnapshot {
	/// (order id, position) pairs in display order.
	pub positions: Vec<(i64, i64)>,
	/// Store generation at snapshot time.
	pub generation: u64,
}

struct StoreInner {
	orders: HashMap<i64, Order>,
	generation: u64,
}

/// The normalized in-memory collection of orders.
pub struct OrderStore {
	inner: RwLock<StoreInner>,
}

impl OrderStore {
	/// Creates a store from an initial order list.
	pub fn new(initial: Vec<Order>) -> Self {
		Self {
			inner: RwLock::new(StoreInner {
				orders: normalize(initial),
				generation: 0,
			}),
		}
	}

	fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreInner>, StoreError> {
		self.inner.read().map_err(|e| StoreError::Lock(e.to_string()))
	}

	fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreInner>, StoreError> {
		self.inner.write().map_err(|e| StoreError::Lock(e.to_string()))
	}

	/// Atomically replaces the whole store with an external snapshot.
	///
	/// This is the refresh path: the external source is authoritative, so
	/// any optimistic local state is discarded along with the old contents.
	/// Returns the new store generation.
	pub fn replace_all(&self, orders: Vec<Order>) -> Result<u64, StoreError> {
		let mut inner = self.write()?;
		inner.orders = normalize(orders);
		inner.generation += 1;
		tracing::debug!(
			order_count = inner.orders.len(),
			generation = inner.generation,
			"store replaced from external snapshot"
		);
		Ok(inner.generation)
	}

	/// Current store generation. Bumped only by [`OrderStore::replace_all`].
	pub fn generation(&self) -> Result<u64, StoreError> {
		Ok(self.read()?.generation)
	}

	/// Number of orders on the board.
	pub fn order_count(&self) -> Result<usize, StoreError> {
		Ok(self.read()?.orders.len())
	}

	/// Returns a copy of one order.
	pub fn order(&self, order_id: i64) -> Result<Order, StoreError> {
		self.read()?
			.orders
			.get(&order_id)
			.cloned()
			.ok_or(StoreError::OrderNotFound(order_id))
	}

	/// Returns copies of all orders in display order: pinned orders first,
	/// then ascending position.
	pub fn orders(&self) -> Result<Vec<Order>, StoreError> {
		let inner = self.read()?;
		let mut orders: Vec<Order> = inner.orders.values().cloned().collect();
		orders.sort_by_key(|o| (!o.is_pinned, o.position));
		Ok(orders)
	}

	/// Takes a rollback snapshot of one order.
	pub fn snapshot_order(&self, order_id: i64) -> Result<OrderSnapshot, StoreError> {
		let inner = self.read()?;
		let order = inner
			.orders
			.get(&order_id)
			.cloned()
			.ok_or(StoreError::OrderNotFound(order_id))?;
		Ok(OrderSnapshot {
			order,
			generation: inner.generation,
		})
	}

	/// Applies a closure to one order and returns the updated copy.
	///
	/// The derived order status is recomputed after the closure runs, so
	/// callers never have to remember to keep it consistent.
	pub fn update_order_with<F>(&self, order_id: i64, updater: F) -> Result<Order, StoreError>
	where
		F: FnOnce(&mut Order),
	{
		let mut inner = self.write()?;
		let order = inner
			.orders
			.get_mut(&order_id)
			.ok_or(StoreError::OrderNotFound(order_id))?;
		updater(order);
		order.status = order.derived_status();
		Ok(order.clone())
	}

	/// Applies a closure to one item and returns the updated order copy.
	pub fn update_item_with<F>(
		&self,
		order_id: i64,
		item_id: &str,
		updater: F,
	) -> Result<Order, StoreError>
	where
		F: FnOnce(&mut OrderItem),
	{
		let mut inner = self.write()?;
		let order = inner
			.orders
			.get_mut(&order_id)
			.ok_or(StoreError::OrderNotFound(order_id))?;
		let item = order
			.item_mut(item_id)
			.ok_or_else(|| StoreError::ItemNotFound {
				order_id,
				item_id: item_id.to_string(),
			})?;
		updater(item);
		order.status = order.derived_status();
		Ok(order.clone())
	}

	/// Restores an order from a snapshot taken before an optimistic change.
	///
	/// Returns `false` without touching anything when the store generation
	/// has moved on since the snapshot: a refresh replaced the board, the
	/// external source is authoritative, and the rollback no longer applies.
	pub fn restore_order(&self, snapshot: OrderSnapshot) -> Result<bool, StoreError> {
		let mut inner = self.write()?;
		if inner.generation != snapshot.generation {
			tracing::debug!(
				order_id = snapshot.order.id,
				snapshot_generation = snapshot.generation,
				store_generation = inner.generation,
				"discarding stale rollback after store refresh"
			);
			return Ok(false);
		}
		inner.orders.insert(snapshot.order.id, snapshot.order);
		Ok(true)
	}

	/// Takes a rollback snapshot of all display positions.
	pub fn snapshot_positions(&self) -> Result<PositionsSnapshot, StoreError> {
		let inner = self.read()?;
		let mut positions: Vec<(i64, i64)> =
			inner.orders.values().map(|o| (o.id, o.position)).collect();
		positions.sort_by_key(|&(_, position)| position);
		Ok(PositionsSnapshot {
			positions,
			generation: inner.generation,
		})
	}

	/// Splices one order to a new slot in the display ordering and
	/// reassigns contiguous positions. Returns the new assignments in
	/// display order.
	pub fn apply_reposition(
		&self,
		order_id: i64,
		target_index: usize,
	) -> Result<Vec<(i64, i64)>, StoreError> {
		let mut inner = self.write()?;
		let mut ids: Vec<i64> = {
			let mut pairs: Vec<(i64, i64)> =
				inner.orders.values().map(|o| (o.id, o.position)).collect();
			pairs.sort_by_key(|&(_, position)| position);
			pairs.into_iter().map(|(id, _)| id).collect()
		};

		let from = ids
			.iter()
			.position(|&id| id == order_id)
			.ok_or(StoreError::OrderNotFound(order_id))?;
		ids.remove(from);
		ids.insert(target_index.min(ids.len()), order_id);

		let mut assignments = Vec::with_capacity(ids.len());
		for (index, id) in ids.iter().enumerate() {
			if let Some(order) = inner.orders.get_mut(id) {
				order.position = index as i64;
				assignments.push((*id, index as i64));
			}
		}
		Ok(assignments)
	}

	/// Restores display positions from a snapshot, unless the store has been
	/// refreshed since (same rule as [`OrderStore::restore_order`]).
	pub fn restore_positions(&self, snapshot: &PositionsSnapshot) -> Result<bool, StoreError> {
		let mut inner = self.write()?;
		if inner.generation != snapshot.generation {
			return Ok(false);
		}
		for &(order_id, position) in &snapshot.positions {
			if let Some(order) = inner.orders.get_mut(&order_id) {
				order.position = position;
			}
		}
		Ok(true)
	}
}

/// Canonicalizes an incoming order list.
///
/// Orders are stably sorted by their supplied position (input order wins on
/// ties) and re-numbered 0..n, and each derived order status is recomputed
/// from its items. This is the only place external ordering and status
/// inconsistencies are repaired.
fn normalize(mut orders: Vec<Order>) -> HashMap<i64, Order> {
	orders.sort_by_key(|o| o.position);
	for (index, order) in orders.iter_mut().enumerate() {
		order.position = index as i64;
		order.status = order.derived_status();
	}
	orders.into_iter().map(|o| (o.id, o)).collect()
}
