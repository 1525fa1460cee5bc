//! In-memory persistence backend.
//!
//! Records every confirmation instead of sending it anywhere. Used for
//! development and tests, which also need to script failures and park
//! in-flight confirmations to exercise the rollback and conflict paths.

use crate::{PersistInterface, PersistenceError, PersistenceFactory, PersistenceRegistry};
use async_trait::async_trait;
use kds_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, TransitionRecord,
	ValidationError,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One recorded confirmation call.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistCall {
	/// An item transition confirmation.
	Transition {
		order_id: i64,
		item_id: String,
		record: TransitionRecord,
	},
	/// A pin flip confirmation.
	Pin { order_id: i64, is_pinned: bool },
	/// A display-position batch confirmation.
	Positions { assignments: Vec<(i64, i64)> },
}

/// Configuration for the in-memory persistence backend.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryPersistenceConfig {
	/// When true, every confirmation fails with a rejection.
	#[serde(default)]
	pub fail_all: bool,
	/// Artificial confirmation latency in milliseconds.
	#[serde(default)]
	pub latency_ms: u64,
}

struct MemoryState {
	calls: Mutex<Vec<PersistCall>>,
	fail_all: AtomicBool,
	gate: Mutex<Option<Arc<Notify>>>,
}

/// In-memory persistence backend that records confirmations.
///
/// Clones share their state, so a caller can keep a probe handle to a
/// backend that has already been boxed behind the persistence interface.
#[derive(Clone)]
pub struct MemoryPersistence {
	state: Arc<MemoryState>,
	latency: Duration,
}

impl MemoryPersistence {
	/// Creates a backend that accepts every confirmation immediately.
	pub fn new() -> Self {
		Self::with_config(MemoryPersistenceConfig {
			fail_all: false,
			latency_ms: 0,
		})
	}

	/// Creates a backend from configuration.
	pub fn with_config(config: MemoryPersistenceConfig) -> Self {
		Self {
			state: Arc::new(MemoryState {
				calls: Mutex::new(Vec::new()),
				fail_all: AtomicBool::new(config.fail_all),
				gate: Mutex::new(None),
			}),
			latency: Duration::from_millis(config.latency_ms),
		}
	}

	/// Creates a backend that rejects every confirmation.
	pub fn failing() -> Self {
		Self::with_config(MemoryPersistenceConfig {
			fail_all: true,
			latency_ms: 0,
		})
	}

	/// Switches the backend between accepting and rejecting.
	pub fn set_fail_all(&self, fail_all: bool) {
		self.state.fail_all.store(fail_all, Ordering::SeqCst);
	}

	/// Parks every confirmation until the returned handle releases them.
	///
	/// Lets a test assert on the optimistic state, or provoke a concurrent
	/// request, while a confirmation is still in flight.
	pub fn hold(&self) -> Arc<Notify> {
		let notify = Arc::new(Notify::new());
		if let Ok(mut gate) = self.state.gate.lock() {
			*gate = Some(notify.clone());
		}
		notify
	}

	/// Stops parking confirmations and wakes everything still waiting.
	pub fn release(&self) {
		let taken = match self.state.gate.lock() {
			Ok(mut gate) => gate.take(),
			Err(_) => None,
		};
		if let Some(notify) = taken {
			notify.notify_waiters();
		}
	}

	/// Returns a copy of everything recorded so far.
	pub fn recorded(&self) -> Vec<PersistCall> {
		match self.state.calls.lock() {
			Ok(calls) => calls.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		}
	}

	/// Number of confirmations recorded so far.
	pub fn call_count(&self) -> usize {
		self.recorded().len()
	}

	async fn settle(&self, call: PersistCall) -> Result<(), PersistenceError> {
		if let Ok(mut calls) = self.state.calls.lock() {
			calls.push(call);
		}

		let waiting = match self.state.gate.lock() {
			Ok(gate) => gate.clone(),
			Err(_) => None,
		};
		if let Some(notify) = waiting {
			notify.notified().await;
		}
		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}

		if self.state.fail_all.load(Ordering::SeqCst) {
			Err(PersistenceError::Rejected(
				"memory backend configured to fail".to_string(),
			))
		} else {
			Ok(())
		}
	}
}

impl Default for MemoryPersistence {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl PersistInterface for MemoryPersistence {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryPersistenceSchema)
	}

	async fn persist_transition(
		&self,
		order_id: i64,
		item_id: &str,
		record: &TransitionRecord,
	) -> Result<(), PersistenceError> {
		self.settle(PersistCall::Transition {
			order_id,
			item_id: item_id.to_string(),
			record: record.clone(),
		})
		.await
	}

	async fn persist_pin(&self, order_id: i64, is_pinned: bool) -> Result<(), PersistenceError> {
		self.settle(PersistCall::Pin {
			order_id,
			is_pinned,
		})
		.await
	}

	async fn persist_positions(
		&self,
		assignments: &[(i64, i64)],
	) -> Result<(), PersistenceError> {
		self.settle(PersistCall::Positions {
			assignments: assignments.to_vec(),
		})
		.await
	}
}

/// Configuration schema for MemoryPersistence.
pub struct MemoryPersistenceSchema;

impl ConfigSchema for MemoryPersistenceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("fail_all", FieldType::Boolean),
				Field::new(
					"latency_ms",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a memory persistence backend from
/// configuration.
pub fn create_persistence(
	config: &toml::Value,
) -> Result<Box<dyn PersistInterface>, PersistenceError> {
	MemoryPersistenceSchema
		.validate(config)
		.map_err(|e| PersistenceError::Configuration(e.to_string()))?;
	let parsed: MemoryPersistenceConfig = config
		.clone()
		.try_into()
		.map_err(|e| PersistenceError::Configuration(format!("Invalid memory config: {}", e)))?;
	Ok(Box::new(MemoryPersistence::with_config(parsed)))
}

/// Registry for the memory persistence implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = PersistenceFactory;

	fn factory() -> Self::Factory {
		create_persistence
	}
}

impl PersistenceRegistry for Registry {}
