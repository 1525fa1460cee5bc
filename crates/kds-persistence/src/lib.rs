//! Persistence boundary for the KDS routing core.
//!
//! The routing core applies every change optimistically and then confirms it
//! through this boundary. A backend is invoked at most once per transition;
//! whether to retry a failed confirmation is the caller's decision, because
//! the caller is the one holding the rollback snapshot.

use async_trait::async_trait;
use kds_types::{short_id, ConfigSchema, ImplementationRegistry, TransitionRecord};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod journal;
	pub mod memory;
}

/// Errors that can occur during persistence operations.
#[derive(Debug, Error)]
pub enum PersistenceError {
	/// The remote side refused the change.
	#[error("Rejected: {0}")]
	Rejected(String),
	/// An I/O problem kept the change from being recorded.
	#[error("Io error: {0}")]
	Io(String),
	/// The change could not be encoded for the backend.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for persistence backends.
///
/// Implementations confirm board changes with whatever the surrounding
/// system considers the source of truth. Each method is called at most once
/// per change; a returned error means the caller rolls back its optimistic
/// state.
#[async_trait]
pub trait PersistInterface: Send + Sync {
	/// Returns the configuration schema for this persistence implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Confirms one item transition.
	async fn persist_transition(
		&self,
		order_id: i64,
		item_id: &str,
		record: &TransitionRecord,
	) -> Result<(), PersistenceError>;

	/// Confirms an order pin flip.
	async fn persist_pin(&self, order_id: i64, is_pinned: bool) -> Result<(), PersistenceError>;

	/// Confirms a batch of display-position assignments.
	async fn persist_positions(
		&self,
		assignments: &[(i64, i64)],
	) -> Result<(), PersistenceError>;
}

/// Type alias for persistence factory functions.
pub type PersistenceFactory = fn(&toml::Value) -> Result<Box<dyn PersistInterface>, PersistenceError>;

/// Registry trait for persistence implementations.
pub trait PersistenceRegistry: ImplementationRegistry<Factory = PersistenceFactory> {}

/// Get all registered persistence implementations.
///
/// Returns a vector of (name, factory) tuples for all available backends,
/// used by the service binary to assemble its factory map.
pub fn get_all_implementations() -> Vec<(&'static str, PersistenceFactory)> {
	use implementations::{journal, memory};

	vec![
		(journal::Registry::NAME, journal::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level persistence service wrapping a configured backend.
///
/// Adds structured logging around the backend calls; the semantics stay
/// those of [`PersistInterface`].
pub struct PersistenceService {
	/// The underlying persistence backend implementation.
	backend: Box<dyn PersistInterface>,
}

impl PersistenceService {
	/// Creates a new PersistenceService with the specified backend.
	pub fn new(backend: Box<dyn PersistInterface>) -> Self {
		Self { backend }
	}

	/// Confirms one item transition with the backend.
	pub async fn confirm_transition(
		&self,
		order_id: i64,
		item_id: &str,
		record: &TransitionRecord,
	) -> Result<(), PersistenceError> {
		tracing::debug!(
			order_id,
			item_id = %short_id(item_id),
			status = %record.status,
			"confirming transition"
		);
		self.backend
			.persist_transition(order_id, item_id, record)
			.await
	}

	/// Confirms an order pin flip with the backend.
	pub async fn confirm_pin(
		&self,
		order_id: i64,
		is_pinned: bool,
	) -> Result<(), PersistenceError> {
		tracing::debug!(order_id, is_pinned, "confirming pin");
		self.backend.persist_pin(order_id, is_pinned).await
	}

	/// Confirms a batch of display positions with the backend.
	pub async fn confirm_positions(
		&self,
		assignments: &[(i64, i64)],
	) -> Result<(), PersistenceError> {
		tracing::debug!(count = assignments.len(), "confirming positions");
		self.backend.persist_positions(assignments).await
	}
}
