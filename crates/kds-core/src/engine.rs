//! Engine assembly and run loop.
//!
//! The builder turns a parsed configuration plus factory maps into a wired
//! engine: store, workstation registry, persistence backend, feed sources
//! and event bus. [`KdsEngine::run`] then drives the feed loop until
//! shutdown.

use crate::controller::MutationController;
use crate::event_bus::EventBus;
use crate::queries::BoardView;
use crate::stations::StationRegistry;
use kds_config::Config;
use kds_feed::{FeedFactory, FeedInterface, FeedService};
use kds_persistence::{PersistenceFactory, PersistenceService};
use kds_store::OrderStore;
use kds_types::{KdsEvent, Order, StoreSnapshot, SyncEvent, Workstation, WorkstationSequence};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur while assembling or running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
}

/// Factory maps the service binary assembles from the implementation
/// registries.
pub struct KdsFactories {
	pub persistence_factories: HashMap<String, PersistenceFactory>,
	pub feed_factories: HashMap<String, FeedFactory>,
}

/// Builds a [`KdsEngine`] from configuration.
pub struct KdsBuilder {
	config: Config,
}

impl KdsBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Instantiates the configured implementations and wires the engine.
	///
	/// The primary persistence backend is mandatory and any failure there is
	/// an error. Feed sources are best-effort: a misconfigured source is
	/// logged and skipped, and an engine without sources still serves
	/// whatever is pushed to it programmatically.
	pub fn build(self, factories: KdsFactories) -> Result<KdsEngine, EngineError> {
		let persistence = build_persistence(&self.config, &factories.persistence_factories)?;
		let feed = FeedService::new(build_feeds(&self.config, &factories.feed_factories));

		let store = Arc::new(OrderStore::new(Vec::new()));
		let stations = Arc::new(StationRegistry::new(WorkstationSequence::new(
			self.config.workstations(),
		)));
		let event_bus = EventBus::new(self.config.kds.event_capacity);

		Ok(KdsEngine::new(
			self.config,
			store,
			stations,
			Arc::new(persistence),
			feed,
			event_bus,
		))
	}
}

fn build_persistence(
	config: &Config,
	factories: &HashMap<String, PersistenceFactory>,
) -> Result<PersistenceService, EngineError> {
	let primary = &config.persistence.primary;
	let implementation_config = config.persistence.implementations.get(primary).ok_or_else(|| {
		EngineError::Config(format!(
			"Persistence implementation '{}' is not configured",
			primary
		))
	})?;
	let factory = factories.get(primary).ok_or_else(|| {
		EngineError::Config(format!("Unknown persistence implementation: {}", primary))
	})?;
	let backend = factory(implementation_config).map_err(|e| {
		EngineError::Config(format!(
			"Failed to create persistence implementation '{}': {}",
			primary, e
		))
	})?;
	tracing::info!(component = "persistence", implementation = %primary, "Loaded");
	Ok(PersistenceService::new(backend))
}

fn build_feeds(
	config: &Config,
	factories: &HashMap<String, FeedFactory>,
) -> Vec<Box<dyn FeedInterface>> {
	let mut sources = Vec::new();
	for (name, implementation_config) in &config.feed.implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(implementation = %name, "Unknown feed implementation, skipping");
			continue;
		};
		match factory(implementation_config) {
			Ok(source) => {
				tracing::info!(component = "feed", implementation = %name, "Loaded");
				sources.push(source);
			},
			Err(e) => {
				tracing::error!(implementation = %name, error = %e, "Failed to create feed implementation, skipping");
			},
		}
	}
	if sources.is_empty() {
		tracing::warn!("No feed sources available - the board only updates through pushed snapshots");
	}
	sources
}

/// The assembled kitchen display engine.
pub struct KdsEngine {
	config: Config,
	store: Arc<OrderStore>,
	stations: Arc<StationRegistry>,
	controller: Arc<MutationController>,
	view: BoardView,
	event_bus: EventBus,
	feed: FeedService,
}

// Manual impl: the feed sources are trait objects without a `Debug` bound,
// so the struct cannot derive it.
impl std::fmt::Debug for KdsEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KdsEngine")
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl KdsEngine {
	/// Wires an engine from already-built parts.
	///
	/// The builder goes through here; embedders and tests can call it
	/// directly with hand-constructed services.
	pub fn new(
		config: Config,
		store: Arc<OrderStore>,
		stations: Arc<StationRegistry>,
		persistence: Arc<PersistenceService>,
		feed: FeedService,
		event_bus: EventBus,
	) -> Self {
		let controller = Arc::new(MutationController::new(
			store.clone(),
			stations.clone(),
			persistence,
			event_bus.clone(),
		));
		let view = BoardView::new(store.clone(), stations.clone());
		Self {
			config,
			store,
			stations,
			controller,
			view,
			event_bus,
			feed,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Command surface for board mutations.
	pub fn controller(&self) -> &MutationController {
		&self.controller
	}

	/// Read surface for display layers.
	pub fn view(&self) -> &BoardView {
		&self.view
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Starts the feed sources and consumes their snapshots until Ctrl+C.
	pub async fn run(&self) -> Result<(), EngineError> {
		let (snapshot_tx, mut snapshot_rx) = mpsc::unbounded_channel();
		self.feed
			.start_all(snapshot_tx)
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;
		tracing::info!(kds_id = %self.config.kds.id, "Engine started");

		loop {
			tokio::select! {
				Some(snapshot) = snapshot_rx.recv() => {
					tracing::info!(order_count = snapshot.orders.len(), "Received store snapshot");
					if let Err(e) = self.apply_snapshot(snapshot) {
						tracing::error!(error = %e, "Failed to apply store snapshot");
					}
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutting down");
					break;
				}
			}
		}

		self.feed
			.stop_all()
			.await
			.map_err(|e| EngineError::Service(e.to_string()))
	}

	/// Applies a feed snapshot: stations first, then orders, so the orders
	/// are never interpreted against a stale sequence.
	pub fn apply_snapshot(&self, snapshot: StoreSnapshot) -> Result<(), EngineError> {
		if let Some(stations) = snapshot.workstations {
			self.replace_stations(stations);
		}
		self.replace_all(snapshot.orders)
	}

	/// Replaces the whole order store and announces the refresh.
	pub fn replace_all(&self, orders: Vec<Order>) -> Result<(), EngineError> {
		let generation = self
			.store
			.replace_all(orders)
			.map_err(|e| EngineError::Service(e.to_string()))?;
		let order_count = self
			.store
			.order_count()
			.map_err(|e| EngineError::Service(e.to_string()))?;
		self.event_bus
			.publish(KdsEvent::Sync(SyncEvent::StoreRefreshed {
				order_count,
				generation,
			}))
			.ok();
		Ok(())
	}

	/// Swaps in a new workstation sequence. An empty sequence is refused by
	/// the registry and announces nothing.
	pub fn replace_stations(&self, stations: Vec<Workstation>) {
		let sequence = WorkstationSequence::new(stations);
		let station_count = sequence.len();
		if self.stations.replace(sequence) {
			self.event_bus
				.publish(KdsEvent::Sync(SyncEvent::StationsRefreshed { station_count }))
				.ok();
		}
	}
}
