//! Scripted walkthrough of the routing lifecycle for `--demo`.
//!
//! Assembles an engine around an in-memory backend and the programmatic
//! channel feed, seeds a small board, then drives a burger across every
//! workstation, pins and repositions an order, provokes a persistence
//! failure to show the rollback, and finally hands the item off. Everything
//! of interest lands in the log.

use kds_config::Config;
use kds_core::{EventBus, KdsEngine, StationRegistry};
use kds_feed::implementations::channel::ChannelFeed;
use kds_feed::FeedService;
use kds_persistence::implementations::memory::MemoryPersistence;
use kds_persistence::PersistenceService;
use kds_store::OrderStore;
use kds_types::{ItemStatus, Order, OrderItem, OrderStatus, StoreSnapshot, WorkstationSequence};
use std::sync::Arc;
use std::time::Duration;

const DEMO_CONFIG: &str = r#"
	[kds]
	id = "demo-board"

	[[stations]]
	id = "kitchen"
	name = "Kitchen"
	position = 0

	[[stations]]
	id = "grill"
	name = "Grill"
	position = 1

	[[stations]]
	id = "ready"
	name = "Ready"
	position = 2

	[persistence]
	primary = "memory"

	[persistence.implementations.memory]
"#;

/// Runs the walkthrough to completion.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
	let config: Config = toml::from_str(DEMO_CONFIG)?;
	let backend = MemoryPersistence::new();
	let probe = backend.clone();
	let (feed, handle) = ChannelFeed::new();

	let store = Arc::new(OrderStore::new(Vec::new()));
	let stations = Arc::new(StationRegistry::new(WorkstationSequence::new(
		config.workstations(),
	)));
	let event_bus = EventBus::new(config.kds.event_capacity);
	let engine = Arc::new(KdsEngine::new(
		config,
		store,
		stations,
		Arc::new(PersistenceService::new(Box::new(backend))),
		FeedService::new(vec![Box::new(feed)]),
		event_bus,
	));

	let mut events = engine.event_bus().subscribe();
	let logger = tokio::spawn(async move {
		while let Ok(event) = events.recv().await {
			tracing::info!(event = ?event, "Event");
		}
	});
	let runner = {
		let engine = engine.clone();
		tokio::spawn(async move { engine.run().await })
	};

	// The channel opens once run() has started the feed.
	let snapshot = StoreSnapshot {
		orders: demo_orders(),
		workstations: None,
	};
	tokio::time::timeout(Duration::from_secs(2), async {
		while handle.push(snapshot.clone()).is_err() {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		while engine.view().orders().map(|o| o.is_empty()).unwrap_or(true) {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.map_err(|_| "the demo board never came up")?;

	tracing::info!("The board as the kitchen sees it");
	print_board(&engine)?;

	let controller = engine.controller();

	tracing::info!("Walking one burger from Kitchen to Ready; watch the stack split");
	for _ in 0..4 {
		controller.advance_item(101, "burger-1").await?;
	}
	print_board(&engine)?;

	tracing::info!("Pinning order 102 and moving it to the top");
	controller.toggle_pin(102).await?;
	controller.reposition_order(102, 0).await?;
	print_board(&engine)?;

	tracing::info!("Backend goes down; the next command rolls back");
	probe.set_fail_all(true);
	if let Err(e) = controller.advance_item(101, "fries-1").await {
		tracing::info!(error = %e, "Command failed and the board was restored");
	}
	probe.set_fail_all(false);
	print_board(&engine)?;

	tracing::info!("Handing the finished burger off");
	controller.serve_item(101, "burger-1").await?;
	print_board(&engine)?;

	tracing::info!(confirmations = probe.call_count(), "Demo complete");
	runner.abort();
	logger.abort();
	Ok(())
}

/// Two orders: a stacked pair of burgers with fries, and a salad.
fn demo_orders() -> Vec<Order> {
	let item = |id: &str, menu: &str, position: i64| OrderItem {
		id: id.to_string(),
		menu_item_id: menu.to_string(),
		quantity: 1,
		status: ItemStatus::New,
		workstation_id: None,
		notes: None,
		selected_extra_ids: Vec::new(),
		position,
	};

	vec![
		Order {
			id: 101,
			items: vec![
				item("burger-1", "burger", 0),
				item("burger-2", "burger", 1),
				item("fries-1", "fries", 2),
			],
			is_pinned: false,
			position: 0,
			created_at: chrono::Utc::now(),
			status: OrderStatus::Pending,
		},
		Order {
			id: 102,
			items: vec![item("salad-1", "salad", 0)],
			is_pinned: false,
			position: 1,
			created_at: chrono::Utc::now(),
			status: OrderStatus::Pending,
		},
	]
}

/// Logs every order's stacked station lists in display order.
fn print_board(engine: &KdsEngine) -> Result<(), Box<dyn std::error::Error>> {
	let view = engine.view();
	let sequence = view.stations();
	for order in view.orders()? {
		let pin = if order.is_pinned { " [pinned]" } else { "" };
		tracing::info!("Order {}{}", order.id, pin);
		for station in sequence.stations() {
			let groups = view.stacked_items_at_station(order.id, &station.id)?;
			if groups.is_empty() {
				continue;
			}
			let labels: Vec<String> = groups
				.iter()
				.map(|group| {
					format!(
						"{}x {} [{}]",
						group.total_quantity,
						group.representative.menu_item_id,
						group.representative.status
					)
				})
				.collect();
			tracing::info!("  {}: {}", station.name, labels.join(", "));
		}
	}
	Ok(())
}
