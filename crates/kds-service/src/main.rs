//! Main entry point for the kitchen display service.
//!
//! This binary wires the pluggable persistence and feed implementations into
//! the core engine, then runs the snapshot feed loop until interrupted. With
//! `--demo` it instead drives a scripted walkthrough of the routing
//! lifecycle against an in-memory backend.

use clap::Parser;
use kds_config::Config;
use kds_core::{KdsBuilder, KdsEngine, KdsFactories};
use std::path::PathBuf;

mod demo;

// Import implementations from individual crates
use kds_feed::implementations::fixture::create_feed as create_fixture_feed;
use kds_persistence::implementations::journal::create_persistence as create_journal_persistence;
use kds_persistence::implementations::memory::create_persistence as create_memory_persistence;

/// Command-line arguments for the kitchen display service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Run the scripted routing walkthrough instead of the feed loop
	#[arg(long)]
	demo: bool,
}

/// Main entry point for the kitchen display service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine with all implementations
/// 5. Runs the feed loop until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	// Create env filter with default from args
	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	if args.demo {
		return demo::run().await;
	}

	tracing::info!("Started kitchen display service");

	// Load configuration
	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!("Loaded configuration [{}]", config.kds.id);

	// Build the engine with implementations
	let engine = build_kds(config)?;
	engine.run().await?;

	tracing::info!("Stopped kitchen display service");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the engine with all registered implementations.
///
/// This function wires up the concrete implementations for:
/// - Persistence backends (append-only journal file, in-memory)
/// - Feed sources (fixture file snapshots)
fn build_kds(config: Config) -> Result<KdsEngine, Box<dyn std::error::Error>> {
	let builder = KdsBuilder::new(config);

	let persistence_factories = create_factory_map!(
		kds_persistence::PersistInterface,
		kds_persistence::PersistenceError,
		"journal" => create_journal_persistence,
		"memory" => create_memory_persistence,
	);

	let feed_factories = create_factory_map!(
		kds_feed::FeedInterface,
		kds_feed::FeedError,
		"fixture" => create_fixture_feed,
	);

	let factories = KdsFactories {
		persistence_factories,
		feed_factories,
	};

	Ok(builder.build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use kds_config::{FeedConfig, KdsConfig, PersistenceConfig, StationConfig};
	use std::collections::HashMap;
	use toml::Value;

	const CONFIG_FILE: &str = r#"
		[kds]
		id = "pass-1"

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

		[feed.implementations.fixture]
		path = "orders.json"
	"#;

	/// Creates a minimal test configuration for unit testing
	fn create_test_config() -> Config {
		Config {
			kds: KdsConfig {
				id: "test-board".to_string(),
				event_capacity: 16,
			},
			stations: vec![
				StationConfig {
					id: "kitchen".to_string(),
					name: "Kitchen".to_string(),
					position: 0,
				},
				StationConfig {
					id: "ready".to_string(),
					name: "Ready".to_string(),
					position: 1,
				},
			],
			persistence: PersistenceConfig {
				primary: "memory".to_string(),
				implementations: {
					let mut map = HashMap::new();
					map.insert("memory".to_string(), Value::Table(toml::map::Map::new()));
					map
				},
			},
			feed: FeedConfig::default(),
		}
	}

	#[test]
	fn args_defaults_match_the_documented_values() {
		let args = Args::try_parse_from(["kds"]).unwrap();

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
		assert!(!args.demo);
	}

	#[test]
	fn factory_map_macro_builds_typed_maps() {
		use kds_persistence::{PersistInterface, PersistenceError};

		let factories = create_factory_map!(
			PersistInterface,
			PersistenceError,
			"journal" => create_journal_persistence,
			"memory" => create_memory_persistence,
		);

		assert_eq!(factories.len(), 2);
		assert!(factories.contains_key("journal"));
		assert!(factories.contains_key("memory"));
	}

	#[test]
	fn build_wires_a_minimal_config() {
		let engine = build_kds(create_test_config()).unwrap();

		assert_eq!(engine.config().kds.id, "test-board");
		assert_eq!(engine.view().stations().len(), 2);
	}

	#[test]
	fn build_rejects_unknown_primary_persistence() {
		let mut config = create_test_config();
		config.persistence.primary = "postgres".to_string();

		assert!(build_kds(config).is_err());
	}

	#[tokio::test]
	async fn startup_path_loads_a_file_and_builds() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("kds.toml");
		std::fs::write(&path, CONFIG_FILE).unwrap();

		let config = Config::from_file(&path.to_string_lossy()).await.unwrap();
		let engine = build_kds(config).unwrap();

		assert_eq!(engine.config().kds.id, "pass-1");
		assert_eq!(engine.view().stations().len(), 3);
	}
}
