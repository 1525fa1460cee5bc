//! Fixture file feed.
//!
//! Reads one [`StoreSnapshot`] from a JSON file and delivers it. Each call
//! to `start` sends the file's current contents again, which makes the
//! fixture double as a crude replay mechanism for demos.

use crate::{FeedError, FeedFactory, FeedInterface, FeedRegistry};
use async_trait::async_trait;
use kds_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, StoreSnapshot,
	ValidationError,
};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Feed that loads snapshots from a JSON fixture file.
pub struct FixtureFeed {
	path: PathBuf,
}

impl FixtureFeed {
	/// Creates a fixture feed reading from the given path.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	async fn load(&self) -> Result<StoreSnapshot, FeedError> {
		let raw = tokio::fs::read_to_string(&self.path)
			.await
			.map_err(|e| FeedError::Source(format!("{}: {}", self.path.display(), e)))?;
		serde_json::from_str(&raw).map_err(|e| FeedError::Parse(e.to_string()))
	}
}

#[async_trait]
impl FeedInterface for FixtureFeed {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FixtureFeedSchema)
	}

	async fn start(
		&self,
		sender: mpsc::UnboundedSender<StoreSnapshot>,
	) -> Result<(), FeedError> {
		let snapshot = self.load().await?;
		tracing::info!(
			path = %self.path.display(),
			order_count = snapshot.orders.len(),
			"loaded fixture snapshot"
		);
		sender
			.send(snapshot)
			.map_err(|_| FeedError::Source("snapshot channel closed".to_string()))
	}

	async fn stop(&self) -> Result<(), FeedError> {
		Ok(())
	}
}

/// Configuration schema for FixtureFeed.
pub struct FixtureFeedSchema;

impl ConfigSchema for FixtureFeedSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![Field::new("path", FieldType::String)], vec![]);
		schema.validate(config)
	}
}

/// Factory function to create a fixture feed from configuration.
///
/// Configuration parameters:
/// - `path`: JSON snapshot file to load (required)
pub fn create_feed(config: &toml::Value) -> Result<Box<dyn FeedInterface>, FeedError> {
	FixtureFeedSchema
		.validate(config)
		.map_err(|e| FeedError::Configuration(e.to_string()))?;
	let path = config
		.get("path")
		.and_then(|v| v.as_str())
		.ok_or_else(|| FeedError::Configuration("path is required".to_string()))?;
	Ok(Box::new(FixtureFeed::new(path)))
}

/// Registry for the fixture feed implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "fixture";
	type Factory = FeedFactory;

	fn factory() -> Self::Factory {
		create_feed
	}
}

impl FeedRegistry for Registry {}
