//! Snapshot feed module for the KDS routing core.
//!
//! This module handles the refresh side of the board: external sources push
//! whole-store snapshots that replace the local state wholesale. It provides
//! abstractions for different feed mechanisms such as fixture files for
//! demos and tests, or a programmatic channel driven by the embedding
//! application.

use async_trait::async_trait;
use kds_types::{ConfigSchema, ImplementationRegistry, StoreSnapshot};
use thiserror::Error;
use tokio::sync::mpsc;

/// Re-export implementations
pub mod implementations {
	pub mod channel;
	pub mod fixture;
}

/// Errors that can occur during feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
	/// Error that occurs when reading from the snapshot source fails.
	#[error("Source error: {0}")]
	Source(String),
	/// Error that occurs when starting an already running feed.
	#[error("Already running")]
	AlreadyRunning,
	/// Error that occurs when decoding snapshot data fails.
	#[error("Parse error: {0}")]
	Parse(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for snapshot feed implementations.
///
/// Implementations deliver [`StoreSnapshot`]s through the provided channel.
/// How a snapshot is produced is opaque to the core; the engine simply
/// replaces its store with whatever arrives.
#[async_trait]
pub trait FeedInterface: Send + Sync {
	/// Returns the configuration schema for this feed implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Starts delivering snapshots through the provided channel.
	async fn start(
		&self,
		sender: mpsc::UnboundedSender<StoreSnapshot>,
	) -> Result<(), FeedError>;

	/// Stops delivering snapshots and releases associated resources.
	async fn stop(&self) -> Result<(), FeedError>;
}

/// Type alias for feed factory functions.
pub type FeedFactory = fn(&toml::Value) -> Result<Box<dyn FeedInterface>, FeedError>;

/// Registry trait for feed implementations.
pub trait FeedRegistry: ImplementationRegistry<Factory = FeedFactory> {}

/// Get all registered config-constructible feed implementations.
///
/// The channel feed is absent on purpose: it only makes sense when the
/// embedding code keeps its push handle, so it is wired programmatically
/// rather than from configuration.
pub fn get_all_implementations() -> Vec<(&'static str, FeedFactory)> {
	use implementations::fixture;

	vec![(fixture::Registry::NAME, fixture::Registry::factory())]
}

/// Service that manages multiple snapshot feed implementations.
pub struct FeedService {
	/// Collection of feed sources to run.
	sources: Vec<Box<dyn FeedInterface>>,
}

impl FeedService {
	/// Creates a new FeedService with the specified sources.
	pub fn new(sources: Vec<Box<dyn FeedInterface>>) -> Self {
		Self { sources }
	}

	/// Starts every configured source.
	///
	/// All snapshots from any source arrive through the same channel. If a
	/// source fails to start the whole operation fails.
	pub async fn start_all(
		&self,
		sender: mpsc::UnboundedSender<StoreSnapshot>,
	) -> Result<(), FeedError> {
		for source in &self.sources {
			source.start(sender.clone()).await?;
		}
		Ok(())
	}

	/// Stops every source, returning the first error encountered.
	pub async fn stop_all(&self) -> Result<(), FeedError> {
		let mut first_error = None;
		for source in &self.sources {
			if let Err(e) = source.stop().await {
				first_error.get_or_insert(e);
			}
		}
		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}
