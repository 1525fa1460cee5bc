//! In-process channel feed.
//!
//! Lets embedding code push [`StoreSnapshot`]s directly instead of polling an
//! external source. The feed half implements [`FeedInterface`] so it plugs
//! into [`FeedService`](crate::FeedService) like any other source; the handle
//! half stays with the caller and forwards snapshots while the feed runs.

use crate::{FeedError, FeedInterface};
use async_trait::async_trait;
use kds_types::{ConfigSchema, Schema, StoreSnapshot, ValidationError};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

type SenderSlot = Arc<Mutex<Option<mpsc::UnboundedSender<StoreSnapshot>>>>;

/// Feed fed by an in-process [`ChannelFeedHandle`].
pub struct ChannelFeed {
	slot: SenderSlot,
}

/// Push half of a [`ChannelFeed`].
///
/// Cheap to clone; every clone forwards into the same feed.
#[derive(Clone)]
pub struct ChannelFeedHandle {
	slot: SenderSlot,
}

impl ChannelFeed {
	/// Creates a channel feed and the handle used to push snapshots into it.
	pub fn new() -> (Self, ChannelFeedHandle) {
		let slot: SenderSlot = Arc::new(Mutex::new(None));
		(
			Self { slot: slot.clone() },
			ChannelFeedHandle { slot },
		)
	}
}

impl ChannelFeedHandle {
	/// Forwards a snapshot to the feed.
	///
	/// Fails if the feed has not been started or has been stopped.
	pub fn push(&self, snapshot: StoreSnapshot) -> Result<(), FeedError> {
		let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
		match slot.as_ref() {
			Some(sender) => sender
				.send(snapshot)
				.map_err(|_| FeedError::Source("snapshot channel closed".to_string())),
			None => Err(FeedError::Source("channel feed is not running".to_string())),
		}
	}
}

#[async_trait]
impl FeedInterface for ChannelFeed {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(ChannelFeedSchema)
	}

	async fn start(
		&self,
		sender: mpsc::UnboundedSender<StoreSnapshot>,
	) -> Result<(), FeedError> {
		let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
		if slot.is_some() {
			return Err(FeedError::AlreadyRunning);
		}
		*slot = Some(sender);
		Ok(())
	}

	async fn stop(&self) -> Result<(), FeedError> {
		let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
		*slot = None;
		Ok(())
	}
}

/// Configuration schema for ChannelFeed. The feed takes no configuration.
pub struct ChannelFeedSchema;

impl ConfigSchema for ChannelFeedSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}
