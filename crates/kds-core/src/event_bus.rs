//! Event bus for in-process notification of board changes.
//!
//! A thin wrapper around a tokio broadcast channel. Publishers never block
//! and never fail the operation that produced the event; an event with no
//! subscribers is simply dropped.

use kds_types::KdsEvent;
use tokio::sync::broadcast;

/// Broadcast bus carrying [`KdsEvent`]s to all subscribers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<KdsEvent>,
}

impl EventBus {
	/// Creates a bus with the given channel capacity.
	///
	/// Slow subscribers that fall more than `capacity` events behind start
	/// seeing lag errors from their receiver; publishers are unaffected.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to all events published after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<KdsEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns the subscriber count, or an error when there are none.
	/// Callers treat that error as ignorable.
	pub fn publish(
		&self,
		event: KdsEvent,
	) -> Result<usize, Box<broadcast::error::SendError<KdsEvent>>> {
		self.sender.send(event).map_err(Box::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kds_types::{OrderEvent, SyncEvent};

	#[tokio::test]
	async fn subscribers_receive_published_events() {
		let bus = EventBus::new(16);
		let mut rx = bus.subscribe();

		bus.publish(KdsEvent::Order(OrderEvent::Completed { order_id: 7 }))
			.unwrap();

		match rx.recv().await.unwrap() {
			KdsEvent::Order(OrderEvent::Completed { order_id }) => assert_eq!(order_id, 7),
			other => panic!("unexpected event: {:?}", other),
		}
	}

	#[tokio::test]
	async fn publishing_without_subscribers_is_an_ignorable_error() {
		let bus = EventBus::new(16);
		let result = bus.publish(KdsEvent::Sync(SyncEvent::StationsRefreshed {
			station_count: 3,
		}));
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn clones_share_the_channel() {
		let bus = EventBus::new(16);
		let mut rx = bus.subscribe();
		let publisher = bus.clone();

		publisher
			.publish(KdsEvent::Order(OrderEvent::PinToggled {
				order_id: 1,
				is_pinned: true,
			}))
			.unwrap();
		assert!(rx.recv().await.is_ok());
	}
}
