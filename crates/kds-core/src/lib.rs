//! Core engine for the kitchen display system.
//!
//! Ties the other crates together: the order store, the routing rules, the
//! persistence backend and the feed sources, behind a command surface for
//! mutations and a read surface for display. Commands apply optimistically
//! and are reconciled with the backend afterwards; feed snapshots replace
//! the store wholesale and win over any rollback still in flight.

pub mod controller;
pub mod engine;
pub mod event_bus;
pub mod queries;
pub mod stations;

pub use controller::{CommandError, MutationController};
pub use engine::{EngineError, KdsBuilder, KdsEngine, KdsFactories};
pub use event_bus::EventBus;
pub use queries::BoardView;
pub use stations::StationRegistry;
