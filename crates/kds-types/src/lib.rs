//! Common types module for the KDS routing core.
//!
//! This module defines the core data types and structures shared across the
//! routing, stacking, store and engine crates. It provides a centralized
//! location for shared types to ensure consistency across all components.

/// Event types for in-process notification.
pub mod events;
/// Snapshot types pushed by the external refresh mechanism.
pub mod feed;
/// Order item types and the per-item status lifecycle.
pub mod item;
/// Order types and the derived order status.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Transition types produced by the routing engine.
pub mod transition;
/// String formatting utilities.
pub mod utils;
/// Configuration validation for pluggable backends.
pub mod validation;
/// Workstation and workstation-sequence types.
pub mod workstation;

// Re-export all types for convenient access
pub use events::*;
pub use feed::*;
pub use item::*;
pub use order::*;
pub use registry::*;
pub use transition::*;
pub use utils::short_id;
pub use validation::*;
pub use workstation::*;
