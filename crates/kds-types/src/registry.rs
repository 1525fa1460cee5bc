//! Registry trait for self-registering implementations.
//!
//! Pluggable backends (persistence, feed) register themselves with the name
//! used to select them in configuration and a factory function that builds
//! them from their configuration table.

/// Base trait for implementation registries.
///
/// Each backend module provides a `Registry` struct implementing this trait,
/// so the service binary can assemble a name-to-factory map without knowing
/// the individual backends.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// Matches the key under the owning section, for example:
	/// - "memory" for persistence.primary = "memory"
	/// - "journal" for persistence.primary = "journal"
	/// - "fixture" for feed.implementations.fixture
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	///
	/// Each boundary defines its own alias (`PersistenceFactory`,
	/// `FeedFactory`).
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
