//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every pluggable backend (storage, auth, carrier) ships a `Registry` type
/// implementing this trait so the service can map the name used in the
/// configuration file to the backend's factory function.
pub trait ImplementationRegistry {
	/// The name used in configuration files, e.g. `memory` for
	/// `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
