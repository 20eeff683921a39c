//! Registry trait for self-registering implementations.
//!
//! Backend modules implement this trait so the service binary can build its
//! factory map from configuration names alone.

/// Base trait for implementation registries.
///
/// Each pluggable backend provides a Registry struct implementing this trait,
/// pairing the name used under `[storage.implementations]` with the factory
/// that builds it.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "memory" for `storage.implementations.memory`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
