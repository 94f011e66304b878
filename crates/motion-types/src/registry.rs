//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable backend provides a Registry struct implementing this trait,
/// declaring the name it is configured under and its factory function.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. "file" for `storage.implementations.file`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
