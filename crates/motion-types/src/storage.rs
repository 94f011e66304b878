//! Storage-related types for the motion system.

/// Storage namespaces for different record collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Motion records, keyed by motion id
	Motions,
	/// Poll records, keyed by poll id
	Polls,
	/// Agenda items, keyed by item id
	AgendaItems,
	/// Singleton indexes (motion list, number assignments)
	Registry,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Motions => "motions",
			StorageKey::Polls => "polls",
			StorageKey::AgendaItems => "agenda_items",
			StorageKey::Registry => "registry",
		}
	}
}
