//! Common types module for the motion workflow system.
//!
//! This module defines the records, statuses, and actions shared by every
//! crate in the workspace, so that storage, configuration, and the workflow
//! engine all agree on one vocabulary.

/// Workflow actions a user may perform on a motion.
pub mod action;
/// Agenda item records linked to numbered motions.
pub mod agenda;
/// Event types published by the workflow service.
pub mod events;
/// Motion records, versions, statuses, and the audit log.
pub mod motion;
/// Poll records generated for permitted motions.
pub mod poll;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Storage namespaces.
pub mod storage;
/// Users and their permissions.
pub mod user;
/// Configuration validation types for backend tables.
pub mod validation;

pub use action::*;
pub use agenda::*;
pub use events::*;
pub use motion::*;
pub use poll::*;
pub use registry::*;
pub use storage::*;
pub use user::*;
pub use validation::*;

/// Returns the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}

/// Shortens an identifier for log output.
///
/// Shows only the first 8 characters followed by ".." for longer ids.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}
