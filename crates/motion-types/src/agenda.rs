//! Agenda item records.

use serde::{Deserialize, Serialize};

/// An agenda item created for a numbered motion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaItem {
	pub id: String,
	pub motion_id: String,
	pub title: String,
	pub created_at: u64,
}
