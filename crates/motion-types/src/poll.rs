//! Poll records.

use serde::{Deserialize, Serialize};

/// A poll generated for a permitted motion.
///
/// Votes are recorded elsewhere; the poll only fixes which options exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
	pub id: String,
	pub motion_id: String,
	/// Options are decided with yes/no/abstain.
	pub option_decision: bool,
	pub options: Vec<PollOption>,
	pub created_at: u64,
}

/// One option of a poll, pointing at the motion it decides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
	pub motion_id: String,
	pub label: String,
}
