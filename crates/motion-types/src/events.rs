//! Event types published by the workflow service.
//!
//! Every state change of a motion produces one event on the event bus so
//! that other components can react without polling storage.

use serde::{Deserialize, Serialize};

use crate::MotionStatus;

/// Events describing changes to motions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionEvent {
	/// A new motion was submitted.
	Submitted { motion_id: String, submitter: String },
	/// Edited content produced a new version.
	VersionCreated { motion_id: String, version: u32 },
	/// Supporters were dropped after a content change.
	SupportersCleared { motion_id: String, removed: usize },
	SupportAdded { motion_id: String, user: String },
	SupportRemoved { motion_id: String, user: String },
	NumberAssigned { motion_id: String, number: u32 },
	StatusChanged {
		motion_id: String,
		from: MotionStatus,
		to: MotionStatus,
	},
	VersionPermitted { motion_id: String, version: u32 },
	VersionRejected { motion_id: String, version: u32 },
	/// The motion was reset to published.
	Reset { motion_id: String },
	PollCreated { motion_id: String, poll_id: String },
	AgendaItemCreated { motion_id: String, item_id: String },
	Deleted { motion_id: String },
}

impl MotionEvent {
	/// Returns the id of the motion this event concerns.
	pub fn motion_id(&self) -> &str {
		match self {
			MotionEvent::Submitted { motion_id, .. }
			| MotionEvent::VersionCreated { motion_id, .. }
			| MotionEvent::SupportersCleared { motion_id, .. }
			| MotionEvent::SupportAdded { motion_id, .. }
			| MotionEvent::SupportRemoved { motion_id, .. }
			| MotionEvent::NumberAssigned { motion_id, .. }
			| MotionEvent::StatusChanged { motion_id, .. }
			| MotionEvent::VersionPermitted { motion_id, .. }
			| MotionEvent::VersionRejected { motion_id, .. }
			| MotionEvent::Reset { motion_id }
			| MotionEvent::PollCreated { motion_id, .. }
			| MotionEvent::AgendaItemCreated { motion_id, .. }
			| MotionEvent::Deleted { motion_id } => motion_id,
		}
	}
}
