//! Workflow actions.
//!
//! The allowed-action list computed for a user drives every permission check
//! in the workflow, including status changes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MotionStatus;

/// An action a user may be offered on a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionAction {
	Withdraw,
	Support,
	Unsupport,
	Edit,
	Delete,
	NotPermit,
	Permit,
	SetNumber,
	Accept,
	Reject,
	Adjourn,
	NotConcerned,
	CommitBill,
	GeneratePoll,
	/// Permit the newest pending version.
	PermitVersion,
	/// Decline the newest pending version.
	RejectVersion,
	/// Create an agenda item for the motion.
	CreateItem,
}

impl MotionAction {
	/// Returns the status this action moves a motion into, if it is a status change.
	pub fn target_status(&self) -> Option<MotionStatus> {
		match self {
			MotionAction::Withdraw => Some(MotionStatus::Withdrawn),
			MotionAction::NotPermit => Some(MotionStatus::NotPermitted),
			MotionAction::Permit => Some(MotionStatus::Permitted),
			MotionAction::Accept => Some(MotionStatus::Accepted),
			MotionAction::Reject => Some(MotionStatus::Rejected),
			MotionAction::Adjourn => Some(MotionStatus::Adjourned),
			MotionAction::NotConcerned => Some(MotionStatus::NotConcerned),
			MotionAction::CommitBill => Some(MotionStatus::CommittedBill),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			MotionAction::Withdraw => "withdraw",
			MotionAction::Support => "support",
			MotionAction::Unsupport => "unsupport",
			MotionAction::Edit => "edit",
			MotionAction::Delete => "delete",
			MotionAction::NotPermit => "not_permit",
			MotionAction::Permit => "permit",
			MotionAction::SetNumber => "set_number",
			MotionAction::Accept => "accept",
			MotionAction::Reject => "reject",
			MotionAction::Adjourn => "adjourn",
			MotionAction::NotConcerned => "not_concerned",
			MotionAction::CommitBill => "commit_bill",
			MotionAction::GeneratePoll => "generate_poll",
			MotionAction::PermitVersion => "permit_version",
			MotionAction::RejectVersion => "reject_version",
			MotionAction::CreateItem => "create_item",
		}
	}
}

impl fmt::Display for MotionAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
