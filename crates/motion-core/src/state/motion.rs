//! Motion state machine implementation.
//!
//! Motions move Published -> Permitted -> {Accepted, Rejected, Adjourned,
//! NotConcerned, CommittedBill}; a published motion may instead be refused
//! (NotPermitted), and published or permitted motions may be withdrawn.
//! Every other status is terminal until a manager resets the motion.

use motion_types::{Motion, MotionAction, MotionStatus, User};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised when a status change is refused.
#[derive(Debug, Error, PartialEq)]
pub enum StateError {
	#[error("The motion status is already {0}")]
	AlreadyInStatus(MotionStatus),
	#[error("The motion status is {from}. You can not set the status to {to}")]
	TransitionNotAllowed { from: MotionStatus, to: MotionStatus },
}

/// Static transition table. Order matters: it is the order in which status
/// actions are offered.
static TRANSITIONS: Lazy<HashMap<MotionStatus, Vec<MotionStatus>>> = Lazy::new(|| {
	use MotionStatus::*;

	let mut m = HashMap::new();
	m.insert(Published, vec![NotPermitted, Permitted, Withdrawn]);
	m.insert(
		Permitted,
		vec![
			Accepted,
			Rejected,
			Adjourned,
			NotConcerned,
			CommittedBill,
			Withdrawn,
		],
	);
	m
});

/// Computes allowed actions and validates status changes.
pub struct MotionStateMachine;

impl MotionStateMachine {
	/// Statuses reachable from `from` by a regular status action.
	pub fn transitions(from: MotionStatus) -> &'static [MotionStatus] {
		TRANSITIONS.get(&from).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn is_valid_transition(from: MotionStatus, to: MotionStatus) -> bool {
		Self::transitions(from).contains(&to)
	}

	/// Returns the actions `user` may take on `motion`, in display order.
	pub fn allowed_actions(motion: &Motion, user: &User) -> Vec<MotionAction> {
		let mut actions = Vec::new();
		let status = motion.status;
		let is_submitter = user.username == motion.submitter;
		let is_manager = user.is_manager();
		let is_owner = is_submitter || is_manager;
		let targets = Self::transitions(status);

		// Published motions need a number before they can be withdrawn
		if targets.contains(&MotionStatus::Withdrawn)
			&& is_owner
			&& (status == MotionStatus::Permitted || motion.number.is_some())
		{
			actions.push(MotionAction::Withdraw);
		}

		if status == MotionStatus::Published {
			let is_supporter = motion.is_supporter(&user.username);
			if !is_submitter && !is_supporter {
				actions.push(MotionAction::Support);
			}
			if is_supporter {
				actions.push(MotionAction::Unsupport);
			}
		}

		if is_owner {
			actions.push(MotionAction::Edit);
		}

		if is_owner && motion.number.is_none() && status == MotionStatus::Published {
			actions.push(MotionAction::Delete);
		}

		if !is_manager {
			return actions;
		}

		actions.extend(
			targets
				.iter()
				.filter(|target| **target != MotionStatus::Withdrawn)
				.filter_map(|target| target.action()),
		);

		match status {
			MotionStatus::Published if motion.number.is_none() => {
				actions.push(MotionAction::SetNumber);
			},
			MotionStatus::Permitted => {
				actions.push(MotionAction::GeneratePoll);
				if motion.unpermitted_changes() {
					actions.push(MotionAction::PermitVersion);
					actions.push(MotionAction::RejectVersion);
				}
			},
			_ => {},
		}

		if motion.number.is_some() && motion.agenda_item.is_none() {
			actions.push(MotionAction::CreateItem);
		}

		actions
	}

	pub fn is_allowed(motion: &Motion, user: &User, action: MotionAction) -> bool {
		Self::allowed_actions(motion, user).contains(&action)
	}

	/// Checks whether `user` may move `motion` into `target`.
	///
	/// The target must be reachable through the transition table and its
	/// action allowed for the user. `force` skips both checks but never
	/// allows setting the current status again.
	pub fn check_status_change(
		motion: &Motion,
		user: &User,
		target: MotionStatus,
		force: bool,
	) -> Result<(), StateError> {
		if motion.status == target {
			return Err(StateError::AlreadyInStatus(target));
		}
		if force {
			return Ok(());
		}

		let allowed = Self::is_valid_transition(motion.status, target)
			&& target
				.action()
				.is_some_and(|action| Self::is_allowed(motion, user, action));
		if !allowed {
			return Err(StateError::TransitionNotAllowed {
				from: motion.status,
				to: target,
			});
		}
		Ok(())
	}
}
