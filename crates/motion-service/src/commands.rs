//! Command dispatch for the `motions` CLI.
//!
//! Each command maps onto one workflow operation. Records are printed as
//! pretty JSON, logs and action lists as plain text.

use clap::Subcommand;
use motion_core::{MotionError, MotionService};
use motion_types::{Motion, MotionAction, MotionDraft, MotionStatus, Permission, User};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
	#[error(transparent)]
	Motion(#[from] MotionError),
	#[error("Failed to render output: {0}")]
	Render(#[from] serde_json::Error),
	#[error("User {0} may not see motions")]
	CannotSee(String),
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Submit a new motion
	Submit {
		#[arg(long)]
		title: String,
		#[arg(long)]
		text: String,
		#[arg(long)]
		reason: Option<String>,
	},
	/// Edit the content of a motion
	Edit {
		id: String,
		#[arg(long)]
		title: String,
		#[arg(long)]
		text: String,
		#[arg(long)]
		reason: Option<String>,
	},
	/// Show a motion with its notes and the actions open to the user
	Show { id: String },
	/// List all motions
	List,
	/// List the actions open to the user
	Actions { id: String },
	Support { id: String },
	Unsupport { id: String },
	/// Assign a number, the next free one if none is given
	Number {
		id: String,
		#[arg(long)]
		number: Option<u32>,
	},
	Permit { id: String },
	NotPermit { id: String },
	/// Change the status by its code (pub, per, acc, rej, wit, adj, noc, com, nop)
	Status {
		id: String,
		status: MotionStatus,
		#[arg(long)]
		force: bool,
	},
	Reset { id: String },
	AcceptVersion { id: String, version: u32 },
	RejectVersion { id: String, version: u32 },
	Delete {
		id: String,
		#[arg(long)]
		force: bool,
	},
	/// Generate a decision poll
	Poll { id: String },
	/// Create an agenda item
	AgendaItem { id: String },
	/// Print the audit log
	Log { id: String },
}

#[derive(Serialize)]
struct MotionView<'a> {
	#[serde(flatten)]
	motion: &'a Motion,
	title: String,
	notes: Vec<&'static str>,
	actions: Vec<MotionAction>,
}

#[derive(Serialize)]
struct Summary {
	id: String,
	number: Option<u32>,
	status: MotionStatus,
	title: String,
	submitter: String,
	supporters: usize,
}

fn draft(title: String, text: String, reason: Option<String>) -> MotionDraft {
	MotionDraft {
		title,
		text,
		reason,
	}
}

fn require_see(user: &User) -> Result<(), CommandError> {
	if user.has_perm(Permission::CanSee) || user.is_manager() {
		Ok(())
	} else {
		Err(CommandError::CannotSee(user.username.clone()))
	}
}

fn render_actions(actions: &[MotionAction]) -> String {
	actions
		.iter()
		.map(MotionAction::as_str)
		.collect::<Vec<_>>()
		.join("\n")
}

/// Runs one command and returns what should be printed.
pub async fn run(
	command: Command,
	service: &MotionService,
	user: &User,
) -> Result<String, CommandError> {
	let output = match command {
		Command::Submit {
			title,
			text,
			reason,
		} => {
			let motion = service.submit(user, draft(title, text, reason)).await?;
			motion.id
		},
		Command::Edit {
			id,
			title,
			text,
			reason,
		} => {
			let motion = service.edit(&id, user, draft(title, text, reason)).await?;
			format!("Version {}", motion.versions.len())
		},
		Command::Show { id } => {
			require_see(user)?;
			let motion = service.get(&id).await?;
			let view = MotionView {
				title: motion.to_string(),
				notes: motion.notes(service.min_supporters()),
				actions: service.allowed_actions(&id, user).await?,
				motion: &motion,
			};
			serde_json::to_string_pretty(&view)?
		},
		Command::List => {
			require_see(user)?;
			let summaries: Vec<Summary> = service
				.list()
				.await?
				.into_iter()
				.map(|m| Summary {
					title: m.to_string(),
					supporters: m.supporters.len(),
					id: m.id,
					number: m.number,
					status: m.status,
					submitter: m.submitter,
				})
				.collect();
			serde_json::to_string_pretty(&summaries)?
		},
		Command::Actions { id } => {
			require_see(user)?;
			render_actions(&service.allowed_actions(&id, user).await?)
		},
		Command::Support { id } => {
			let motion = service.support(&id, user).await?;
			format!("{} supporters", motion.supporters.len())
		},
		Command::Unsupport { id } => {
			let motion = service.unsupport(&id, user).await?;
			format!("{} supporters", motion.supporters.len())
		},
		Command::Number { id, number } => {
			let number = service.set_number(&id, user, number).await?;
			format!("Number {}", number)
		},
		Command::Permit { id } => {
			let version = service.permit(&id, user).await?;
			format!("Version {} permitted", version)
		},
		Command::NotPermit { id } => {
			let motion = service.not_permit(&id, user).await?;
			motion.status.to_string()
		},
		Command::Status { id, status, force } => {
			let motion = service.set_status(&id, user, status, force).await?;
			motion.status.to_string()
		},
		Command::Reset { id } => {
			let motion = service.reset(&id, user).await?;
			motion.status.to_string()
		},
		Command::AcceptVersion { id, version } => {
			let changed = service.accept_version(&id, user, version).await?;
			if changed {
				format!("Version {} permitted", version)
			} else {
				"Unchanged".to_string()
			}
		},
		Command::RejectVersion { id, version } => {
			let changed = service.reject_version(&id, user, version).await?;
			if changed {
				format!("Version {} rejected", version)
			} else {
				"Unchanged".to_string()
			}
		},
		Command::Delete { id, force } => {
			service.delete(&id, user, force).await?;
			"Deleted".to_string()
		},
		Command::Poll { id } => serde_json::to_string_pretty(&service.generate_poll(&id, user).await?)?,
		Command::AgendaItem { id } => {
			serde_json::to_string_pretty(&service.create_agenda_item(&id, user).await?)?
		},
		Command::Log { id } => {
			require_see(user)?;
			service.get(&id).await?.render_log()
		},
	};
	Ok(output)
}
