//! Motion records for the workflow system.
//!
//! A motion keeps its full version history inline. The content accessors
//! (`title`, `text`, `reason`, `time`) always read from the newest version,
//! and the permitted version is tracked by its per-motion version number.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::MotionAction;

/// Format used when rendering audit log timestamps.
pub const LOG_TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Error returned when a status code cannot be parsed.
#[derive(Debug, Error, PartialEq)]
#[error("{0} is not a valid status")]
pub struct UnknownStatus(pub String);

/// Status of a motion in the assembly workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MotionStatus {
	/// Submitted and open for supporters.
	#[default]
	#[serde(rename = "pub")]
	Published,
	/// Admitted for debate.
	#[serde(rename = "per")]
	Permitted,
	#[serde(rename = "acc")]
	Accepted,
	#[serde(rename = "rej")]
	Rejected,
	#[serde(rename = "wit")]
	Withdrawn,
	#[serde(rename = "adj")]
	Adjourned,
	#[serde(rename = "noc")]
	NotConcerned,
	/// Referred to committee as a bill.
	#[serde(rename = "com")]
	CommittedBill,
	/// Refused admission for debate.
	#[serde(rename = "nop")]
	NotPermitted,
}

impl MotionStatus {
	/// Returns the three-letter storage code.
	pub fn code(&self) -> &'static str {
		match self {
			MotionStatus::Published => "pub",
			MotionStatus::Permitted => "per",
			MotionStatus::Accepted => "acc",
			MotionStatus::Rejected => "rej",
			MotionStatus::Withdrawn => "wit",
			MotionStatus::Adjourned => "adj",
			MotionStatus::NotConcerned => "noc",
			MotionStatus::CommittedBill => "com",
			MotionStatus::NotPermitted => "nop",
		}
	}

	/// Returns the human-readable label.
	pub fn label(&self) -> &'static str {
		match self {
			MotionStatus::Published => "Published",
			MotionStatus::Permitted => "Permitted",
			MotionStatus::Accepted => "Accepted",
			MotionStatus::Rejected => "Rejected",
			MotionStatus::Withdrawn => "Withdrawn",
			MotionStatus::Adjourned => "Adjourned",
			MotionStatus::NotConcerned => "Not Concerned",
			MotionStatus::CommittedBill => "Committed a bill",
			MotionStatus::NotPermitted => "Rejected (not permitted)",
		}
	}

	/// Returns the action that moves a motion into this status.
	///
	/// `Published` has no action; only a reset or a forced change reach it.
	pub fn action(&self) -> Option<MotionAction> {
		match self {
			MotionStatus::Published => None,
			MotionStatus::Permitted => Some(MotionAction::Permit),
			MotionStatus::Accepted => Some(MotionAction::Accept),
			MotionStatus::Rejected => Some(MotionAction::Reject),
			MotionStatus::Withdrawn => Some(MotionAction::Withdraw),
			MotionStatus::Adjourned => Some(MotionAction::Adjourn),
			MotionStatus::NotConcerned => Some(MotionAction::NotConcerned),
			MotionStatus::CommittedBill => Some(MotionAction::CommitBill),
			MotionStatus::NotPermitted => Some(MotionAction::NotPermit),
		}
	}

	/// Returns an iterator over all statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Published,
			Self::Permitted,
			Self::Accepted,
			Self::Rejected,
			Self::Withdrawn,
			Self::Adjourned,
			Self::NotConcerned,
			Self::CommittedBill,
			Self::NotPermitted,
		]
		.into_iter()
	}
}

impl fmt::Display for MotionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

impl FromStr for MotionStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.code() == s)
			.ok_or_else(|| UnknownStatus(s.to_string()))
	}
}

/// One snapshot of a motion's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionVersion {
	/// 1-based position of this version within its motion.
	pub number: u32,
	pub title: String,
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	/// Set when a manager declined this change.
	#[serde(default)]
	pub rejected: bool,
	/// Unix timestamp of creation.
	pub created_at: u64,
}

impl MotionVersion {
	/// Returns true when the version carries the given content.
	pub fn matches(&self, draft: &MotionDraft) -> bool {
		self.title == draft.title && self.text == draft.text && self.reason == draft.reason
	}
}

/// Content submitted for a new motion or an edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionDraft {
	pub title: String,
	pub text: String,
	#[serde(default)]
	pub reason: Option<String>,
}

impl MotionDraft {
	pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			text: text.into(),
			reason: None,
		}
	}

	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());
		self
	}
}

/// A single line of a motion's audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
	/// Local wall-clock time of the entry.
	pub timestamp: NaiveDateTime,
	pub message: String,
	/// Username of the acting user, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<String>,
}

impl LogEntry {
	pub fn new(message: impl Into<String>, user: Option<&str>) -> Self {
		Self {
			timestamp: chrono::Local::now().naive_local(),
			message: message.into(),
			user: user.map(str::to_string),
		}
	}
}

impl fmt::Display for LogEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} | {}",
			self.timestamp.format(LOG_TIME_FORMAT),
			self.message
		)?;
		if let Some(user) = &self.user {
			write!(f, " (by {})", user)?;
		}
		Ok(())
	}
}

/// A motion submitted to the assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Motion {
	/// Unique identifier for this motion.
	pub id: String,
	/// Username of the submitter.
	pub submitter: String,
	/// Usernames of supporters, in the order they joined.
	#[serde(default)]
	pub supporters: Vec<String>,
	/// Public number, unique across all motions once assigned.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub number: Option<u32>,
	pub status: MotionStatus,
	/// Version number of the permitted version.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub permitted: Option<u32>,
	/// Full version history, oldest first.
	#[serde(default)]
	pub versions: Vec<MotionVersion>,
	/// Ids of polls generated for this motion.
	#[serde(default)]
	pub polls: Vec<String>,
	/// Linked agenda item, if one was created.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub agenda_item: Option<String>,
	/// Audit log, oldest first.
	#[serde(default)]
	pub log: Vec<LogEntry>,
	/// Timestamp when this motion was created.
	pub created_at: u64,
	/// Timestamp when this motion was last updated.
	pub updated_at: u64,
}

impl Motion {
	/// Creates an empty published motion without any version.
	pub fn new(id: impl Into<String>, submitter: impl Into<String>, now: u64) -> Self {
		Self {
			id: id.into(),
			submitter: submitter.into(),
			supporters: Vec::new(),
			number: None,
			status: MotionStatus::Published,
			permitted: None,
			versions: Vec::new(),
			polls: Vec::new(),
			agenda_item: None,
			log: Vec::new(),
			created_at: now,
			updated_at: now,
		}
	}

	pub fn last_version(&self) -> Option<&MotionVersion> {
		self.versions.last()
	}

	pub fn version(&self, number: u32) -> Option<&MotionVersion> {
		self.versions.iter().find(|v| v.number == number)
	}

	pub fn title(&self) -> Option<&str> {
		self.last_version().map(|v| v.title.as_str())
	}

	pub fn text(&self) -> Option<&str> {
		self.last_version().map(|v| v.text.as_str())
	}

	pub fn reason(&self) -> Option<&str> {
		self.last_version().and_then(|v| v.reason.as_deref())
	}

	/// Creation time of the newest version.
	pub fn time(&self) -> Option<u64> {
		self.last_version().map(|v| v.created_at)
	}

	/// Creation time of the first version.
	pub fn creation_time(&self) -> Option<u64> {
		self.versions.first().map(|v| v.created_at)
	}

	pub fn is_supporter(&self, username: &str) -> bool {
		self.supporters.iter().any(|s| s == username)
	}

	/// Returns true when the newest version is neither permitted nor rejected.
	pub fn unpermitted_changes(&self) -> bool {
		match self.last_version() {
			Some(last) => self.permitted != Some(last.number) && !last.rejected,
			None => false,
		}
	}

	pub fn enough_supporters(&self, min_supporters: u32) -> bool {
		self.supporters.len() >= min_supporters as usize
	}

	/// Returns short status notes shown alongside the motion.
	pub fn notes(&self, min_supporters: u32) -> Vec<&'static str> {
		let mut notes = Vec::new();
		let published = self.status == MotionStatus::Published;
		if published && !self.enough_supporters(min_supporters) {
			notes.push("Searching for supporters.");
		}
		if published && self.permitted.is_none() {
			notes.push("Not yet permitted.");
		} else if self.unpermitted_changes() && self.permitted.is_some() {
			notes.push("Not yet permitted changes.");
		}
		notes
	}

	/// Appends a new version built from the draft and returns its number.
	pub fn push_version(&mut self, draft: &MotionDraft, now: u64) -> u32 {
		let number = self.versions.len() as u32 + 1;
		self.versions.push(MotionVersion {
			number,
			title: draft.title.clone(),
			text: draft.text.clone(),
			reason: draft.reason.clone(),
			rejected: false,
			created_at: now,
		});
		number
	}

	pub fn write_log(&mut self, message: impl Into<String>, user: Option<&str>) {
		self.log.push(LogEntry::new(message, user));
	}

	/// Renders the audit log as newline-terminated text lines.
	pub fn render_log(&self) -> String {
		self.log.iter().map(|entry| format!("{}\n", entry)).collect()
	}
}

impl fmt::Display for Motion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.title() {
			Some(title) => f.write_str(title),
			None => f.write_str("no title yet"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;

	fn motion_with_versions(count: u32) -> Motion {
		let mut motion = Motion::new("m1", "alice", 100);
		for i in 1..=count {
			motion.push_version(&MotionDraft::new(format!("Title {}", i), "Body"), 100 + i as u64);
		}
		motion
	}

	#[test]
	fn test_status_codes_parse() {
		for status in MotionStatus::all() {
			assert_eq!(status.code().parse::<MotionStatus>().unwrap(), status);
		}
		assert_eq!(
			"xyz".parse::<MotionStatus>(),
			Err(UnknownStatus("xyz".to_string()))
		);
	}

	#[test]
	fn test_status_serializes_as_code() {
		let json = serde_json::to_string(&MotionStatus::NotPermitted).unwrap();
		assert_eq!(json, "\"nop\"");
		assert_eq!(MotionStatus::CommittedBill.to_string(), "Committed a bill");
	}

	#[test]
	fn test_content_reads_last_version() {
		let motion = motion_with_versions(3);
		assert_eq!(motion.title(), Some("Title 3"));
		assert_eq!(motion.time(), Some(103));
		assert_eq!(motion.creation_time(), Some(101));
		assert_eq!(motion.to_string(), "Title 3");
		assert_eq!(Motion::new("m2", "bob", 0).to_string(), "no title yet");
	}

	#[test]
	fn test_unpermitted_changes() {
		let mut motion = motion_with_versions(2);
		assert!(motion.unpermitted_changes());

		motion.permitted = Some(2);
		assert!(!motion.unpermitted_changes());

		motion.push_version(&MotionDraft::new("Title 3", "Body"), 200);
		assert!(motion.unpermitted_changes());

		motion.versions[2].rejected = true;
		assert!(!motion.unpermitted_changes());

		assert!(!Motion::new("m2", "bob", 0).unpermitted_changes());
	}

	#[test]
	fn test_notes() {
		let mut motion = motion_with_versions(1);
		assert_eq!(
			motion.notes(1),
			vec!["Searching for supporters.", "Not yet permitted."]
		);

		motion.supporters.push("bob".to_string());
		assert_eq!(motion.notes(1), vec!["Not yet permitted."]);

		motion.status = MotionStatus::Permitted;
		motion.permitted = Some(1);
		assert!(motion.notes(1).is_empty());

		motion.push_version(&MotionDraft::new("Changed", "Body"), 300);
		assert_eq!(motion.notes(1), vec!["Not yet permitted changes."]);
	}

	#[test]
	fn test_log_rendering() {
		let timestamp = NaiveDate::from_ymd_opt(2024, 3, 1)
			.unwrap()
			.and_hms_opt(9, 5, 7)
			.unwrap();
		let mut motion = Motion::new("m1", "alice", 0);
		motion.log.push(LogEntry {
			timestamp,
			message: "Version 1 created".to_string(),
			user: Some("alice".to_string()),
		});
		motion.log.push(LogEntry {
			timestamp,
			message: "Number set: 4".to_string(),
			user: None,
		});

		assert_eq!(
			motion.render_log(),
			"01.03.2024 09:05:07 | Version 1 created (by alice)\n\
			 01.03.2024 09:05:07 | Number set: 4\n"
		);
	}

	#[test]
	fn test_version_matches_draft() {
		let motion = motion_with_versions(1);
		let last = motion.last_version().unwrap();
		assert!(last.matches(&MotionDraft::new("Title 1", "Body")));
		assert!(!last.matches(&MotionDraft::new("Title 1", "Body").with_reason("why")));
	}
}
