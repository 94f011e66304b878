//! Workflow operations on motions.
//!
//! Every mutating operation follows the same shape: take the write lock,
//! load the motion, check the user's allowed actions, apply the change while
//! appending audit log entries, persist, and only then publish events.

use crate::event_bus::EventBus;
use crate::index::MotionIndex;
use crate::state::{MotionStateMachine, StateError};
use motion_storage::{StorageError, StorageService};
use motion_types::{
	current_timestamp, truncate_id, AgendaItem, Motion, MotionAction, MotionDraft, MotionEvent,
	MotionStatus, Permission, Poll, PollOption, StorageKey, User,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

/// Errors returned by workflow operations.
#[derive(Debug, Error)]
pub enum MotionError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Motion not found: {0}")]
	NotFound(String),
	#[error("User {user} may not {action}")]
	PermissionDenied { user: String, action: String },
	#[error(transparent)]
	State(#[from] StateError),
	#[error("Action {action} is not possible while the motion is {status}")]
	ActionNotAllowed {
		action: MotionAction,
		status: MotionStatus,
	},
	#[error("Supporter can not be the submitter of a motion")]
	SubmitterCannotSupport,
	#[error("This motion is already permitted")]
	AlreadyPermitted,
	#[error("This motion has already the number {0}")]
	AlreadyNumbered(u32),
	#[error("Number {0} is already assigned to another motion")]
	NumberTaken(u32),
	#[error("Motion numbers start at 1")]
	InvalidNumber,
	#[error("No free motion number left")]
	NumbersExhausted,
	#[error("Invalid content: {0}")]
	InvalidContent(String),
	#[error("Version {0} not found")]
	VersionNotFound(u32),
	#[error("The motion has no version yet")]
	NoVersion,
}

impl From<StorageError> for MotionError {
	fn from(err: StorageError) -> Self {
		MotionError::Storage(err.to_string())
	}
}

fn denied(user: &User, action: MotionAction) -> MotionError {
	MotionError::PermissionDenied {
		user: user.username.clone(),
		action: action.to_string(),
	}
}

/// Workflow service coordinating motions, storage, and events.
pub struct MotionService {
	storage: Arc<StorageService>,
	event_bus: EventBus,
	min_supporters: u32,
	/// Serialises mutations so number assignment stays unique.
	write_lock: Mutex<()>,
}

impl MotionService {
	pub fn new(storage: Arc<StorageService>, event_bus: EventBus, min_supporters: u32) -> Self {
		Self {
			storage,
			event_bus,
			min_supporters,
			write_lock: Mutex::new(()),
		}
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn min_supporters(&self) -> u32 {
		self.min_supporters
	}

	/// Loads a motion by id.
	pub async fn get(&self, motion_id: &str) -> Result<Motion, MotionError> {
		self.storage
			.retrieve_optional(StorageKey::Motions.as_str(), motion_id)
			.await?
			.ok_or_else(|| MotionError::NotFound(motion_id.to_string()))
	}

	/// Lists all motions: numbered ones by number, then the rest by creation.
	pub async fn list(&self) -> Result<Vec<Motion>, MotionError> {
		let index = MotionIndex::load(&self.storage).await?;
		let mut motions = Vec::with_capacity(index.motions.len());
		for motion_id in &index.motions {
			match self.get(motion_id).await {
				Ok(motion) => motions.push(motion),
				Err(MotionError::NotFound(_)) => {
					tracing::warn!(motion_id = %truncate_id(motion_id), "Indexed motion is missing");
				},
				Err(e) => return Err(e),
			}
		}
		motions.sort_by_key(|m| (m.number.is_none(), m.number, m.created_at));
		Ok(motions)
	}

	pub async fn allowed_actions(
		&self,
		motion_id: &str,
		user: &User,
	) -> Result<Vec<MotionAction>, MotionError> {
		let motion = self.get(motion_id).await?;
		Ok(MotionStateMachine::allowed_actions(&motion, user))
	}

	pub async fn notes(&self, motion_id: &str) -> Result<Vec<&'static str>, MotionError> {
		let motion = self.get(motion_id).await?;
		Ok(motion.notes(self.min_supporters))
	}

	pub async fn enough_supporters(&self, motion_id: &str) -> Result<bool, MotionError> {
		let motion = self.get(motion_id).await?;
		Ok(motion.enough_supporters(self.min_supporters))
	}

	/// Loads the polls generated for a motion.
	pub async fn polls(&self, motion_id: &str) -> Result<Vec<Poll>, MotionError> {
		let motion = self.get(motion_id).await?;
		let mut polls = Vec::with_capacity(motion.polls.len());
		for poll_id in &motion.polls {
			polls.push(
				self.storage
					.retrieve(StorageKey::Polls.as_str(), poll_id)
					.await?,
			);
		}
		Ok(polls)
	}

	/// Submits a new motion with its first version.
	#[instrument(skip_all, fields(user = %user.username))]
	pub async fn submit(&self, user: &User, draft: MotionDraft) -> Result<Motion, MotionError> {
		if !user.has_perm(Permission::CanInsert) {
			return Err(MotionError::PermissionDenied {
				user: user.username.clone(),
				action: "submit".to_string(),
			});
		}
		validate_draft(&draft)?;

		let _guard = self.write_lock.lock().await;
		let now = current_timestamp();
		let mut motion = Motion::new(uuid::Uuid::new_v4().to_string(), &user.username, now);
		let mut events = vec![MotionEvent::Submitted {
			motion_id: motion.id.clone(),
			submitter: user.username.clone(),
		}];
		save_content(&mut motion, &draft, Some(user), &mut events);

		self.storage
			.store(StorageKey::Motions.as_str(), &motion.id, &motion)
			.await?;
		let mut index = MotionIndex::load(&self.storage).await?;
		index.add_motion(&motion.id);
		index.save(&self.storage).await?;

		tracing::info!(motion_id = %truncate_id(&motion.id), "Motion submitted");
		self.publish(events);
		Ok(motion)
	}

	/// Saves edited content, creating a new version if anything changed.
	///
	/// When a non-manager changes a published motion its supporters are
	/// removed, since they supported different content.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), user = %user.username))]
	pub async fn edit(
		&self,
		motion_id: &str,
		user: &User,
		draft: MotionDraft,
	) -> Result<Motion, MotionError> {
		validate_draft(&draft)?;

		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;
		self.require(&motion, user, MotionAction::Edit)?;

		let mut events = Vec::new();
		if !save_content(&mut motion, &draft, Some(user), &mut events) {
			tracing::debug!("Content unchanged, no version created");
			return Ok(motion);
		}

		self.persist(&mut motion).await?;
		self.publish(events);
		Ok(motion)
	}

	/// Resets a motion to published and clears its permitted version.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), user = %user.username))]
	pub async fn reset(&self, motion_id: &str, user: &User) -> Result<Motion, MotionError> {
		if !user.is_manager() {
			return Err(MotionError::PermissionDenied {
				user: user.username.clone(),
				action: "reset".to_string(),
			});
		}

		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;
		motion.status = MotionStatus::Published;
		motion.permitted = None;
		motion.write_log(
			format!("Status reset to: {}", motion.status),
			Some(&user.username),
		);

		self.persist(&mut motion).await?;
		self.publish(vec![MotionEvent::Reset {
			motion_id: motion.id.clone(),
		}]);
		Ok(motion)
	}

	/// Adds `user` to the supporters of a published motion.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), user = %user.username))]
	pub async fn support(&self, motion_id: &str, user: &User) -> Result<Motion, MotionError> {
		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;

		if user.username == motion.submitter {
			return Err(MotionError::SubmitterCannotSupport);
		}
		if motion.permitted.is_some() {
			return Err(MotionError::AlreadyPermitted);
		}
		if !user.has_perm(Permission::CanSupport) {
			return Err(denied(user, MotionAction::Support));
		}
		if motion.status != MotionStatus::Published {
			return Err(MotionError::ActionNotAllowed {
				action: MotionAction::Support,
				status: motion.status,
			});
		}
		if motion.is_supporter(&user.username) {
			return Ok(motion);
		}

		motion.supporters.push(user.username.clone());
		motion.write_log(format!("Supporter: +{}", user.username), None);

		self.persist(&mut motion).await?;
		self.publish(vec![MotionEvent::SupportAdded {
			motion_id: motion.id.clone(),
			user: user.username.clone(),
		}]);
		Ok(motion)
	}

	/// Removes `user` from the supporters.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), user = %user.username))]
	pub async fn unsupport(&self, motion_id: &str, user: &User) -> Result<Motion, MotionError> {
		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;

		if motion.permitted.is_some() {
			return Err(MotionError::AlreadyPermitted);
		}
		if !motion.is_supporter(&user.username) {
			return Ok(motion);
		}

		motion.supporters.retain(|s| s != &user.username);
		motion.write_log(format!("Supporter: -{}", user.username), None);

		self.persist(&mut motion).await?;
		self.publish(vec![MotionEvent::SupportRemoved {
			motion_id: motion.id.clone(),
			user: user.username.clone(),
		}]);
		Ok(motion)
	}

	/// Assigns a number, either the given one or the next free one.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), user = %user.username))]
	pub async fn set_number(
		&self,
		motion_id: &str,
		user: &User,
		number: Option<u32>,
	) -> Result<u32, MotionError> {
		if !user.is_manager() {
			return Err(denied(user, MotionAction::SetNumber));
		}

		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;
		let mut index = MotionIndex::load(&self.storage).await?;
		let mut events = Vec::new();

		let number = assign_number(&mut motion, &mut index, number, Some(user), &mut events)?;

		index.save(&self.storage).await?;
		self.persist(&mut motion).await?;
		self.publish(events);
		Ok(number)
	}

	/// Changes the status of a motion.
	///
	/// Moving into `Permitted` also numbers the motion if needed and marks
	/// the newest version as permitted; moving into `NotPermitted` numbers
	/// the motion. `force` skips the allowed-action check and is reserved
	/// for managers.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), user = %user.username, status = %status))]
	pub async fn set_status(
		&self,
		motion_id: &str,
		user: &User,
		status: MotionStatus,
		force: bool,
	) -> Result<Motion, MotionError> {
		if force && !user.is_manager() {
			return Err(MotionError::PermissionDenied {
				user: user.username.clone(),
				action: "force a status change".to_string(),
			});
		}

		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;
		MotionStateMachine::check_status_change(&motion, user, status, force)?;

		let from = motion.status;
		motion.status = status;
		motion.write_log(
			format!("Status modified: {} -> {}", from, status),
			Some(&user.username),
		);
		let mut events = vec![MotionEvent::StatusChanged {
			motion_id: motion.id.clone(),
			from,
			to: status,
		}];

		let mut index = None;
		if matches!(
			status,
			MotionStatus::Permitted | MotionStatus::NotPermitted
		) {
			let last = motion.last_version().map(|v| v.number).ok_or(MotionError::NoVersion)?;
			if motion.number.is_none() {
				let mut loaded = MotionIndex::load(&self.storage).await?;
				assign_number(&mut motion, &mut loaded, None, None, &mut events)?;
				index = Some(loaded);
			}

			if status == MotionStatus::Permitted {
				motion.permitted = Some(last);
				motion.write_log(format!("Version {} permitted", last), Some(&user.username));
				events.push(MotionEvent::VersionPermitted {
					motion_id: motion.id.clone(),
					version: last,
				});
			} else {
				motion.write_log(
					format!("Version {} not permitted", last),
					Some(&user.username),
				);
			}
		}

		// numbers are reserved in the index before the motion records them
		if let Some(index) = index {
			index.save(&self.storage).await?;
		}
		self.persist(&mut motion).await?;
		tracing::info!(from = %from, "Status changed");
		self.publish(events);
		Ok(motion)
	}

	/// Permits the motion and its newest version. Returns the version number.
	pub async fn permit(&self, motion_id: &str, user: &User) -> Result<u32, MotionError> {
		let motion = self
			.set_status(motion_id, user, MotionStatus::Permitted, false)
			.await?;
		motion.permitted.ok_or(MotionError::NoVersion)
	}

	/// Refuses to permit the motion.
	pub async fn not_permit(&self, motion_id: &str, user: &User) -> Result<Motion, MotionError> {
		self.set_status(motion_id, user, MotionStatus::NotPermitted, false)
			.await
	}

	/// Permits a version newer than the currently permitted one.
	///
	/// Returns false when the version is not newer and nothing changed.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), version = version))]
	pub async fn accept_version(
		&self,
		motion_id: &str,
		user: &User,
		version: u32,
	) -> Result<bool, MotionError> {
		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;
		self.require(&motion, user, MotionAction::PermitVersion)?;
		if motion.version(version).is_none() {
			return Err(MotionError::VersionNotFound(version));
		}
		if version <= motion.permitted.unwrap_or(0) {
			return Ok(false);
		}

		motion.permitted = Some(version);
		motion.write_log(format!("Version {} permitted", version), Some(&user.username));

		self.persist(&mut motion).await?;
		self.publish(vec![MotionEvent::VersionPermitted {
			motion_id: motion.id.clone(),
			version,
		}]);
		Ok(true)
	}

	/// Declines a version newer than the currently permitted one.
	///
	/// Returns false when the version is not newer and nothing changed.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), version = version))]
	pub async fn reject_version(
		&self,
		motion_id: &str,
		user: &User,
		version: u32,
	) -> Result<bool, MotionError> {
		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;
		self.require(&motion, user, MotionAction::RejectVersion)?;

		let permitted = motion.permitted.unwrap_or(0);
		let entry = motion
			.versions
			.iter_mut()
			.find(|v| v.number == version)
			.ok_or(MotionError::VersionNotFound(version))?;
		if version <= permitted {
			return Ok(false);
		}

		entry.rejected = true;
		motion.write_log(format!("Version {} rejected", version), Some(&user.username));

		self.persist(&mut motion).await?;
		self.publish(vec![MotionEvent::VersionRejected {
			motion_id: motion.id.clone(),
			version,
		}]);
		Ok(true)
	}

	/// Deletes a motion.
	///
	/// Numbered motions can only be deleted with `force`, which also skips
	/// the allowed-action check and is reserved for managers. Polls and the
	/// agenda item of the motion are deleted with it.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), user = %user.username))]
	pub async fn delete(&self, motion_id: &str, user: &User, force: bool) -> Result<(), MotionError> {
		let _guard = self.write_lock.lock().await;
		let motion = self.get(motion_id).await?;

		if force {
			if !user.is_manager() {
				return Err(denied(user, MotionAction::Delete));
			}
		} else {
			if let Some(number) = motion.number {
				return Err(MotionError::AlreadyNumbered(number));
			}
			self.require(&motion, user, MotionAction::Delete)?;
		}

		let mut index = MotionIndex::load(&self.storage).await?;
		index.remove_motion(motion_id);
		index.save(&self.storage).await?;

		for poll_id in &motion.polls {
			self.storage
				.remove(StorageKey::Polls.as_str(), poll_id)
				.await?;
		}
		if let Some(item_id) = &motion.agenda_item {
			self.storage
				.remove(StorageKey::AgendaItems.as_str(), item_id)
				.await?;
		}
		self.storage
			.remove(StorageKey::Motions.as_str(), motion_id)
			.await?;

		tracing::info!("Motion deleted");
		self.publish(vec![MotionEvent::Deleted {
			motion_id: motion_id.to_string(),
		}]);
		Ok(())
	}

	/// Generates a decision poll for a permitted motion.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), user = %user.username))]
	pub async fn generate_poll(&self, motion_id: &str, user: &User) -> Result<Poll, MotionError> {
		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;
		self.require(&motion, user, MotionAction::GeneratePoll)?;

		let poll = Poll {
			id: uuid::Uuid::new_v4().to_string(),
			motion_id: motion.id.clone(),
			option_decision: true,
			options: vec![PollOption {
				motion_id: motion.id.clone(),
				label: motion.to_string(),
			}],
			created_at: current_timestamp(),
		};
		self.storage
			.store(StorageKey::Polls.as_str(), &poll.id, &poll)
			.await?;

		motion.polls.push(poll.id.clone());
		motion.write_log("Poll created", Some(&user.username));
		self.persist(&mut motion).await?;

		self.publish(vec![MotionEvent::PollCreated {
			motion_id: motion.id.clone(),
			poll_id: poll.id.clone(),
		}]);
		Ok(poll)
	}

	/// Creates an agenda item for a numbered motion and links it.
	#[instrument(skip_all, fields(motion_id = %truncate_id(motion_id), user = %user.username))]
	pub async fn create_agenda_item(
		&self,
		motion_id: &str,
		user: &User,
	) -> Result<AgendaItem, MotionError> {
		let _guard = self.write_lock.lock().await;
		let mut motion = self.get(motion_id).await?;
		self.require(&motion, user, MotionAction::CreateItem)?;

		let item = AgendaItem {
			id: uuid::Uuid::new_v4().to_string(),
			motion_id: motion.id.clone(),
			title: motion.to_string(),
			created_at: current_timestamp(),
		};
		self.storage
			.store(StorageKey::AgendaItems.as_str(), &item.id, &item)
			.await?;

		motion.agenda_item = Some(item.id.clone());
		motion.write_log("Agenda item created", Some(&user.username));
		self.persist(&mut motion).await?;

		self.publish(vec![MotionEvent::AgendaItemCreated {
			motion_id: motion.id.clone(),
			item_id: item.id.clone(),
		}]);
		Ok(item)
	}

	fn require(&self, motion: &Motion, user: &User, action: MotionAction) -> Result<(), MotionError> {
		if MotionStateMachine::is_allowed(motion, user, action) {
			Ok(())
		} else {
			Err(denied(user, action))
		}
	}

	async fn persist(&self, motion: &mut Motion) -> Result<(), MotionError> {
		motion.updated_at = current_timestamp();
		let motion: &Motion = motion;
		self.storage
			.update(StorageKey::Motions.as_str(), &motion.id, motion)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => MotionError::NotFound(motion.id.clone()),
				other => other.into(),
			})
	}

	fn publish(&self, events: Vec<MotionEvent>) {
		for event in events {
			tracing::debug!(
				motion_id = %truncate_id(event.motion_id()),
				event = ?event,
				"Publishing event"
			);
			self.event_bus.publish(event).ok();
		}
	}
}

/// Appends a version when the draft differs from the newest version.
///
/// Returns false when nothing changed.
fn save_content(
	motion: &mut Motion,
	draft: &MotionDraft,
	user: Option<&User>,
	events: &mut Vec<MotionEvent>,
) -> bool {
	if motion.last_version().is_some_and(|last| last.matches(draft)) {
		return false;
	}

	let username = user.map(|u| u.username.as_str());
	let version = motion.push_version(draft, current_timestamp());
	motion.write_log(format!("Version {} created", version), username);
	events.push(MotionEvent::VersionCreated {
		motion_id: motion.id.clone(),
		version,
	});

	let is_manager = user.is_some_and(User::is_manager);
	if motion.status == MotionStatus::Published && !motion.supporters.is_empty() && !is_manager {
		let removed = motion.supporters.len();
		motion.supporters.clear();
		motion.write_log("Supporters removed", username);
		events.push(MotionEvent::SupportersCleared {
			motion_id: motion.id.clone(),
			removed,
		});
	}
	true
}

fn validate_draft(draft: &MotionDraft) -> Result<(), MotionError> {
	if draft.title.trim().is_empty() {
		return Err(MotionError::InvalidContent("title cannot be empty".into()));
	}
	Ok(())
}

/// Assigns `number` (or the next free one) to the motion and records it in the index.
fn assign_number(
	motion: &mut Motion,
	index: &mut MotionIndex,
	number: Option<u32>,
	user: Option<&User>,
	events: &mut Vec<MotionEvent>,
) -> Result<u32, MotionError> {
	if let Some(existing) = motion.number {
		return Err(MotionError::AlreadyNumbered(existing));
	}
	let number = match number {
		Some(0) => return Err(MotionError::InvalidNumber),
		Some(n) if index.is_taken(n) => return Err(MotionError::NumberTaken(n)),
		Some(n) => n,
		None => index.next_number().ok_or(MotionError::NumbersExhausted)?,
	};

	motion.number = Some(number);
	index.assign(number, &motion.id);
	motion.write_log(
		format!("Number set: {}", number),
		user.map(|u| u.username.as_str()),
	);
	events.push(MotionEvent::NumberAssigned {
		motion_id: motion.id.clone(),
		number,
	});
	Ok(number)
}

#[cfg(test)]
mod tests {
	use super::*;
	use motion_storage::implementations::memory::MemoryStorage;

	fn service(min_supporters: u32) -> MotionService {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		MotionService::new(storage, EventBus::new(64), min_supporters)
	}

	fn alice() -> User {
		User::new("alice").with_permissions([Permission::CanSee, Permission::CanInsert])
	}

	fn bob() -> User {
		User::new("bob").with_permissions([Permission::CanSee, Permission::CanSupport])
	}

	fn carol() -> User {
		User::new("carol").with_permissions([Permission::CanSee, Permission::CanManage])
	}

	fn draft() -> MotionDraft {
		MotionDraft::new("Budget", "Raise the budget").with_reason("Inflation")
	}

	async fn submitted(service: &MotionService) -> Motion {
		service.submit(&alice(), draft()).await.unwrap()
	}

	fn messages(motion: &Motion) -> Vec<&str> {
		motion.log.iter().map(|e| e.message.as_str()).collect()
	}

	#[tokio::test]
	async fn test_submit_creates_first_version() {
		let service = service(0);
		let mut events = service.event_bus().subscribe();
		let motion = submitted(&service).await;

		assert_eq!(motion.status, MotionStatus::Published);
		assert_eq!(motion.submitter, "alice");
		assert_eq!(motion.versions.len(), 1);
		assert_eq!(motion.title(), Some("Budget"));
		assert_eq!(motion.reason(), Some("Inflation"));
		assert_eq!(messages(&motion), vec!["Version 1 created"]);
		assert_eq!(motion.log[0].user.as_deref(), Some("alice"));

		assert!(matches!(
			events.recv().await.unwrap(),
			MotionEvent::Submitted { .. }
		));
		assert!(matches!(
			events.recv().await.unwrap(),
			MotionEvent::VersionCreated { version: 1, .. }
		));

		let listed = service.list().await.unwrap();
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].id, motion.id);
	}

	#[tokio::test]
	async fn test_submit_requires_permission_and_title() {
		let service = service(0);
		assert!(matches!(
			service.submit(&bob(), draft()).await,
			Err(MotionError::PermissionDenied { .. })
		));
		assert!(matches!(
			service.submit(&alice(), MotionDraft::new("  ", "text")).await,
			Err(MotionError::InvalidContent(_))
		));
	}

	#[tokio::test]
	async fn test_edit_without_changes_creates_no_version() {
		let service = service(0);
		let motion = submitted(&service).await;

		let edited = service.edit(&motion.id, &alice(), draft()).await.unwrap();
		assert_eq!(edited.versions.len(), 1);
		assert_eq!(edited.log.len(), 1);
	}

	#[tokio::test]
	async fn test_edit_by_submitter_clears_supporters() {
		let service = service(1);
		let motion = submitted(&service).await;
		service.support(&motion.id, &bob()).await.unwrap();
		assert!(service.enough_supporters(&motion.id).await.unwrap());

		let edited = service
			.edit(&motion.id, &alice(), MotionDraft::new("Budget", "Raise it a lot"))
			.await
			.unwrap();

		assert_eq!(edited.versions.len(), 2);
		assert_eq!(edited.text(), Some("Raise it a lot"));
		assert!(edited.supporters.is_empty());
		assert_eq!(
			messages(&edited),
			vec![
				"Version 1 created",
				"Supporter: +bob",
				"Version 2 created",
				"Supporters removed"
			]
		);
		assert_eq!(
			service.notes(&motion.id).await.unwrap(),
			vec!["Searching for supporters.", "Not yet permitted."]
		);
	}

	#[tokio::test]
	async fn test_edit_by_manager_keeps_supporters() {
		let service = service(0);
		let motion = submitted(&service).await;
		service.support(&motion.id, &bob()).await.unwrap();

		let edited = service
			.edit(&motion.id, &carol(), MotionDraft::new("Budget 2", "Raise"))
			.await
			.unwrap();
		assert_eq!(edited.supporters, vec!["bob"]);
		assert_eq!(edited.log.last().unwrap().user.as_deref(), Some("carol"));
	}

	#[tokio::test]
	async fn test_edit_by_stranger_is_denied() {
		let service = service(0);
		let motion = submitted(&service).await;
		let result = service
			.edit(&motion.id, &bob(), MotionDraft::new("Hijack", "x"))
			.await;
		assert!(matches!(result, Err(MotionError::PermissionDenied { .. })));
	}

	#[tokio::test]
	async fn test_support_rules() {
		let service = service(0);
		let motion = submitted(&service).await;

		assert!(matches!(
			service.support(&motion.id, &alice()).await,
			Err(MotionError::SubmitterCannotSupport)
		));
		assert!(matches!(
			service.support(&motion.id, &User::new("eve")).await,
			Err(MotionError::PermissionDenied { .. })
		));

		service.support(&motion.id, &bob()).await.unwrap();
		let again = service.support(&motion.id, &bob()).await.unwrap();
		assert_eq!(again.supporters, vec!["bob"]);

		let after = service.unsupport(&motion.id, &bob()).await.unwrap();
		assert!(after.supporters.is_empty());
		assert_eq!(
			messages(&after),
			vec!["Version 1 created", "Supporter: +bob", "Supporter: -bob"]
		);

		service.permit(&motion.id, &carol()).await.unwrap();
		assert!(matches!(
			service.support(&motion.id, &bob()).await,
			Err(MotionError::AlreadyPermitted)
		));
		assert!(matches!(
			service.unsupport(&motion.id, &bob()).await,
			Err(MotionError::AlreadyPermitted)
		));
	}

	#[tokio::test]
	async fn test_set_number_sequence_and_uniqueness() {
		let service = service(0);
		let first = submitted(&service).await;
		let second = submitted(&service).await;
		let third = submitted(&service).await;

		assert_eq!(
			service.set_number(&first.id, &carol(), Some(5)).await.unwrap(),
			5
		);
		assert_eq!(
			service.set_number(&second.id, &carol(), None).await.unwrap(),
			6
		);
		assert!(matches!(
			service.set_number(&second.id, &carol(), None).await,
			Err(MotionError::AlreadyNumbered(6))
		));
		assert!(matches!(
			service.set_number(&third.id, &carol(), Some(5)).await,
			Err(MotionError::NumberTaken(5))
		));
		assert!(matches!(
			service.set_number(&third.id, &carol(), Some(0)).await,
			Err(MotionError::InvalidNumber)
		));
		assert!(matches!(
			service.set_number(&third.id, &alice(), None).await,
			Err(MotionError::PermissionDenied { .. })
		));

		let listed: Vec<_> = service
			.list()
			.await
			.unwrap()
			.into_iter()
			.map(|m| m.number)
			.collect();
		assert_eq!(listed, vec![Some(5), Some(6), None]);
	}

	#[tokio::test]
	async fn test_automatic_number_after_highest_number() {
		let service = service(0);
		let first = submitted(&service).await;
		let second = submitted(&service).await;

		service
			.set_number(&first.id, &carol(), Some(u32::MAX))
			.await
			.unwrap();
		assert!(matches!(
			service.set_number(&second.id, &carol(), None).await,
			Err(MotionError::NumbersExhausted)
		));
		assert!(matches!(
			service.permit(&second.id, &carol()).await,
			Err(MotionError::NumbersExhausted)
		));

		let second = service.get(&second.id).await.unwrap();
		assert_eq!(second.number, None);
		assert_eq!(second.status, MotionStatus::Published);

		// an explicit free number still works
		assert_eq!(
			service.set_number(&second.id, &carol(), Some(1)).await.unwrap(),
			1
		);
	}

	#[tokio::test]
	async fn test_permit_numbers_and_permits_last_version() {
		let service = service(0);
		let motion = submitted(&service).await;

		let version = service.permit(&motion.id, &carol()).await.unwrap();
		assert_eq!(version, 1);

		let motion = service.get(&motion.id).await.unwrap();
		assert_eq!(motion.status, MotionStatus::Permitted);
		assert_eq!(motion.number, Some(1));
		assert_eq!(motion.permitted, Some(1));
		assert_eq!(
			messages(&motion),
			vec![
				"Version 1 created",
				"Status modified: Published -> Permitted",
				"Number set: 1",
				"Version 1 permitted"
			]
		);
		assert!(service.notes(&motion.id).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_permit_requires_manager() {
		let service = service(0);
		let motion = submitted(&service).await;
		let result = service.permit(&motion.id, &alice()).await;
		assert!(matches!(
			result,
			Err(MotionError::State(StateError::TransitionNotAllowed { .. }))
		));
	}

	#[tokio::test]
	async fn test_not_permit_keeps_existing_number() {
		let service = service(0);
		let motion = submitted(&service).await;
		service.set_number(&motion.id, &carol(), Some(3)).await.unwrap();

		let motion = service.not_permit(&motion.id, &carol()).await.unwrap();
		assert_eq!(motion.status, MotionStatus::NotPermitted);
		assert_eq!(motion.number, Some(3));
		assert_eq!(motion.permitted, None);
		assert_eq!(motion.log.last().unwrap().message, "Version 1 not permitted");
	}

	#[tokio::test]
	async fn test_status_changes_from_permitted() {
		let service = service(0);
		let motion = submitted(&service).await;
		service.permit(&motion.id, &carol()).await.unwrap();

		assert!(matches!(
			service
				.set_status(&motion.id, &carol(), MotionStatus::Permitted, false)
				.await,
			Err(MotionError::State(StateError::AlreadyInStatus(_)))
		));

		let accepted = service
			.set_status(&motion.id, &carol(), MotionStatus::Accepted, false)
			.await
			.unwrap();
		assert_eq!(accepted.status, MotionStatus::Accepted);
		assert_eq!(
			accepted.log.last().unwrap().message,
			"Status modified: Permitted -> Accepted"
		);

		// terminal until reset or forced
		assert!(service
			.set_status(&motion.id, &carol(), MotionStatus::Adjourned, false)
			.await
			.is_err());
		let forced = service
			.set_status(&motion.id, &carol(), MotionStatus::Adjourned, true)
			.await
			.unwrap();
		assert_eq!(forced.status, MotionStatus::Adjourned);
		assert!(matches!(
			service
				.set_status(&motion.id, &alice(), MotionStatus::Rejected, true)
				.await,
			Err(MotionError::PermissionDenied { .. })
		));
	}

	#[tokio::test]
	async fn test_submitter_can_withdraw_permitted_motion() {
		let service = service(0);
		let motion = submitted(&service).await;
		service.permit(&motion.id, &carol()).await.unwrap();

		let withdrawn = service
			.set_status(&motion.id, &alice(), MotionStatus::Withdrawn, false)
			.await
			.unwrap();
		assert_eq!(withdrawn.status, MotionStatus::Withdrawn);
	}

	#[tokio::test]
	async fn test_reset() {
		let service = service(0);
		let motion = submitted(&service).await;
		service.permit(&motion.id, &carol()).await.unwrap();

		assert!(service.reset(&motion.id, &alice()).await.is_err());
		let reset = service.reset(&motion.id, &carol()).await.unwrap();
		assert_eq!(reset.status, MotionStatus::Published);
		assert_eq!(reset.permitted, None);
		assert_eq!(reset.number, Some(1));
		assert_eq!(
			reset.log.last().unwrap().message,
			"Status reset to: Published"
		);
	}

	#[tokio::test]
	async fn test_version_permit_and_reject() {
		let service = service(0);
		let motion = submitted(&service).await;
		service.permit(&motion.id, &carol()).await.unwrap();

		// submitter edits after permission; supporters are not touched
		service
			.edit(&motion.id, &alice(), MotionDraft::new("Budget", "v2"))
			.await
			.unwrap();
		assert!(service.get(&motion.id).await.unwrap().unpermitted_changes());
		assert_eq!(
			service.notes(&motion.id).await.unwrap(),
			vec!["Not yet permitted changes."]
		);

		assert!(matches!(
			service.accept_version(&motion.id, &alice(), 2).await,
			Err(MotionError::PermissionDenied { .. })
		));
		assert!(matches!(
			service.accept_version(&motion.id, &carol(), 9).await,
			Err(MotionError::VersionNotFound(9))
		));
		assert!(!service.accept_version(&motion.id, &carol(), 1).await.unwrap());
		assert!(service.accept_version(&motion.id, &carol(), 2).await.unwrap());

		let motion = service.get(&motion.id).await.unwrap();
		assert_eq!(motion.permitted, Some(2));
		assert!(!motion.unpermitted_changes());

		service
			.edit(&motion.id, &alice(), MotionDraft::new("Budget", "v3"))
			.await
			.unwrap();
		assert!(matches!(
			service.reject_version(&motion.id, &carol(), 9).await,
			Err(MotionError::VersionNotFound(9))
		));
		assert!(!service.reject_version(&motion.id, &carol(), 2).await.unwrap());
		assert!(service.reject_version(&motion.id, &carol(), 3).await.unwrap());

		let motion = service.get(&motion.id).await.unwrap();
		assert!(motion.versions[2].rejected);
		assert_eq!(motion.permitted, Some(2));
		assert!(!motion.unpermitted_changes());
		assert!(!service
			.allowed_actions(&motion.id, &carol())
			.await
			.unwrap()
			.contains(&MotionAction::PermitVersion));
	}

	#[tokio::test]
	async fn test_delete_rules() {
		let service = service(0);
		let motion = submitted(&service).await;

		assert!(matches!(
			service.delete(&motion.id, &bob(), false).await,
			Err(MotionError::PermissionDenied { .. })
		));

		service.set_number(&motion.id, &carol(), None).await.unwrap();
		assert!(matches!(
			service.delete(&motion.id, &alice(), false).await,
			Err(MotionError::AlreadyNumbered(1))
		));
		assert!(service.delete(&motion.id, &alice(), true).await.is_err());

		service.delete(&motion.id, &carol(), true).await.unwrap();
		assert!(matches!(
			service.get(&motion.id).await,
			Err(MotionError::NotFound(_))
		));
		assert!(service.list().await.unwrap().is_empty());

		// the freed number is handed out again
		let next = submitted(&service).await;
		assert_eq!(service.set_number(&next.id, &carol(), None).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn test_forced_delete_removes_polls_and_agenda_item() {
		let service = service(0);
		let motion = submitted(&service).await;
		service.permit(&motion.id, &carol()).await.unwrap();
		let poll = service.generate_poll(&motion.id, &carol()).await.unwrap();
		let item = service.create_agenda_item(&motion.id, &carol()).await.unwrap();

		service.delete(&motion.id, &carol(), true).await.unwrap();

		let storage = &service.storage;
		assert!(!storage.exists(StorageKey::Polls.as_str(), &poll.id).await.unwrap());
		assert!(!storage
			.exists(StorageKey::AgendaItems.as_str(), &item.id)
			.await
			.unwrap());
		assert!(!storage
			.exists(StorageKey::Motions.as_str(), &motion.id)
			.await
			.unwrap());
		let index = MotionIndex::load(storage).await.unwrap();
		assert!(index.motions.is_empty());
		assert!(index.numbers.is_empty());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_numbering_is_unique() {
		let service = Arc::new(service(0));
		let mut ids = Vec::new();
		for _ in 0..8 {
			ids.push(submitted(&service).await.id);
		}

		let mut handles = Vec::new();
		for (i, id) in ids.iter().cloned().enumerate() {
			let service = Arc::clone(&service);
			handles.push(tokio::spawn(async move {
				if i % 2 == 0 {
					service.permit(&id, &carol()).await.map(|_| ())
				} else {
					service.set_number(&id, &carol(), None).await.map(|_| ())
				}
			}));
		}
		for handle in handles {
			handle.await.unwrap().unwrap();
		}

		let mut numbers = Vec::new();
		for id in &ids {
			numbers.push(service.get(id).await.unwrap().number.unwrap());
		}
		numbers.sort_unstable();
		assert_eq!(numbers, (1..=8).collect::<Vec<u32>>());

		let index = MotionIndex::load(&service.storage).await.unwrap();
		assert_eq!(index.numbers.len(), 8);
	}

	#[tokio::test]
	async fn test_submitter_deletes_unnumbered_motion() {
		let service = service(0);
		let motion = submitted(&service).await;
		service.delete(&motion.id, &alice(), false).await.unwrap();
		assert!(service.list().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_generate_poll() {
		let service = service(0);
		let motion = submitted(&service).await;

		assert!(matches!(
			service.generate_poll(&motion.id, &carol()).await,
			Err(MotionError::PermissionDenied { .. })
		));

		service.permit(&motion.id, &carol()).await.unwrap();
		let poll = service.generate_poll(&motion.id, &carol()).await.unwrap();
		assert!(poll.option_decision);
		assert_eq!(poll.options.len(), 1);
		assert_eq!(poll.options[0].label, "Budget");

		let polls = service.polls(&motion.id).await.unwrap();
		assert_eq!(polls.len(), 1);
		assert_eq!(polls[0].id, poll.id);
		let motion = service.get(&motion.id).await.unwrap();
		assert_eq!(motion.log.last().unwrap().message, "Poll created");
	}

	#[tokio::test]
	async fn test_create_agenda_item_once() {
		let service = service(0);
		let motion = submitted(&service).await;

		assert!(service.create_agenda_item(&motion.id, &carol()).await.is_err());
		service.set_number(&motion.id, &carol(), None).await.unwrap();

		let item = service.create_agenda_item(&motion.id, &carol()).await.unwrap();
		assert_eq!(item.title, "Budget");
		let motion = service.get(&motion.id).await.unwrap();
		assert_eq!(motion.agenda_item, Some(item.id));

		assert!(matches!(
			service.create_agenda_item(&motion.id, &carol()).await,
			Err(MotionError::PermissionDenied { .. })
		));
	}

	#[tokio::test]
	async fn test_unknown_motion() {
		let service = service(0);
		assert!(matches!(
			service.support("missing", &bob()).await,
			Err(MotionError::NotFound(_))
		));
	}
}
