//! Motion index kept in the registry namespace.
//!
//! The key/value storage cannot enumerate keys, so the service maintains a
//! single index record listing every motion and every assigned number.
//! Number uniqueness is enforced here.

use motion_types::StorageKey;
use motion_storage::{StorageError, StorageService};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const INDEX_ID: &str = "motions";

/// Registry of motion ids and assigned numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotionIndex {
	/// Motion ids in submission order.
	#[serde(default)]
	pub motions: Vec<String>,
	/// Assigned numbers mapped to motion ids.
	#[serde(default)]
	pub numbers: BTreeMap<u32, String>,
}

impl MotionIndex {
	pub async fn load(storage: &StorageService) -> Result<Self, StorageError> {
		Ok(storage
			.retrieve_optional(StorageKey::Registry.as_str(), INDEX_ID)
			.await?
			.unwrap_or_default())
	}

	pub async fn save(&self, storage: &StorageService) -> Result<(), StorageError> {
		storage
			.store(StorageKey::Registry.as_str(), INDEX_ID, self)
			.await
	}

	/// Highest assigned number plus one, or 1 when none are assigned.
	///
	/// `None` once `u32::MAX` is taken.
	pub fn next_number(&self) -> Option<u32> {
		match self.numbers.keys().next_back() {
			Some(max) => max.checked_add(1),
			None => Some(1),
		}
	}

	pub fn is_taken(&self, number: u32) -> bool {
		self.numbers.contains_key(&number)
	}

	pub fn add_motion(&mut self, motion_id: &str) {
		if !self.motions.iter().any(|id| id == motion_id) {
			self.motions.push(motion_id.to_string());
		}
	}

	pub fn assign(&mut self, number: u32, motion_id: &str) {
		self.numbers.insert(number, motion_id.to_string());
	}

	/// Drops the motion and any number it held.
	pub fn remove_motion(&mut self, motion_id: &str) {
		self.motions.retain(|id| id != motion_id);
		self.numbers.retain(|_, id| id != motion_id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_next_number() {
		let mut index = MotionIndex::default();
		assert_eq!(index.next_number(), Some(1));

		index.assign(7, "a");
		index.assign(3, "b");
		assert_eq!(index.next_number(), Some(8));
		assert!(index.is_taken(3));

		index.remove_motion("a");
		assert_eq!(index.next_number(), Some(4));
	}

	#[test]
	fn test_next_number_exhausted() {
		let mut index = MotionIndex::default();
		index.assign(u32::MAX, "a");
		assert_eq!(index.next_number(), None);
	}

	#[test]
	fn test_add_motion_is_idempotent() {
		let mut index = MotionIndex::default();
		index.add_motion("a");
		index.add_motion("a");
		index.add_motion("b");
		assert_eq!(index.motions, vec!["a", "b"]);
	}
}
