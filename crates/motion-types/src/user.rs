//! Users and permissions.
//!
//! Identity is supplied by the caller; this crate only models what a user is
//! allowed to do.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Permissions relevant to motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
	#[serde(rename = "can_see_motion")]
	CanSee,
	#[serde(rename = "can_insert_motion")]
	CanInsert,
	#[serde(rename = "can_support_motion")]
	CanSupport,
	#[serde(rename = "can_manage_motion")]
	CanManage,
}

impl Permission {
	pub fn code(&self) -> &'static str {
		match self {
			Permission::CanSee => "can_see_motion",
			Permission::CanInsert => "can_insert_motion",
			Permission::CanSupport => "can_support_motion",
			Permission::CanManage => "can_manage_motion",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::CanSee,
			Self::CanInsert,
			Self::CanSupport,
			Self::CanManage,
		]
		.into_iter()
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.code())
	}
}

impl FromStr for Permission {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|p| p.code() == s)
			.ok_or_else(|| format!("Unknown permission: {}", s))
	}
}

/// An acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub username: String,
	#[serde(default)]
	pub permissions: HashSet<Permission>,
}

impl User {
	pub fn new(username: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			permissions: HashSet::new(),
		}
	}

	pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
		self.permissions.extend(permissions);
		self
	}

	pub fn has_perm(&self, permission: Permission) -> bool {
		self.permissions.contains(&permission)
	}

	pub fn is_manager(&self) -> bool {
		self.has_perm(Permission::CanManage)
	}
}

impl fmt::Display for User {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.username)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_permission_codes() {
		assert_eq!(
			"can_manage_motion".parse::<Permission>().unwrap(),
			Permission::CanManage
		);
		assert!("can_fly".parse::<Permission>().is_err());
	}

	#[test]
	fn test_manager() {
		let user = User::new("carol").with_permissions([Permission::CanSee, Permission::CanManage]);
		assert!(user.is_manager());
		assert!(!User::new("dave").is_manager());
	}
}
