//! Configuration module for the motion workflow system.
//!
//! Configuration is loaded from a TOML file. `${VAR}` and
//! `${VAR:-default}` references are resolved from the environment before
//! parsing, and the parsed configuration is validated before it is returned.

use motion_types::{Permission, User};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the full error repeats the input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this deployment.
	pub service: ServiceConfig,
	/// Workflow rules.
	#[serde(default)]
	pub motions: MotionsConfig,
	/// Storage backend selection.
	pub storage: StorageConfig,
	/// Known users and their permissions, keyed by username.
	#[serde(default)]
	pub users: HashMap<String, UserConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this deployment, e.g. the assembly name.
	pub id: String,
}

/// Workflow rules for motions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotionsConfig {
	/// Supporters a published motion needs before it stops searching.
	#[serde(default = "default_min_supporters")]
	pub min_supporters: u32,
}

impl Default for MotionsConfig {
	fn default() -> Self {
		Self {
			min_supporters: default_min_supporters(),
		}
	}
}

fn default_min_supporters() -> u32 {
	0
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserConfig {
	/// Permission codes such as "can_manage_motion".
	#[serde(default)]
	pub permissions: Vec<String>,
}

/// Resolves `${VAR}` and `${VAR:-default}` references in a string.
///
/// Input is limited to 1MB to keep regex matching bounded.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)));
			},
		};
		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads and validates configuration from a file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Returns the configured user with the given name.
	///
	/// Unknown users get no permissions.
	pub fn user(&self, username: &str) -> User {
		let permissions = self
			.users
			.get(username)
			.map(|u| {
				u.permissions
					.iter()
					.filter_map(|p| p.parse::<Permission>().ok())
					.collect::<Vec<_>>()
			})
			.unwrap_or_default();
		User::new(username).with_permissions(permissions)
	}

	/// Returns the configuration table of the primary storage backend.
	pub fn primary_storage(&self) -> Option<&toml::Value> {
		self.storage.implementations.get(&self.storage.primary)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if self.primary_storage().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		for (username, user) in &self.users {
			if username.trim().is_empty() {
				return Err(ConfigError::Validation("Usernames cannot be empty".into()));
			}
			for code in &user.permissions {
				code.parse::<Permission>().map_err(|e| {
					ConfigError::Validation(format!("User '{}': {}", username, e))
				})?;
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string, resolving environment variables
/// and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
