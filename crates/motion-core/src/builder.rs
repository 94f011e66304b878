//! Builder for constructing the motion service from configuration.
//!
//! Storage backends are pluggable: the builder is given a name -> factory
//! map, instantiates only the primary backend named in the config and checks
//! the backend table against the schema the backend reports.

use crate::event_bus::EventBus;
use crate::service::MotionService;
use motion_config::Config;
use motion_storage::{StorageFactory, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building the service.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builder for [`MotionService`].
pub struct MotionServiceBuilder {
	config: Config,
	storage_factories: HashMap<String, StorageFactory>,
}

impl MotionServiceBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
		}
	}

	/// Registers every storage backend shipped with `motion-storage`.
	pub fn with_default_storages(mut self) -> Self {
		for (name, factory) in motion_storage::get_all_implementations() {
			self.storage_factories.insert(name.to_string(), factory);
		}
		self
	}

	/// Registers a storage factory, replacing any factory of the same name.
	pub fn with_storage_factory(mut self, name: impl Into<String>, factory: StorageFactory) -> Self {
		self.storage_factories.insert(name.into(), factory);
		self
	}

	pub fn build(self) -> Result<MotionService, BuilderError> {
		let primary = &self.config.storage.primary;
		let factory = self.storage_factories.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("No storage factory registered for '{}'", primary))
		})?;
		let storage_config = self.config.primary_storage().ok_or_else(|| {
			BuilderError::Config(format!("Primary storage '{}' is not configured", primary))
		})?;

		let backend = factory(storage_config).map_err(|e| {
			tracing::error!(
				component = "storage",
				implementation = %primary,
				error = %e,
				"Failed to create storage implementation"
			);
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary, e
			))
		})?;
		backend
			.config_schema()
			.validate(storage_config)
			.map_err(|e| {
				tracing::error!(
					component = "storage",
					implementation = %primary,
					error = %e,
					"Invalid configuration for storage implementation"
				);
				BuilderError::Config(format!(
					"Invalid configuration for storage implementation '{}': {}",
					primary, e
				))
			})?;
		tracing::info!(component = "storage", implementation = %primary, "Loaded");

		let storage = Arc::new(StorageService::new(backend));
		Ok(MotionService::new(
			storage,
			EventBus::default(),
			self.config.motions.min_supporters,
		))
	}
}
