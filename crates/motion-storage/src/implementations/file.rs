//! File-based storage backend.
//!
//! Each key is stored as one JSON file inside a base directory. Writes go to
//! a temporary file first and are renamed into place. The directory is
//! guarded by an exclusive advisory lock so that two processes never share
//! the same store.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use motion_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::fs;

const DEFAULT_STORAGE_PATH: &str = "./data/motions";
const LOCK_FILE: &str = ".lock";

/// File-based storage implementation.
pub struct FileStorage {
	base_path: PathBuf,
	/// Held for the lifetime of the backend; dropping it releases the lock.
	_lock: File,
}

impl FileStorage {
	/// Opens (and creates if needed) a store rooted at `base_path`.
	///
	/// Fails with a backend error when another process holds the store lock.
	pub fn open(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
		let base_path = base_path.as_ref().to_path_buf();
		std::fs::create_dir_all(&base_path).map_err(|e| StorageError::Backend(e.to_string()))?;

		let lock = File::create(base_path.join(LOCK_FILE))
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		lock.try_lock_exclusive().map_err(|e| {
			StorageError::Backend(format!(
				"Store at {} is locked by another process: {}",
				base_path.display(),
				e
			))
		})?;

		tracing::debug!("Opened file storage at {}", base_path.display());
		Ok(Self {
			base_path,
			_lock: lock,
		})
	}

	/// Converts a storage key into a filesystem-safe path.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', ':', '\\'], "_");
		self.base_path.join(format!("{}.json", safe_key))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match fs::read(self.get_file_path(key)).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);
		let temp_path = path.with_extension("tmp");

		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.get_file_path(key)).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if path.trim().is_empty() => {
						Err("storage_path cannot be empty".to_string())
					},
					_ => Ok(()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Creates a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: "./data/motions")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::open(storage_path)?))
}

/// Registry for the file backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
