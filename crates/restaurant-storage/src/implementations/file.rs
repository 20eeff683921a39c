//! File-based storage backend.
//!
//! Each record is a file at `<storage_path>/<namespace>/<id>.json`. Single
//! writes go through a temp file and a rename.
//!
//! Every operation holds an OS lock on `<storage_path>/.lock`, shared for
//! reads and exclusive for writes, so separate processes working on the same
//! directory see each commit as a whole. A commit records the previous value
//! of every key it touches in a journal before applying anything. If applying
//! fails the journal is used to roll back, and a journal left behind by a
//! crash or a failed rollback is rolled back by the next operation. Writes are
//! refused until that succeeds.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry, WriteKind, WriteOp};
use async_trait::async_trait;
use fs2::FileExt;
use restaurant_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, warn};

const JOURNAL_FILE: &str = "commit.journal";
const LOCK_FILE: &str = ".lock";
const DEFAULT_NAMESPACE: &str = "default";
const RECORD_EXTENSION: &str = "json";

/// One write of a commit. `None` means the key is absent.
#[derive(Debug, Serialize, Deserialize)]
struct JournalEntry {
	key: String,
	before: Option<Vec<u8>>,
	after: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy)]
enum LockMode {
	Shared,
	Exclusive,
}

/// Directory lock, released on drop.
struct DirLock {
	file: std::fs::File,
}

impl Drop for DirLock {
	fn drop(&mut self) {
		// closing the handle releases the lock as well
		let _ = FileExt::unlock(&self.file);
	}
}

fn backend_err(e: impl std::fmt::Display) -> StorageError {
	StorageError::Backend(e.to_string())
}

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

impl FileStorage {
	/// Opens storage rooted at `base_path`, creating the directory if needed.
	pub fn open(base_path: PathBuf) -> Result<Self, StorageError> {
		std::fs::create_dir_all(&base_path).map_err(backend_err)?;
		Ok(Self { base_path })
	}

	fn journal_path(&self) -> PathBuf {
		self.base_path.join(JOURNAL_FILE)
	}

	/// Maps `namespace:id` to `<base>/<namespace>/<id>.json`.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let (namespace, id) = key.split_once(':').unwrap_or((DEFAULT_NAMESPACE, key));
		let safe = |s: &str| s.replace(['/', '\\', ':'], "_");
		self.base_path
			.join(safe(namespace))
			.join(format!("{}.{}", safe(id), RECORD_EXTENSION))
	}

	async fn lock(&self, mode: LockMode) -> Result<DirLock, StorageError> {
		let path = self.base_path.join(LOCK_FILE);
		tokio::task::spawn_blocking(move || {
			let file = std::fs::OpenOptions::new()
				.read(true)
				.write(true)
				.create(true)
				.truncate(false)
				.open(&path)?;
			match mode {
				LockMode::Shared => FileExt::lock_shared(&file)?,
				LockMode::Exclusive => FileExt::lock_exclusive(&file)?,
			}
			Ok::<_, std::io::Error>(DirLock { file })
		})
		.await
		.map_err(backend_err)?
		.map_err(backend_err)
	}

	/// Shared lock for readers. An unfinished commit is rolled back first.
	async fn read_lock(&self) -> Result<DirLock, StorageError> {
		let shared = self.lock(LockMode::Shared).await?;
		if !fs::try_exists(self.journal_path()).await.map_err(backend_err)? {
			return Ok(shared);
		}
		drop(shared);
		drop(self.write_lock().await?);
		self.lock(LockMode::Shared).await
	}

	/// Exclusive lock for writers. Fails if an unfinished commit cannot be
	/// rolled back.
	async fn write_lock(&self) -> Result<DirLock, StorageError> {
		let lock = self.lock(LockMode::Exclusive).await?;
		self.recover().await?;
		Ok(lock)
	}

	/// Rolls back the commit recorded in the journal, if any. Callers must
	/// hold the exclusive lock.
	async fn recover(&self) -> Result<(), StorageError> {
		let Some(data) = self.read_optional(&self.journal_path()).await? else {
			return Ok(());
		};
		let entries: Vec<JournalEntry> =
			serde_json::from_slice(&data).map_err(|e| StorageError::Serialization(e.to_string()))?;

		warn!(entries = entries.len(), "Rolling back unfinished commit from journal");
		self.roll_back(&entries).await?;
		self.remove_file(&self.journal_path()).await
	}

	async fn roll_back(&self, entries: &[JournalEntry]) -> Result<(), StorageError> {
		for entry in entries.iter().rev() {
			self.write_value(&entry.key, entry.before.as_deref()).await?;
		}
		Ok(())
	}

	/// Applies every entry, then drops the journal.
	async fn apply(&self, entries: &[JournalEntry]) -> Result<(), StorageError> {
		for entry in entries {
			self.write_value(&entry.key, entry.after.as_deref()).await?;
		}
		self.remove_file(&self.journal_path()).await
	}

	async fn write_value(&self, key: &str, value: Option<&[u8]>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);
		match value {
			Some(bytes) => self.write_file(&path, bytes).await,
			None => self.remove_file(&path).await,
		}
	}

	async fn read_optional(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
		match fs::read(path).await {
			Ok(data) => Ok(Some(data)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(backend_err(e)),
		}
	}

	/// Writes a file atomically by writing to a temp file then renaming.
	async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await.map_err(backend_err)?;
		}
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, data).await.map_err(backend_err)?;
		fs::rename(&temp_path, path).await.map_err(backend_err)
	}

	async fn remove_file(&self, path: &Path) -> Result<(), StorageError> {
		match fs::remove_file(path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(backend_err(e)),
		}
	}

	async fn list_namespace(
		&self,
		namespace: &str,
		out: &mut Vec<(String, Vec<u8>)>,
	) -> Result<(), StorageError> {
		let dir = self.base_path.join(namespace);
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
			Err(e) => return Err(backend_err(e)),
		};

		while let Some(entry) = entries.next_entry().await.map_err(backend_err)? {
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new(RECORD_EXTENSION)) {
				continue;
			}
			let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
				continue;
			};
			let key = format!("{}:{}", namespace, id);
			if let Some(data) = self.read_optional(&path).await? {
				out.push((key, data));
			}
		}
		Ok(())
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let _lock = self.read_lock().await?;
		self.read_optional(&self.get_file_path(key))
			.await?
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let _lock = self.write_lock().await?;
		self.write_file(&self.get_file_path(key), &value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let _lock = self.write_lock().await?;
		self.remove_file(&self.get_file_path(key)).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let _lock = self.read_lock().await?;
		fs::try_exists(self.get_file_path(key)).await.map_err(backend_err)
	}

	async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
		let _lock = self.read_lock().await?;
		let mut found = Vec::new();
		match prefix.split_once(':') {
			Some((namespace, _)) => self.list_namespace(namespace, &mut found).await?,
			None => {
				let mut dirs = fs::read_dir(&self.base_path).await.map_err(backend_err)?;
				while let Some(entry) = dirs.next_entry().await.map_err(backend_err)? {
					if entry.file_type().await.map_err(backend_err)?.is_dir() {
						if let Some(namespace) = entry.file_name().to_str() {
							self.list_namespace(namespace, &mut found).await?;
						}
					}
				}
			},
		}
		found.retain(|(key, _)| key.starts_with(prefix));
		found.sort_by(|a, b| a.0.cmp(&b.0));
		Ok(found)
	}

	async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
		let _lock = self.write_lock().await?;

		let mut entries = Vec::with_capacity(ops.len());
		for op in ops {
			let before = self.read_optional(&self.get_file_path(&op.key)).await?;
			if !op.precondition.holds(before.as_deref()) {
				return Err(StorageError::Conflict(op.key));
			}
			let after = match op.kind {
				WriteKind::Put(bytes) => Some(bytes),
				WriteKind::Delete => None,
			};
			entries.push(JournalEntry {
				key: op.key,
				before,
				after,
			});
		}

		let journal =
			serde_json::to_vec(&entries).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.write_file(&self.journal_path(), &journal).await?;

		if let Err(e) = self.apply(&entries).await {
			warn!(error = %e, "Commit failed while applying, rolling back");
			match self.roll_back(&entries).await {
				Ok(()) => self.remove_file(&self.journal_path()).await?,
				Err(undo) => error!(error = %undo, "Rollback failed, journal kept for recovery"),
			}
			return Err(e);
		}
		Ok(())
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
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if path.trim().is_empty() => {
							Err("storage_path cannot be empty".to_string())
						},
						_ => Ok(()),
					}
				}),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage");

	Ok(Box::new(FileStorage::open(PathBuf::from(storage_path))?))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
