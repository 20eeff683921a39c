//! Storage module for the restaurant ordering system.
//!
//! This module provides abstractions for persistent storage of orders, cart
//! lines and people, supporting different backend implementations such as
//! in-memory or file-based storage.
//!
//! Backends work on raw bytes keyed by `namespace:id`. Multi-record changes go
//! through [`StorageInterface::commit`], which applies a list of guarded writes
//! all-or-nothing: if any precondition fails, nothing is written and the call
//! returns [`StorageError::Conflict`].

use async_trait::async_trait;
use restaurant_types::{ConfigSchema, ImplementationRegistry, StorageKey};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// How many times `next_id` retries after losing a race on a sequence.
const MAX_SEQUENCE_RETRIES: usize = 16;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// A requested item is not found.
	#[error("Not found")]
	NotFound,
	/// A write precondition did not hold; carries the offending key.
	#[error("Conflicting write on key: {0}")]
	Conflict(String),
	/// Serialization or deserialization failed.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The storage backend failed.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Configuration validation failed.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// What a single write does to its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteKind {
	Put(Vec<u8>),
	Delete,
}

/// Condition the current value of a key must satisfy for a batch to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
	/// No check.
	None,
	/// The key must exist.
	Exists,
	/// The key must not exist.
	Absent,
	/// The key must hold exactly these bytes.
	Equals(Vec<u8>),
}

impl Precondition {
	/// Checks the condition against the current value of a key.
	pub fn holds(&self, current: Option<&[u8]>) -> bool {
		match self {
			Precondition::None => true,
			Precondition::Exists => current.is_some(),
			Precondition::Absent => current.is_none(),
			Precondition::Equals(expected) => current == Some(expected.as_slice()),
		}
	}
}

/// One guarded write inside a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOp {
	pub key: String,
	pub kind: WriteKind,
	pub precondition: Precondition,
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the ordering system.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key, overwriting any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns every key starting with `prefix` together with its bytes,
	/// sorted by key.
	async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError>;

	/// Applies all operations atomically.
	///
	/// Every precondition is checked against the state before any write is
	/// made. If one fails, nothing is written and `Conflict(key)` is returned.
	async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

fn make_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

fn to_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
	serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
	serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// A value read from storage together with the exact bytes it was read from.
///
/// Passing a `Versioned` back into a [`WriteBatch`] guards the write on the
/// record being unchanged since it was read.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
	pub id: String,
	pub value: T,
	raw: Vec<u8>,
}

impl<T> Versioned<T> {
	pub fn into_value(self) -> T {
		self.value
	}
}

/// Builder for a set of guarded writes committed together.
#[derive(Debug, Default)]
pub struct WriteBatch {
	ops: Vec<WriteOp>,
}

impl WriteBatch {
	pub fn new() -> Self {
		Self::default()
	}

	fn push(&mut self, key: String, kind: WriteKind, precondition: Precondition) -> &mut Self {
		self.ops.push(WriteOp {
			key,
			kind,
			precondition,
		});
		self
	}

	/// Writes a new record; fails the batch if the key already exists.
	pub fn insert<T: Serialize>(
		&mut self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<&mut Self, StorageError> {
		let bytes = to_bytes(data)?;
		Ok(self.push(make_key(namespace, id), WriteKind::Put(bytes), Precondition::Absent))
	}

	/// Writes a record unconditionally.
	pub fn put<T: Serialize>(
		&mut self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<&mut Self, StorageError> {
		let bytes = to_bytes(data)?;
		Ok(self.push(make_key(namespace, id), WriteKind::Put(bytes), Precondition::None))
	}

	/// Replaces a record; fails the batch if it changed since `original` was read.
	pub fn replace<T, U: Serialize>(
		&mut self,
		namespace: &str,
		original: &Versioned<T>,
		data: &U,
	) -> Result<&mut Self, StorageError> {
		let bytes = to_bytes(data)?;
		Ok(self.push(
			make_key(namespace, &original.id),
			WriteKind::Put(bytes),
			Precondition::Equals(original.raw.clone()),
		))
	}

	/// Deletes a record; fails the batch if it changed or vanished since it was read.
	pub fn delete_exact<T>(&mut self, namespace: &str, original: &Versioned<T>) -> &mut Self {
		self.push(
			make_key(namespace, &original.id),
			WriteKind::Delete,
			Precondition::Equals(original.raw.clone()),
		)
	}

	/// Deletes a record if present.
	pub fn delete(&mut self, namespace: &str, id: &str) -> &mut Self {
		self.push(make_key(namespace, id), WriteKind::Delete, Precondition::None)
	}

	pub fn len(&self) -> usize {
		self.ops.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}

	pub fn into_ops(self) -> Vec<WriteOp> {
		self.ops
	}
}

/// High-level storage service that provides typed operations.
///
/// Wraps a low-level storage backend and stores values as JSON.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable value, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes = to_bytes(data)?;
		self.backend.set_bytes(&make_key(namespace, id), bytes).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&make_key(namespace, id)).await?;
		from_bytes(&bytes)
	}

	/// Retrieves a value together with the bytes it was read from.
	pub async fn retrieve_versioned<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Versioned<T>, StorageError> {
		let raw = self.backend.get_bytes(&make_key(namespace, id)).await?;
		Ok(Versioned {
			id: id.to_string(),
			value: from_bytes(&raw)?,
			raw,
		})
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&make_key(namespace, id)).await
	}

	/// Updates an existing value in storage.
	///
	/// Returns `NotFound` if the key doesn't exist, unlike `store` which
	/// creates or overwrites.
	pub async fn update<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = make_key(namespace, id);
		let op = WriteOp {
			key: key.clone(),
			kind: WriteKind::Put(to_bytes(data)?),
			precondition: Precondition::Exists,
		};
		match self.backend.commit(vec![op]).await {
			Err(StorageError::Conflict(_)) => Err(StorageError::NotFound),
			other => other,
		}
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&make_key(namespace, id)).await
	}

	/// Lists every value in a namespace, ordered by id.
	pub async fn list<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, StorageError> {
		Ok(self
			.list_versioned(namespace)
			.await?
			.into_iter()
			.map(Versioned::into_value)
			.collect())
	}

	/// Lists every value in a namespace with the bytes each was read from.
	pub async fn list_versioned<T: DeserializeOwned>(
		&self,
		namespace: &str,
	) -> Result<Vec<Versioned<T>>, StorageError> {
		let prefix = make_key(namespace, "");
		self.backend
			.list(&prefix)
			.await?
			.into_iter()
			.map(|(key, raw)| {
				let id = key.strip_prefix(&prefix).unwrap_or(&key).to_string();
				Ok(Versioned {
					id,
					value: from_bytes(&raw)?,
					raw,
				})
			})
			.collect()
	}

	/// Applies a batch atomically.
	pub async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
		if batch.is_empty() {
			return Ok(());
		}
		debug!(operations = batch.len(), "Committing write batch");
		self.backend.commit(batch.into_ops()).await
	}

	/// Returns the next value of a named sequence, starting at 1.
	///
	/// Concurrent callers never receive the same value.
	pub async fn next_id(&self, sequence: &str) -> Result<u64, StorageError> {
		let namespace = StorageKey::Sequences.as_str();
		for _ in 0..MAX_SEQUENCE_RETRIES {
			let current = match self.retrieve_versioned::<u64>(namespace, sequence).await {
				Ok(current) => Some(current),
				Err(StorageError::NotFound) => None,
				Err(e) => return Err(e),
			};

			let mut batch = WriteBatch::new();
			let next = match &current {
				Some(current) => {
					let next = current.value + 1;
					batch.replace(namespace, current, &next)?;
					next
				},
				None => {
					batch.insert(namespace, sequence, &1u64)?;
					1
				},
			};

			match self.commit(batch).await {
				Ok(()) => return Ok(next),
				Err(StorageError::Conflict(key)) => {
					debug!(%key, "Sequence advanced concurrently, retrying");
				},
				Err(e) => return Err(e),
			}
		}
		Err(StorageError::Conflict(make_key(namespace, sequence)))
	}
}
