//! Storage module for the fulfillment service.
//!
//! This module provides a byte-level key/value abstraction over the document
//! store that holds orders and profiles, plus a typed service that namespaces
//! keys by collection and serializes records as JSON.

use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ImplementationRegistry, StorageKey};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface for storage backends.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples used by the service to map
/// `[storage.implementations.<name>]` to a backend.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

fn storage_key(collection: StorageKey, id: &str) -> String {
	format!("{}:{}", collection.as_str(), id)
}

/// Typed storage operations over a backend.
///
/// Records are addressed by collection and id and stored as JSON.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a record, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		collection: StorageKey,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&storage_key(collection, id), bytes).await
	}

	/// Retrieves and deserializes a record.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		collection: StorageKey,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&storage_key(collection, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Like [`retrieve`](Self::retrieve) but maps a missing record to `None`.
	pub async fn find<T: DeserializeOwned>(
		&self,
		collection: StorageKey,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(collection, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Overwrites an existing record.
	///
	/// Unlike [`store`](Self::store) this fails with `NotFound` when the
	/// record does not exist yet.
	pub async fn update<T: Serialize>(
		&self,
		collection: StorageKey,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = storage_key(collection, id);
		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}

		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key, bytes).await
	}

	pub async fn exists(&self, collection: StorageKey, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&storage_key(collection, id)).await
	}

	pub async fn remove(&self, collection: StorageKey, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&storage_key(collection, id)).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, Serialize, Deserialize, PartialEq)]
	struct Record {
		name: String,
	}

	#[tokio::test]
	async fn test_collections_are_separate_namespaces() {
		let storage = StorageService::new(Box::new(MemoryStorage::new()));
		let record = Record {
			name: "current".into(),
		};

		storage
			.store(StorageKey::Orders, "ord-1", &record)
			.await
			.unwrap();

		assert!(storage.exists(StorageKey::Orders, "ord-1").await.unwrap());
		assert!(!storage
			.exists(StorageKey::LegacyOrders, "ord-1")
			.await
			.unwrap());
		let legacy: Option<Record> = storage
			.find(StorageKey::LegacyOrders, "ord-1")
			.await
			.unwrap();
		assert!(legacy.is_none());
	}

	#[tokio::test]
	async fn test_update_requires_existing_record() {
		let storage = StorageService::new(Box::new(MemoryStorage::new()));
		let record = Record {
			name: "seller".into(),
		};

		let result = storage.update(StorageKey::Sellers, "s-1", &record).await;
		assert!(matches!(result, Err(StorageError::NotFound)));

		storage
			.store(StorageKey::Sellers, "s-1", &record)
			.await
			.unwrap();
		let updated = Record {
			name: "renamed".into(),
		};
		storage
			.update(StorageKey::Sellers, "s-1", &updated)
			.await
			.unwrap();

		let loaded: Record = storage.retrieve(StorageKey::Sellers, "s-1").await.unwrap();
		assert_eq!(loaded, updated);
	}

	#[tokio::test]
	async fn test_corrupt_record_is_serialization_error() {
		let backend = MemoryStorage::new();
		backend
			.set_bytes("users:u-1", b"not json".to_vec())
			.await
			.unwrap();
		let storage = StorageService::new(Box::new(backend));

		let result: Result<Record, _> = storage.retrieve(StorageKey::Users, "u-1").await;
		assert!(matches!(result, Err(StorageError::Serialization(_))));
	}
}
