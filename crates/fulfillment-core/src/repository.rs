//! Order and profile persistence seams.
//!
//! The orchestrator only talks to the store through [`OrderRepository`] and
//! [`ProfileDirectory`], which lets tests substitute in-memory fakes. The
//! storage-backed implementations read orders from the current collection
//! first and fall back to the legacy one.

use crate::state::TransitionError;
use async_trait::async_trait;
use fulfillment_storage::{StorageError, StorageService};
use fulfillment_types::{Order, SellerProfile, StorageKey, UserProfile};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur while reading or writing orders and profiles.
#[derive(Debug, Error)]
pub enum RepositoryError {
	#[error("Order not found: {0}")]
	NotFound(String),
	/// A shipment was recorded concurrently.
	#[error("Order already has tracking id {tracking_id}")]
	Conflict { tracking_id: String },
	/// The mutation refused to apply.
	#[error(transparent)]
	Rejected(#[from] TransitionError),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StorageError> for RepositoryError {
	fn from(e: StorageError) -> Self {
		RepositoryError::Storage(e.to_string())
	}
}

/// Mutation applied by [`OrderRepository::update`].
///
/// Returning an error leaves the stored order untouched.
pub type OrderMutation = Box<dyn FnOnce(&mut Order) -> Result<(), RepositoryError> + Send>;

/// Access to the order store.
#[async_trait]
pub trait OrderRepository: Send + Sync {
	/// Looks the order up in every known collection.
	async fn find(&self, order_id: &str) -> Result<Option<Order>, RepositoryError>;

	/// Atomically reads the order, applies `mutation` and writes the result
	/// back to the collection it was read from.
	///
	/// No other update of the same store interleaves between the read and
	/// the write, so a mutation can act as a write guard.
	async fn update(&self, order_id: &str, mutation: OrderMutation)
		-> Result<Order, RepositoryError>;
}

/// Read-only access to buyer and seller profiles.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
	async fn seller(&self, seller_id: &str) -> Result<Option<SellerProfile>, RepositoryError>;

	async fn user(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError>;
}

/// Order repository over the typed storage service.
pub struct StorageOrderRepository {
	storage: Arc<StorageService>,
	/// Serializes read-modify-write cycles.
	write_lock: Mutex<()>,
}

impl StorageOrderRepository {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
		}
	}

	async fn locate(&self, order_id: &str) -> Result<Option<(Order, StorageKey)>, RepositoryError> {
		for collection in StorageKey::order_collections() {
			if let Some(order) = self.storage.find::<Order>(collection, order_id).await? {
				return Ok(Some((order, collection)));
			}
		}
		Ok(None)
	}
}

#[async_trait]
impl OrderRepository for StorageOrderRepository {
	async fn find(&self, order_id: &str) -> Result<Option<Order>, RepositoryError> {
		Ok(self.locate(order_id).await?.map(|(order, _)| order))
	}

	async fn update(
		&self,
		order_id: &str,
		mutation: OrderMutation,
	) -> Result<Order, RepositoryError> {
		let _guard = self.write_lock.lock().await;

		let (mut order, collection) = self
			.locate(order_id)
			.await?
			.ok_or_else(|| RepositoryError::NotFound(order_id.to_string()))?;

		mutation(&mut order)?;
		order.updated_at = Some(chrono::Utc::now());

		self.storage.update(collection, order_id, &order).await?;
		tracing::debug!(
			order_id = %fulfillment_types::truncate_id(order_id),
			collection = collection.as_str(),
			status = %order.status,
			"Order updated"
		);
		Ok(order)
	}
}

/// Profile directory over the typed storage service.
pub struct StorageProfileDirectory {
	storage: Arc<StorageService>,
}

impl StorageProfileDirectory {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}
}

#[async_trait]
impl ProfileDirectory for StorageProfileDirectory {
	async fn seller(&self, seller_id: &str) -> Result<Option<SellerProfile>, RepositoryError> {
		Ok(self.storage.find(StorageKey::Sellers, seller_id).await?)
	}

	async fn user(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError> {
		Ok(self.storage.find(StorageKey::Users, user_id).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_storage::implementations::memory::MemoryStorage;
	use fulfillment_types::OrderStatus;
	use serde_json::json;

	fn order(id: &str) -> Order {
		serde_json::from_value(json!({
			"id": id,
			"status": "confirmed",
			"ownerId": "buyer-1"
		}))
		.unwrap()
	}

	fn storage() -> Arc<StorageService> {
		Arc::new(StorageService::new(Box::new(MemoryStorage::new())))
	}

	#[tokio::test]
	async fn test_legacy_order_written_back_in_place() {
		let storage = storage();
		storage
			.store(StorageKey::LegacyOrders, "old-1", &order("old-1"))
			.await
			.unwrap();
		let repository = StorageOrderRepository::new(storage.clone());

		let updated = repository
			.update(
				"old-1",
				Box::new(|order| {
					order.status = OrderStatus::ToShip;
					Ok(())
				}),
			)
			.await
			.unwrap();

		assert_eq!(updated.status, OrderStatus::ToShip);
		assert!(!storage.exists(StorageKey::Orders, "old-1").await.unwrap());
		let stored: Order = storage.retrieve(StorageKey::LegacyOrders, "old-1").await.unwrap();
		assert_eq!(stored.status, OrderStatus::ToShip);
	}

	#[tokio::test]
	async fn test_current_collection_wins() {
		let storage = storage();
		let mut current = order("ord-1");
		current.status = OrderStatus::ToShip;
		storage.store(StorageKey::Orders, "ord-1", &current).await.unwrap();
		storage
			.store(StorageKey::LegacyOrders, "ord-1", &order("ord-1"))
			.await
			.unwrap();

		let repository = StorageOrderRepository::new(storage);
		let found = repository.find("ord-1").await.unwrap().unwrap();
		assert_eq!(found.status, OrderStatus::ToShip);
		assert!(repository.find("missing").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_rejected_mutation_leaves_order_untouched() {
		let storage = storage();
		storage.store(StorageKey::Orders, "ord-1", &order("ord-1")).await.unwrap();
		let repository = StorageOrderRepository::new(storage);

		let result = repository
			.update(
				"ord-1",
				Box::new(|order| {
					order.status = OrderStatus::Shipping;
					Err(RepositoryError::Conflict {
						tracking_id: "TRK1".into(),
					})
				}),
			)
			.await;

		assert!(matches!(result, Err(RepositoryError::Conflict { .. })));
		let stored = repository.find("ord-1").await.unwrap().unwrap();
		assert_eq!(stored.status, OrderStatus::Confirmed);
	}

	#[tokio::test]
	async fn test_update_missing_order() {
		let repository = StorageOrderRepository::new(storage());
		let result = repository.update("nope", Box::new(|_| Ok(()))).await;
		assert!(matches!(result, Err(RepositoryError::NotFound(id)) if id == "nope"));
	}
}
