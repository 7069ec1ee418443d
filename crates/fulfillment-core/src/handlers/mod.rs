//! Handlers for the fulfillment operations.
//!
//! Each handler owns one use case and shares the order lookup and
//! authorization step defined here.

pub mod shipment;
pub mod tracking;
pub mod transition;

pub use shipment::ShipmentOrchestrator;
pub use tracking::TrackingService;
pub use transition::TransitionHandler;

use crate::policy::{Access, AuthorizationPolicy};
use crate::repository::OrderRepository;
use crate::FulfillmentError;
use fulfillment_types::{AuthContext, Order};

/// Loads an order the caller is allowed to act on.
///
/// Callers without the admin claim get `Authorization` for unknown orders
/// too, so the response does not reveal which order ids exist.
pub(crate) async fn load_authorized(
	orders: &dyn OrderRepository,
	policy: &AuthorizationPolicy,
	caller: &AuthContext,
	order_id: &str,
) -> Result<(Order, Access), FulfillmentError> {
	if order_id.trim().is_empty() {
		return Err(FulfillmentError::Validation("orderId is required".into()));
	}

	let Some(order) = orders.find(order_id).await? else {
		return Err(if caller.is_admin() {
			FulfillmentError::NotFound(format!("Order {} not found", order_id))
		} else {
			FulfillmentError::Authorization
		});
	};

	let access = policy.access(caller, &order).await;
	if !access.is_granted() {
		return Err(FulfillmentError::Authorization);
	}
	Ok((order, access))
}

#[cfg(test)]
pub(crate) mod test_support {
	//! In-memory fakes of the persistence seams.

	use crate::repository::{
		OrderMutation, OrderRepository, ProfileDirectory, RepositoryError,
	};
	use async_trait::async_trait;
	use fulfillment_types::{AuthContext, Order, SellerProfile, UserProfile};
	use serde_json::json;
	use std::collections::HashMap;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	use std::sync::Mutex;

	#[derive(Default)]
	pub struct FakeOrders {
		pub orders: Mutex<HashMap<String, Order>>,
		pub fail_updates: AtomicBool,
		pub updates: AtomicUsize,
	}

	impl FakeOrders {
		pub fn with(orders: impl IntoIterator<Item = Order>) -> Self {
			let fake = Self::default();
			fake.orders
				.lock()
				.unwrap()
				.extend(orders.into_iter().map(|o| (o.id.clone(), o)));
			fake
		}

		pub fn get(&self, id: &str) -> Order {
			self.orders.lock().unwrap()[id].clone()
		}
	}

	#[async_trait]
	impl OrderRepository for FakeOrders {
		async fn find(&self, order_id: &str) -> Result<Option<Order>, RepositoryError> {
			Ok(self.orders.lock().unwrap().get(order_id).cloned())
		}

		async fn update(
			&self,
			order_id: &str,
			mutation: OrderMutation,
		) -> Result<Order, RepositoryError> {
			self.updates.fetch_add(1, Ordering::SeqCst);
			if self.fail_updates.load(Ordering::SeqCst) {
				return Err(RepositoryError::Storage("store unavailable".into()));
			}
			let mut orders = self.orders.lock().unwrap();
			let mut order = orders
				.get(order_id)
				.cloned()
				.ok_or_else(|| RepositoryError::NotFound(order_id.into()))?;
			mutation(&mut order)?;
			orders.insert(order_id.into(), order.clone());
			Ok(order)
		}
	}

	#[derive(Default)]
	pub struct FakeProfiles {
		pub sellers: HashMap<String, SellerProfile>,
		pub users: HashMap<String, UserProfile>,
	}

	#[async_trait]
	impl ProfileDirectory for FakeProfiles {
		async fn seller(&self, id: &str) -> Result<Option<SellerProfile>, RepositoryError> {
			Ok(self.sellers.get(id).cloned())
		}

		async fn user(&self, id: &str) -> Result<Option<UserProfile>, RepositoryError> {
			Ok(self.users.get(id).cloned())
		}
	}

	pub fn order(id: &str, status: &str) -> Order {
		serde_json::from_value(json!({
			"id": id,
			"status": status,
			"ownerId": "buyer-1",
			"sellerIds": ["seller-1"],
			"items": [{ "name": "Mug", "quantity": 1, "unitPrice": "150" }],
			"shippingInfo": {
				"recipientName": "Ana Cruz",
				"address": "123 Main St, Brgy. San Isidro",
				"city": "Makati",
				"phone": "09171111111"
			},
			"paymentInfo": { "method": "cod" },
			"summary": { "total": "150" }
		}))
		.unwrap()
	}

	pub fn seller_profile() -> SellerProfile {
		serde_json::from_value(json!({
			"id": "seller-1",
			"ownerUserId": "seller-user",
			"email": "shop@example.com",
			"storeName": "Mug Shop",
			"phone": "09173333333",
			"address": { "line": "8 Kalye St, Brgy. Ugong", "city": "Pasig" }
		}))
		.unwrap()
	}

	pub fn profiles() -> FakeProfiles {
		let mut profiles = FakeProfiles::default();
		profiles.sellers.insert("seller-1".into(), seller_profile());
		profiles
	}

	pub fn caller(subject: &str) -> AuthContext {
		AuthContext {
			subject_id: subject.into(),
			email: None,
			roles: vec![],
			admin: false,
		}
	}

	pub fn admin() -> AuthContext {
		AuthContext {
			admin: true,
			..caller("ops-1")
		}
	}
}
