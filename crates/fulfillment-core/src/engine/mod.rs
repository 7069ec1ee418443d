//! Fulfillment engine.
//!
//! Holds the configured services and the three operation handlers, and is
//! the single entry point used by the HTTP layer.

use crate::handlers::{ShipmentOrchestrator, TrackingService, TransitionHandler};
use crate::policy::AuthorizationPolicy;
use crate::repository::{
	OrderRepository, ProfileDirectory, StorageOrderRepository, StorageProfileDirectory,
};
use crate::{state, FulfillmentError};
use fulfillment_auth::AuthService;
use fulfillment_carrier::CarrierService;
use fulfillment_config::Config;
use fulfillment_shipment::{ReferenceGenerator, ShipmentRequestBuilder};
use fulfillment_storage::StorageService;
use fulfillment_types::{
	AuthContext, CreateShipmentResponse, FulfillmentAction, ShipmentOverrides, TrackingQuery,
	TrackingResponse, TransitionResponse, TransitionRule,
};
use std::sync::Arc;

/// Configured fulfillment engine.
#[derive(Clone)]
pub struct FulfillmentEngine {
	config: Config,
	storage: Arc<StorageService>,
	auth: Arc<AuthService>,
	shipments: Arc<ShipmentOrchestrator>,
	tracking: Arc<TrackingService>,
	transitions: Arc<TransitionHandler>,
}

impl FulfillmentEngine {
	/// Creates an engine whose orders and profiles live in `storage`.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		auth: Arc<AuthService>,
		carrier: Arc<CarrierService>,
	) -> Self {
		let orders: Arc<dyn OrderRepository> =
			Arc::new(StorageOrderRepository::new(storage.clone()));
		let profiles: Arc<dyn ProfileDirectory> =
			Arc::new(StorageProfileDirectory::new(storage.clone()));
		let policy = Arc::new(AuthorizationPolicy::new(profiles.clone()));

		let shipment = &config.shipment;
		let shipments = Arc::new(ShipmentOrchestrator::new(
			orders.clone(),
			profiles,
			policy.clone(),
			carrier,
			ShipmentRequestBuilder::from_config(shipment),
			ReferenceGenerator::new(shipment.reference_prefix.clone()),
			shipment.allowed_statuses.clone(),
		));
		let tracking = Arc::new(TrackingService::new(orders.clone(), policy.clone()));
		let transitions = Arc::new(TransitionHandler::new(orders, policy));

		Self {
			config,
			storage,
			auth,
			shipments,
			tracking,
			transitions,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The backing store, for seeding and inspection.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Resolves an `Authorization` header value into a caller identity.
	pub async fn authenticate(&self, header: Option<&str>) -> Result<AuthContext, FulfillmentError> {
		Ok(self.auth.resolve(header).await?)
	}

	pub async fn create_shipment(
		&self,
		caller: &AuthContext,
		order_id: &str,
		overrides: &ShipmentOverrides,
	) -> Result<CreateShipmentResponse, FulfillmentError> {
		self.shipments
			.create_shipment(caller, order_id, overrides)
			.await
	}

	pub async fn get_tracking(
		&self,
		caller: &AuthContext,
		query: &TrackingQuery,
	) -> Result<TrackingResponse, FulfillmentError> {
		self.tracking.lookup(caller, query).await
	}

	pub async fn transition_order(
		&self,
		caller: &AuthContext,
		order_id: &str,
		action: FulfillmentAction,
		note: Option<String>,
	) -> Result<TransitionResponse, FulfillmentError> {
		self.transitions
			.transition(caller, order_id, action, note)
			.await
	}

	/// The fulfillment transition table.
	pub fn transition_rules(&self) -> Vec<TransitionRule> {
		state::rules()
	}
}
