//! Carrier shipment orchestration.
//!
//! Creating a shipment runs authorize, idempotency check, state check,
//! request build and the carrier call in that order. Nothing is written to
//! the order unless the carrier accepted the shipment. Once it did, the
//! shipment exists whatever happens locally, so a failure to record it is
//! logged and the caller still gets the carrier's answer.

use super::load_authorized;
use crate::policy::{Access, AuthorizationPolicy};
use crate::repository::{OrderMutation, OrderRepository, ProfileDirectory, RepositoryError};
use crate::state;
use crate::FulfillmentError;
use chrono::Utc;
use fulfillment_carrier::{CarrierError, CarrierService};
use fulfillment_shipment::{BuildInput, ReferenceGenerator, ShipmentRequestBuilder};
use fulfillment_types::{
	truncate_id, AuthContext, CarrierShipmentRecord, CreateShipmentResponse, Order, OrderStatus,
	SellerProfile, ShipmentOverrides, UserProfile,
};
use std::sync::Arc;
use tracing::{instrument, Instrument};

/// Coordinates shipment creation for an order.
pub struct ShipmentOrchestrator {
	orders: Arc<dyn OrderRepository>,
	profiles: Arc<dyn ProfileDirectory>,
	policy: Arc<AuthorizationPolicy>,
	carrier: Arc<CarrierService>,
	builder: ShipmentRequestBuilder,
	references: ReferenceGenerator,
	/// Statuses from which a shipment may be created.
	allowed_statuses: Vec<OrderStatus>,
}

impl ShipmentOrchestrator {
	pub fn new(
		orders: Arc<dyn OrderRepository>,
		profiles: Arc<dyn ProfileDirectory>,
		policy: Arc<AuthorizationPolicy>,
		carrier: Arc<CarrierService>,
		builder: ShipmentRequestBuilder,
		references: ReferenceGenerator,
		allowed_statuses: Vec<OrderStatus>,
	) -> Self {
		Self {
			orders,
			profiles,
			policy,
			carrier,
			builder,
			references,
			allowed_statuses,
		}
	}

	/// Creates a carrier shipment for `order_id`.
	///
	/// Carrier failures are returned with the generated reference number and
	/// leave the order unchanged, so the attempt can be retried.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn create_shipment(
		&self,
		caller: &AuthContext,
		order_id: &str,
		overrides: &ShipmentOverrides,
	) -> Result<CreateShipmentResponse, FulfillmentError> {
		let (order, access) =
			load_authorized(self.orders.as_ref(), &self.policy, caller, order_id).await?;

		if let Some(tracking_id) = order.tracking_id() {
			return Err(FulfillmentError::DuplicateRequest {
				tracking_id: tracking_id.to_string(),
			});
		}

		if !self.allowed_statuses.contains(&order.status) {
			return Err(FulfillmentError::InvalidState(format!(
				"Order status '{}' does not allow shipment creation",
				order.status
			)));
		}

		let (buyer, seller) = self.resolve_profiles(&order, access).await;

		let reference_no = self.references.next(&order.id);
		let request = self
			.builder
			.build(BuildInput {
				order: &order,
				overrides,
				buyer: buyer.as_ref(),
				seller: seller.as_ref(),
				reference_no: &reference_no,
			})
			.map_err(|e| FulfillmentError::Validation(e.to_string()))?;

		// The carrier call and the record write run detached from the request,
		// so a dropped request cannot abandon a shipment the carrier accepted.
		let carrier = self.carrier.clone();
		let orders = self.orders.clone();
		let order_id = order.id.clone();
		let record_reference = reference_no.clone();
		let handover = tokio::spawn(
			async move {
				let result = carrier.create_shipment(&request).await?;
				let record = CarrierShipmentRecord {
					tracking_id: Some(result.tracking_id.clone()),
					shipping_reference_no: record_reference,
					total_shipping_amount: result.total_shipping_amount,
					requested_at: Utc::now(),
					pickup_schedule: request.requested_pickup_schedule.clone(),
					response: result.raw_response.clone(),
				};
				record_shipment(orders.as_ref(), &order_id, record).await;
				Ok::<_, CarrierError>(result)
			}
			.in_current_span(),
		);

		let result = handover
			.await
			.map_err(|e| FulfillmentError::Internal(format!("shipment task failed: {}", e)))?
			.map_err(|e| carrier_failure(e, &reference_no))?;

		Ok(CreateShipmentResponse {
			success: true,
			shipping_reference_no: reference_no,
			tracking_id: result.tracking_id,
			total_shipping_amount: result.total_shipping_amount,
			carrier_response: result.raw_response,
		})
	}

	/// Fetches the buyer's profile and the shipping seller's profile.
	///
	/// A seller caller ships their own store's items; otherwise the order's
	/// first seller ships. Lookup failures only degrade field resolution.
	async fn resolve_profiles(
		&self,
		order: &Order,
		access: Access,
	) -> (Option<UserProfile>, Option<SellerProfile>) {
		let buyer = async {
			match self.profiles.user(&order.owner_id).await {
				Ok(profile) => profile,
				Err(e) => {
					tracing::warn!(error = %e, "Buyer profile lookup failed");
					None
				},
			}
		};

		let seller = async move {
			if let Access::Seller(profile) = access {
				return Some(profile);
			}
			let seller_id = order.seller_ids.first()?;
			match self.profiles.seller(seller_id).await {
				Ok(profile) => profile,
				Err(e) => {
					tracing::warn!(
						seller_id = %truncate_id(seller_id),
						error = %e,
						"Seller profile lookup failed"
					);
					None
				},
			}
		};

		futures::join!(buyer, seller)
	}
}

/// Writes the carrier record and moves the order to `shipping`.
///
/// Failures are logged only. The write is refused if another attempt
/// recorded a shipment first.
async fn record_shipment(
	orders: &dyn OrderRepository,
	order_id: &str,
	record: CarrierShipmentRecord,
) {
	let tracking_id = record.tracking_id.clone().unwrap_or_default();
	let reference_no = record.shipping_reference_no.clone();

	let log_order_id = order_id.to_string();
	let note = format!("Handed over to carrier, tracking id {}", tracking_id);
	let mutation: OrderMutation = Box::new(move |order| {
		if let Some(existing) = order.tracking_id() {
			return Err(RepositoryError::Conflict {
				tracking_id: existing.to_string(),
			});
		}
		order.shipping_info.carrier = Some(record);

		if let Err(e) = state::advance_to_shipping(order, &note, Utc::now()) {
			tracing::warn!(
				order_id = %truncate_id(&log_order_id),
				error = %e,
				"Shipment recorded without status change"
			);
		}
		Ok(())
	});

	match orders.update(order_id, mutation).await {
		Ok(order) => tracing::info!(
			tracking_id = %tracking_id,
			status = %order.status,
			"Shipment recorded"
		),
		Err(e) => tracing::error!(
			tracking_id = %tracking_id,
			reference_no = %reference_no,
			error = %e,
			"Carrier shipment created but not recorded on the order"
		),
	}
}

fn carrier_failure(error: CarrierError, reference_no: &str) -> FulfillmentError {
	let raw_response = error.raw_response();
	match error {
		CarrierError::Transport { message, .. } => FulfillmentError::CarrierTransport {
			reference_no: reference_no.to_string(),
			message,
			raw_response,
		},
		CarrierError::Business { message, .. } => FulfillmentError::CarrierBusiness {
			reference_no: reference_no.to_string(),
			message,
			raw_response,
		},
		CarrierError::Configuration(message) => FulfillmentError::Internal(message),
	}
}
