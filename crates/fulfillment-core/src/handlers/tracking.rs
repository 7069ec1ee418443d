//! Tracking lookups.
//!
//! Tracking is a projection of the carrier record stored on the order at
//! shipment creation. The carrier is not contacted.

use super::load_authorized;
use crate::policy::AuthorizationPolicy;
use crate::repository::OrderRepository;
use crate::FulfillmentError;
use fulfillment_types::{truncate_id, AuthContext, TrackingQuery, TrackingResponse};
use std::sync::Arc;
use tracing::instrument;

/// Read-only access to stored carrier records.
pub struct TrackingService {
	orders: Arc<dyn OrderRepository>,
	policy: Arc<AuthorizationPolicy>,
}

impl TrackingService {
	pub fn new(orders: Arc<dyn OrderRepository>, policy: Arc<AuthorizationPolicy>) -> Self {
		Self { orders, policy }
	}

	/// Resolves a tracking query.
	///
	/// Only lookups by order id are supported; direct lookups by tracking id
	/// or reference number are reserved.
	pub async fn lookup(
		&self,
		caller: &AuthContext,
		query: &TrackingQuery,
	) -> Result<TrackingResponse, FulfillmentError> {
		let non_blank = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

		if let Some(order_id) = query.order_id.as_deref().filter(|s| !s.trim().is_empty()) {
			return self.get_tracking(caller, order_id).await;
		}
		if non_blank(&query.tracking_id) || non_blank(&query.shipping_reference_no) {
			return Err(FulfillmentError::NotImplemented(
				"Lookup by trackingId or shippingReferenceNo is not supported yet".into(),
			));
		}
		Err(FulfillmentError::Validation(
			"One of orderId, trackingId or shippingReferenceNo is required".into(),
		))
	}

	/// Returns the carrier record stored on `order_id`.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn get_tracking(
		&self,
		caller: &AuthContext,
		order_id: &str,
	) -> Result<TrackingResponse, FulfillmentError> {
		let (order, _) =
			load_authorized(self.orders.as_ref(), &self.policy, caller, order_id).await?;

		let Some(tracking_id) = order.tracking_id().map(str::to_string) else {
			return Err(FulfillmentError::NotFound(format!(
				"No shipment has been created for order {}",
				order_id
			)));
		};
		let Some(record) = order.shipping_info.carrier else {
			return Err(FulfillmentError::Internal(
				"tracking id without carrier record".into(),
			));
		};

		Ok(TrackingResponse {
			tracking_id,
			shipping_reference_no: record.shipping_reference_no,
			total_shipping_amount: record.total_shipping_amount,
			requested_at: record.requested_at,
			pickup_schedule: record.pickup_schedule,
			carrier_response: record.response,
		})
	}
}
