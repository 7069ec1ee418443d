//! Shipment creation endpoint.
//!
//! Validates the request body and hands it to the engine's orchestrator.

use super::{api_error, validation_error};
use fulfillment_core::FulfillmentEngine;
use fulfillment_types::{
	truncate_id, APIError, AuthContext, CreateShipmentRequest, CreateShipmentResponse,
};
use tracing::info;

/// Processes a POST /api/shipments request for an authenticated caller.
pub async fn process_create_shipment(
	engine: &FulfillmentEngine,
	caller: &AuthContext,
	request: CreateShipmentRequest,
) -> Result<CreateShipmentResponse, APIError> {
	let order_id = request.order_id.trim();
	if order_id.is_empty() {
		return Err(validation_error("orderId is required"));
	}

	info!(order_id = %truncate_id(order_id), "Creating shipment");
	engine
		.create_shipment(caller, order_id, &request.overrides)
		.await
		.map_err(api_error)
}
