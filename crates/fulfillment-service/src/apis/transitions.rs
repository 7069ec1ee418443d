//! Fulfillment stage endpoints.

use super::{api_error, validation_error};
use fulfillment_core::FulfillmentEngine;
use fulfillment_types::{
	APIError, AuthContext, TransitionRequest, TransitionResponse, TransitionRule,
};

/// Processes a POST /api/orders/{id}/transitions request.
pub async fn process_transition(
	engine: &FulfillmentEngine,
	caller: &AuthContext,
	order_id: &str,
	request: TransitionRequest,
) -> Result<TransitionResponse, APIError> {
	if order_id.trim().is_empty() {
		return Err(validation_error("order id is required"));
	}
	let note = request.note.filter(|note| !note.trim().is_empty());

	engine
		.transition_order(caller, order_id, request.action, note)
		.await
		.map_err(api_error)
}

/// The transition table, as served by GET /api/fulfillment/stages.
pub fn transition_table(engine: &FulfillmentEngine) -> Vec<TransitionRule> {
	engine.transition_rules()
}
