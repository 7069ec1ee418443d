//! Tracking lookup endpoint.

use super::api_error;
use fulfillment_core::FulfillmentEngine;
use fulfillment_types::{APIError, AuthContext, TrackingQuery, TrackingResponse};

/// Processes a GET or POST /api/tracking request.
///
/// Identifier selection and the unsupported lookup modes are decided by the
/// engine, so both verbs behave the same.
pub async fn process_tracking_query(
	engine: &FulfillmentEngine,
	caller: &AuthContext,
	query: TrackingQuery,
) -> Result<TrackingResponse, APIError> {
	engine.get_tracking(caller, &query).await.map_err(api_error)
}
