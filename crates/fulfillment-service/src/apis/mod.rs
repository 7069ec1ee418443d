//! Request processing for the fulfillment API endpoints.

pub mod shipment;
pub mod tracking;
pub mod transitions;

use fulfillment_core::FulfillmentError;
use fulfillment_types::APIError;
use serde_json::json;

/// Maps an engine error onto the HTTP error contract.
pub fn api_error(error: FulfillmentError) -> APIError {
	match error {
		FulfillmentError::Authentication(message) => APIError::Unauthorized { message },
		FulfillmentError::Authorization => APIError::Forbidden {
			message: "Not authorized to act on this order".into(),
		},
		FulfillmentError::NotFound(message) => APIError::NotFound {
			error_type: "NOT_FOUND".into(),
			message,
		},
		FulfillmentError::DuplicateRequest { tracking_id } => APIError::Conflict {
			error_type: "ALREADY_SHIPPED".into(),
			message: "A shipment already exists for this order".into(),
			details: Some(json!({ "trackingId": tracking_id })),
		},
		FulfillmentError::InvalidState(message) => APIError::BadRequest {
			error_type: "INVALID_STATE".into(),
			message,
			details: None,
		},
		FulfillmentError::Validation(message) => validation_error(message),
		FulfillmentError::CarrierTransport {
			reference_no,
			message,
			raw_response,
		} => carrier_error("CARRIER_TRANSPORT_ERROR", reference_no, message, raw_response),
		FulfillmentError::CarrierBusiness {
			reference_no,
			message,
			raw_response,
		} => carrier_error("CARRIER_REJECTED", reference_no, message, raw_response),
		FulfillmentError::NotImplemented(message) => APIError::NotImplemented { message },
		FulfillmentError::Internal(message) => {
			tracing::error!(error = %message, "Request failed with internal error");
			APIError::InternalServerError
		},
	}
}

/// A malformed or incomplete request.
pub fn validation_error(message: impl Into<String>) -> APIError {
	APIError::BadRequest {
		error_type: "VALIDATION_ERROR".into(),
		message: message.into(),
		details: None,
	}
}

fn carrier_error(
	error_type: &str,
	reference_no: String,
	message: String,
	raw_response: serde_json::Value,
) -> APIError {
	APIError::BadRequest {
		error_type: error_type.into(),
		message,
		details: Some(json!({
			"shippingReferenceNo": reference_no,
			"carrierResponse": raw_response,
		})),
	}
}
