//! API types for the fulfillment HTTP API.
//!
//! This module defines the request and response bodies of the shipment,
//! tracking and stage-transition endpoints, and the structured error type
//! every handler returns.

use crate::{FulfillmentAction, FulfillmentStage, OrderStatus, ShipmentOverrides};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /shipments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentRequest {
	pub order_id: String,
	#[serde(flatten)]
	pub overrides: ShipmentOverrides,
}

/// Successful shipment creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentResponse {
	pub success: bool,
	pub shipping_reference_no: String,
	pub tracking_id: String,
	#[serde(with = "rust_decimal::serde::float")]
	pub total_shipping_amount: Decimal,
	pub carrier_response: serde_json::Value,
}

/// Query or body of `/tracking`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingQuery {
	#[serde(default)]
	pub order_id: Option<String>,
	#[serde(default)]
	pub tracking_id: Option<String>,
	#[serde(default)]
	pub shipping_reference_no: Option<String>,
}

/// Projection of a stored carrier record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResponse {
	pub tracking_id: String,
	pub shipping_reference_no: String,
	#[serde(with = "rust_decimal::serde::float")]
	pub total_shipping_amount: Decimal,
	pub requested_at: DateTime<Utc>,
	pub pickup_schedule: Option<String>,
	pub carrier_response: serde_json::Value,
}

/// Body of `POST /orders/{id}/transitions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
	pub action: FulfillmentAction,
	#[serde(default)]
	pub note: Option<String>,
}

/// Order status after a transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
	pub order_id: String,
	pub status: OrderStatus,
	pub fulfillment_stage: Option<FulfillmentStage>,
}

/// One row of the exported transition table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRule {
	pub from_status: OrderStatus,
	pub from_stage: Option<FulfillmentStage>,
	pub action: FulfillmentAction,
	pub to_status: OrderStatus,
	pub to_stage: Option<FulfillmentStage>,
	/// True when the action requires the admin claim.
	pub administrative: bool,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Invalid state, validation or carrier failure (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Missing or invalid credential (401)
	Unauthorized { message: String },
	/// Caller may not act on the order (403)
	Forbidden { message: String },
	/// Order or record unknown (404)
	NotFound { error_type: String, message: String },
	/// Order already shipped (409)
	Conflict {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Reserved lookup mode (501)
	NotImplemented { message: String },
	/// Unexpected failure; carries no internal detail (500)
	InternalServerError,
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::Forbidden { .. } => 403,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::NotImplemented { .. } => 501,
			APIError::InternalServerError => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, details) = match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			}
			| APIError::Conflict {
				error_type,
				message,
				details,
			} => (error_type.clone(), message.clone(), details.clone()),
			APIError::Unauthorized { message } => ("UNAUTHORIZED".into(), message.clone(), None),
			APIError::Forbidden { message } => ("FORBIDDEN".into(), message.clone(), None),
			APIError::NotFound {
				error_type,
				message,
			} => (error_type.clone(), message.clone(), None),
			APIError::NotImplemented { message } => {
				("NOT_IMPLEMENTED".into(), message.clone(), None)
			},
			APIError::InternalServerError => (
				"INTERNAL_ERROR".into(),
				"An unexpected error occurred".into(),
				None,
			),
		};
		ErrorResponse {
			error,
			message,
			details,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({}): {}", response.error, self.status_code(), response.message)
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_create_request_flattens_overrides() {
		let request: CreateShipmentRequest = serde_json::from_value(json!({
			"orderId": "ord-1",
			"remarks": "fragile",
			"codAmountToCollect": 150,
			"recipientInfo": { "name": "Ana" }
		}))
		.unwrap();

		assert_eq!(request.order_id, "ord-1");
		assert_eq!(request.overrides.remarks.as_deref(), Some("fragile"));
		assert_eq!(
			request.overrides.cod_amount_to_collect,
			Some(Decimal::from(150))
		);
		assert_eq!(
			request.overrides.recipient_info.unwrap().name.as_deref(),
			Some("Ana")
		);
	}

	#[test]
	fn test_internal_error_hides_details() {
		let response = APIError::InternalServerError.to_error_response();
		assert_eq!(response.error, "INTERNAL_ERROR");
		assert!(response.details.is_none());
	}

	#[test]
	fn test_conflict_status_code() {
		let err = APIError::Conflict {
			error_type: "ALREADY_SHIPPED".into(),
			message: "already shipped".into(),
			details: Some(json!({ "trackingId": "TRK1" })),
		};
		assert_eq!(err.status_code(), 409);
		assert_eq!(err.to_error_response().details.unwrap()["trackingId"], "TRK1");
	}
}
