//! Parcel carrier client for the fulfillment service.
//!
//! This module performs the outbound shipment creation call. Failures are
//! split into two kinds that callers must treat differently:
//!
//! - transport failures (network error, timeout, non-2xx without a readable
//!   body), after which the carrier may or may not have created a shipment;
//! - business failures, where the carrier answered and explicitly declined.
//!
//! Neither kind is retried here. Whether a retry is safe depends on knowing
//! if the carrier created the shipment, which a transport error cannot tell.

use async_trait::async_trait;
use fulfillment_types::{
	truncate_id, CarrierResult, CarrierShipmentRequest, ConfigSchema, ImplementationRegistry,
};
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod sandbox;
}

/// Errors that can occur during carrier operations.
#[derive(Debug, Error)]
pub enum CarrierError {
	/// The request did not produce a usable carrier answer.
	#[error("Carrier transport error: {message}")]
	Transport {
		message: String,
		/// Raw response body, when one was received.
		raw_body: Option<String>,
	},
	/// The carrier answered and reported a failure.
	#[error("Carrier rejected shipment: {message}")]
	Business {
		message: String,
		raw_response: serde_json::Value,
	},
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl CarrierError {
	/// Raw carrier payload for audit, as JSON.
	pub fn raw_response(&self) -> serde_json::Value {
		match self {
			CarrierError::Transport {
				raw_body: Some(body),
				..
			} => serde_json::Value::String(body.clone()),
			CarrierError::Business { raw_response, .. } => raw_response.clone(),
			_ => serde_json::Value::Null,
		}
	}
}

/// Interface of a carrier integration.
#[async_trait]
pub trait CarrierInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Submits a shipment creation request to the carrier.
	async fn create_shipment(
		&self,
		request: &CarrierShipmentRequest,
	) -> Result<CarrierResult, CarrierError>;
}

/// Type alias for carrier factory functions.
pub type CarrierFactory = fn(&toml::Value) -> Result<Box<dyn CarrierInterface>, CarrierError>;

/// Registry trait for carrier implementations.
pub trait CarrierRegistry: ImplementationRegistry<Factory = CarrierFactory> {}

/// Get all registered carrier implementations.
pub fn get_all_implementations() -> Vec<(&'static str, CarrierFactory)> {
	use implementations::{http, sandbox};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(sandbox::Registry::NAME, sandbox::Registry::factory()),
	]
}

/// Carrier client with a bounded call duration.
pub struct CarrierService {
	implementation: Box<dyn CarrierInterface>,
	timeout: Duration,
}

impl CarrierService {
	pub fn new(implementation: Box<dyn CarrierInterface>, timeout: Duration) -> Self {
		Self {
			implementation,
			timeout,
		}
	}

	/// Creates a shipment, failing with a transport error once the timeout
	/// elapses.
	///
	/// A timed-out call may still have succeeded on the carrier's side.
	pub async fn create_shipment(
		&self,
		request: &CarrierShipmentRequest,
	) -> Result<CarrierResult, CarrierError> {
		let reference = truncate_id(&request.shipping_reference_no);

		let result = match tokio::time::timeout(
			self.timeout,
			self.implementation.create_shipment(request),
		)
		.await
		{
			Ok(result) => result,
			Err(_) => Err(CarrierError::Transport {
				message: format!(
					"carrier call timed out after {}s",
					self.timeout.as_secs_f64()
				),
				raw_body: None,
			}),
		};

		match &result {
			Ok(outcome) => tracing::info!(
				reference_no = %reference,
				tracking_id = %outcome.tracking_id,
				"Carrier created shipment"
			),
			Err(e) => tracing::warn!(reference_no = %reference, error = %e, "Carrier call failed"),
		}
		result
	}
}

#[cfg(test)]
pub(crate) mod test_support {
	use fulfillment_types::{CarrierShipmentRequest, PartyAddress, ShipmentItem};
	use rust_decimal::Decimal;

	pub fn sample_request(reference: &str) -> CarrierShipmentRequest {
		let party = |name: &str| PartyAddress {
			name: name.to_string(),
			contact_number: "09170000000".into(),
			email: None,
			address_line1: "1 Rizal Ave".into(),
			district: "N/A".into(),
			city: "Pasig".into(),
			province: "Metro Manila".into(),
			postal_code: None,
			country: "Philippines".into(),
		};
		CarrierShipmentRequest {
			shipping_reference_no: reference.to_string(),
			shipper: party("Shop"),
			recipient: party("Ana"),
			shipment_items: vec![ShipmentItem {
				description: "Mug".into(),
				quantity: 1,
				length: 20.0,
				width: 15.0,
				height: 10.0,
				weight: 0.5,
				declared_value: Decimal::from(150),
			}],
			shipment_description: "Mug".into(),
			remarks: None,
			special_instruction: None,
			cod_amount_to_collect: Decimal::ZERO,
			requested_pickup_schedule: None,
			created_by_user_email: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_support::sample_request;

	struct SlowCarrier;

	#[async_trait]
	impl CarrierInterface for SlowCarrier {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			unimplemented!()
		}

		async fn create_shipment(
			&self,
			_request: &CarrierShipmentRequest,
		) -> Result<CarrierResult, CarrierError> {
			tokio::time::sleep(Duration::from_secs(60)).await;
			Ok(CarrierResult {
				tracking_id: "late".into(),
				total_shipping_amount: Default::default(),
				raw_response: serde_json::Value::Null,
			})
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_timeout_is_transport_error() {
		let service = CarrierService::new(Box::new(SlowCarrier), Duration::from_secs(5));

		let result = service.create_shipment(&sample_request("MKT-1-1")).await;

		assert!(matches!(
			result,
			Err(CarrierError::Transport { raw_body: None, .. })
		));
	}

	#[test]
	fn test_raw_response_of_errors() {
		let business = CarrierError::Business {
			message: "bad address".into(),
			raw_response: serde_json::json!({ "Success": false }),
		};
		assert_eq!(business.raw_response()["Success"], false);

		let transport = CarrierError::Transport {
			message: "HTTP 502".into(),
			raw_body: Some("<html>".into()),
		};
		assert_eq!(transport.raw_response(), "<html>");
	}
}
