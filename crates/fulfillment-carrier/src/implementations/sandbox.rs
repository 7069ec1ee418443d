//! Sandbox carrier for local development and tests.
//!
//! Fabricates tracking ids and charges a flat fee without any network
//! traffic. With `fail_with` set it declines every request, which exercises
//! the business failure path end to end.

use crate::{CarrierError, CarrierInterface};
use async_trait::async_trait;
use fulfillment_types::{
	CarrierResult, CarrierShipmentRequest, ConfigSchema, Field, FieldType, Schema,
	ValidationError,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

/// Configuration for the sandbox carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxCarrierConfig {
	/// Flat fee charged per shipment.
	#[serde(default = "default_shipping_fee")]
	pub shipping_fee: f64,
	/// When set, every request is declined with this message.
	#[serde(default)]
	pub fail_with: Option<String>,
}

fn default_shipping_fee() -> f64 {
	85.0
}

/// Carrier that never leaves the process.
pub struct SandboxCarrier {
	config: SandboxCarrierConfig,
	fee: Decimal,
	sequence: AtomicU64,
}

impl SandboxCarrier {
	pub fn new(config: SandboxCarrierConfig) -> Self {
		let fee = Decimal::try_from(config.shipping_fee)
			.unwrap_or(Decimal::ZERO)
			.round_dp(2);
		Self {
			config,
			fee,
			sequence: AtomicU64::new(1),
		}
	}
}

#[async_trait]
impl CarrierInterface for SandboxCarrier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SandboxCarrierSchema)
	}

	async fn create_shipment(
		&self,
		request: &CarrierShipmentRequest,
	) -> Result<CarrierResult, CarrierError> {
		if let Some(message) = &self.config.fail_with {
			return Err(CarrierError::Business {
				message: message.clone(),
				raw_response: json!({
					"Success": false,
					"Message": message,
					"ShippingReferenceNo": request.shipping_reference_no,
				}),
			});
		}

		let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
		let tracking_id = format!(
			"SBX{}{:06}",
			chrono::Utc::now().format("%y%m%d"),
			sequence
		);

		let raw_response = json!({
			"Success": true,
			"Entity": {
				"TrackingId": tracking_id,
				"ShippingReferenceNo": request.shipping_reference_no,
				"TotalShippingAmount": self.fee.to_f64(),
				"Items": request.shipment_items.len(),
			}
		});

		Ok(CarrierResult {
			tracking_id,
			total_shipping_amount: self.fee,
			raw_response,
		})
	}
}

/// Configuration schema for the sandbox carrier.
pub struct SandboxCarrierSchema;

impl ConfigSchema for SandboxCarrierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("shipping_fee", FieldType::Float { min: Some(0.0) }),
				Field::new("fail_with", FieldType::String),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create the sandbox carrier from configuration.
///
/// Configuration parameters:
/// - `shipping_fee`: flat fee per shipment (default: 85.0)
/// - `fail_with`: decline every request with this message (optional)
pub fn create_carrier(config: &toml::Value) -> Result<Box<dyn CarrierInterface>, CarrierError> {
	SandboxCarrierSchema
		.validate(config)
		.map_err(|e| CarrierError::Configuration(format!("Invalid configuration: {}", e)))?;

	let sandbox_config: SandboxCarrierConfig = config
		.clone()
		.try_into()
		.map_err(|e| CarrierError::Configuration(format!("Invalid sandbox config: {}", e)))?;

	Ok(Box::new(SandboxCarrier::new(sandbox_config)))
}

/// Registry for the sandbox carrier implementation.
pub struct Registry;

impl fulfillment_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "sandbox";
	type Factory = crate::CarrierFactory;

	fn factory() -> Self::Factory {
		create_carrier
	}
}

impl crate::CarrierRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::sample_request;

	#[tokio::test]
	async fn test_tracking_ids_are_unique() {
		let carrier = SandboxCarrier::new(SandboxCarrierConfig {
			shipping_fee: 85.0,
			fail_with: None,
		});

		let first = carrier
			.create_shipment(&sample_request("MKT-a-1"))
			.await
			.unwrap();
		let second = carrier
			.create_shipment(&sample_request("MKT-b-1"))
			.await
			.unwrap();

		assert_ne!(first.tracking_id, second.tracking_id);
		assert_eq!(first.total_shipping_amount, Decimal::from(85));
		assert_eq!(first.raw_response["Entity"]["ShippingReferenceNo"], "MKT-a-1");
	}

	#[tokio::test]
	async fn test_fail_with_declines_request() {
		let config: toml::Value = toml::from_str("fail_with = \"Service area not covered\"").unwrap();
		let carrier = create_carrier(&config).unwrap();

		match carrier.create_shipment(&sample_request("MKT-c-1")).await {
			Err(CarrierError::Business { message, .. }) => {
				assert_eq!(message, "Service area not covered")
			},
			other => panic!("unexpected outcome: {:?}", other),
		}
	}

	#[test]
	fn test_negative_fee_rejected() {
		let config: toml::Value = toml::from_str("shipping_fee = -1.0").unwrap();
		assert!(create_carrier(&config).is_err());
	}
}
