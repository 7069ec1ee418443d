//! HTTP integration with the parcel carrier's shipment API.
//!
//! The carrier answers shipment creation with a JSON envelope:
//!
//! ```json
//! { "Success": true, "Entity": { "TrackingId": "...", "TotalShippingAmount": 85.0 } }
//! ```
//!
//! `Success` may be omitted on success. A non-2xx answer that still carries
//! a JSON body is the carrier declining the request. A 2xx answer without a
//! tracking id leaves the outcome unknown and is reported as a transport
//! failure.

use crate::{CarrierError, CarrierInterface};
use async_trait::async_trait;
use fulfillment_types::{
	CarrierResult, CarrierShipmentRequest, ConfigSchema, Field, FieldType, Schema, SecretString,
	ValidationError,
};
use reqwest::header::{HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

const DEFAULT_API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Carrier client speaking the carrier's REST API.
pub struct HttpCarrier {
	client: reqwest::Client,
	endpoint: String,
	api_key_header: HeaderName,
	api_key: SecretString,
}

impl HttpCarrier {
	pub fn new(
		endpoint: String,
		api_key_header: &str,
		api_key: SecretString,
	) -> Result<Self, CarrierError> {
		let api_key_header = HeaderName::from_str(api_key_header).map_err(|e| {
			CarrierError::Configuration(format!("invalid api_key_header: {}", e))
		})?;
		let client = reqwest::Client::builder()
			.pool_idle_timeout(std::time::Duration::from_secs(90))
			.pool_max_idle_per_host(10)
			.build()
			.map_err(|e| CarrierError::Configuration(format!("HTTP client: {}", e)))?;

		Ok(Self {
			client,
			endpoint,
			api_key_header,
			api_key,
		})
	}
}

#[async_trait]
impl CarrierInterface for HttpCarrier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpCarrierSchema)
	}

	async fn create_shipment(
		&self,
		request: &CarrierShipmentRequest,
	) -> Result<CarrierResult, CarrierError> {
		let api_key = HeaderValue::from_str(self.api_key.expose_secret())
			.map_err(|_| CarrierError::Configuration("api_key is not a valid header value".into()))?;

		let response = self
			.client
			.post(&self.endpoint)
			.header(CONTENT_TYPE, "application/json")
			.header(CACHE_CONTROL, "no-cache")
			.header(self.api_key_header.clone(), api_key)
			.json(request)
			.send()
			.await
			.map_err(|e| CarrierError::Transport {
				message: format!("request failed: {}", e),
				raw_body: None,
			})?;

		let status = response.status().as_u16();
		let body = response.text().await.map_err(|e| CarrierError::Transport {
			message: format!("failed to read response body: {}", e),
			raw_body: None,
		})?;

		tracing::debug!(status, bytes = body.len(), "Carrier responded");
		classify_response(status, &body)
	}
}

/// Maps an HTTP status and body to a carrier outcome.
pub(crate) fn classify_response(status: u16, body: &str) -> Result<CarrierResult, CarrierError> {
	let parsed: Option<Value> = serde_json::from_str(body).ok().filter(Value::is_object);

	let Some(payload) = parsed else {
		return Err(CarrierError::Transport {
			message: format!("carrier returned HTTP {} without a readable body", status),
			raw_body: Some(body.to_string()),
		});
	};

	if !(200..300).contains(&status) {
		return Err(CarrierError::Business {
			message: carrier_message(&payload)
				.unwrap_or_else(|| format!("carrier returned HTTP {}", status)),
			raw_response: payload,
		});
	}

	if field(&payload, "Success").and_then(Value::as_bool) == Some(false) {
		return Err(CarrierError::Business {
			message: carrier_message(&payload)
				.unwrap_or_else(|| "carrier reported failure".to_string()),
			raw_response: payload,
		});
	}

	let entity = field(&payload, "Entity");
	let tracking_id = entity
		.and_then(|e| field(e, "TrackingId"))
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|id| !id.is_empty())
		.map(str::to_string);

	let Some(tracking_id) = tracking_id else {
		return Err(CarrierError::Transport {
			message: format!("carrier returned HTTP {} without a tracking id", status),
			raw_body: Some(body.to_string()),
		});
	};

	let total_shipping_amount = entity
		.and_then(|e| field(e, "TotalShippingAmount"))
		.map(parse_amount)
		.unwrap_or(Decimal::ZERO);

	Ok(CarrierResult {
		tracking_id,
		total_shipping_amount,
		raw_response: payload,
	})
}

/// Looks up `name` in PascalCase, then camelCase.
fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
	value.get(name).or_else(|| {
		let mut chars = name.chars();
		let camel: String = chars
			.next()
			.map(|first| first.to_ascii_lowercase().to_string() + chars.as_str())
			.unwrap_or_default();
		value.get(camel)
	})
}

fn carrier_message(payload: &Value) -> Option<String> {
	["Message", "ErrorMessage", "Error"]
		.iter()
		.find_map(|name| field(payload, name).and_then(Value::as_str))
		.map(str::to_string)
}

fn parse_amount(value: &Value) -> Decimal {
	let text = match value {
		Value::Number(n) => n.to_string(),
		Value::String(s) => s.trim().to_string(),
		_ => return Decimal::ZERO,
	};
	Decimal::from_str(&text)
		.or_else(|_| Decimal::from_scientific(&text))
		.unwrap_or_else(|_| {
			tracing::warn!(amount = %text, "Unparseable shipping amount from carrier");
			Decimal::ZERO
		})
}

/// Configuration schema for the HTTP carrier.
pub struct HttpCarrierSchema;

impl ConfigSchema for HttpCarrierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("endpoint", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("endpoint must be an http(s) URL".to_string()),
					}
				}),
				Field::new("api_key", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(key) if !key.trim().is_empty() => Ok(()),
						_ => Err("api_key cannot be empty".to_string()),
					}
				}),
			],
			vec![Field::new("api_key_header", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Factory function to create the HTTP carrier from configuration.
///
/// Configuration parameters:
/// - `endpoint`: shipment creation URL
/// - `api_key`: subscription key sent with every request
/// - `api_key_header`: header carrying the key (default: "Ocp-Apim-Subscription-Key")
pub fn create_carrier(config: &toml::Value) -> Result<Box<dyn CarrierInterface>, CarrierError> {
	HttpCarrierSchema
		.validate(config)
		.map_err(|e| CarrierError::Configuration(format!("Invalid configuration: {}", e)))?;

	let get_str = |key: &str| config.get(key).and_then(|v| v.as_str());
	let endpoint = get_str("endpoint")
		.ok_or_else(|| CarrierError::Configuration("endpoint is required".into()))?;
	let api_key = get_str("api_key")
		.ok_or_else(|| CarrierError::Configuration("api_key is required".into()))?;
	let header = get_str("api_key_header").unwrap_or(DEFAULT_API_KEY_HEADER);

	Ok(Box::new(HttpCarrier::new(
		endpoint.to_string(),
		header,
		SecretString::from(api_key),
	)?))
}

/// Registry for the HTTP carrier implementation.
pub struct Registry;

impl fulfillment_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = crate::CarrierFactory;

	fn factory() -> Self::Factory {
		create_carrier
	}
}

impl crate::CarrierRegistry for Registry {}
