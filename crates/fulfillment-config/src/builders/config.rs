//! Configuration builder for creating test and development configurations.
//!
//! The default configuration runs entirely in process: memory storage, the
//! sandbox carrier and an `hs256` verifier with a fixed test secret.

use crate::{
	ApiConfig, AuthConfig, CarrierConfig, Config, ServiceConfig, ShipmentConfig, StorageConfig,
};
use fulfillment_types::OrderStatus;
use std::collections::HashMap;

/// Signing secret of the default `hs256` implementation.
pub const TEST_AUTH_SECRET: &str = "test-secret-test-secret-test-secret";

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	storage_primary: String,
	carrier_primary: String,
	carrier_timeout_seconds: u64,
	sandbox_fail_with: Option<String>,
	shipment: ShipmentConfig,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "fulfillment-test".to_string(),
			storage_primary: "memory".to_string(),
			carrier_primary: "sandbox".to_string(),
			carrier_timeout_seconds: 5,
			sandbox_fail_with: None,
			shipment: ShipmentConfig::default(),
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	/// Sets the carrier call timeout in seconds.
	pub fn carrier_timeout_seconds(mut self, timeout: u64) -> Self {
		self.carrier_timeout_seconds = timeout;
		self
	}

	/// Makes the sandbox carrier reject every shipment with `message`.
	pub fn sandbox_fail_with(mut self, message: impl Into<String>) -> Self {
		self.sandbox_fail_with = Some(message.into());
		self
	}

	pub fn reference_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.shipment.reference_prefix = prefix.into();
		self
	}

	pub fn allowed_statuses(mut self, statuses: Vec<OrderStatus>) -> Self {
		self.shipment.allowed_statuses = statuses;
		self
	}

	pub fn api(mut self, api: ApiConfig) -> Self {
		self.api = Some(api);
		self
	}

	pub fn build(self) -> Config {
		let mut storage_impls = HashMap::new();
		storage_impls.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);

		let mut hs256 = toml::map::Map::new();
		hs256.insert(
			"secret".to_string(),
			toml::Value::String(TEST_AUTH_SECRET.to_string()),
		);
		let mut auth_impls = HashMap::new();
		auth_impls.insert("hs256".to_string(), toml::Value::Table(hs256));

		let mut sandbox = toml::map::Map::new();
		if let Some(message) = self.sandbox_fail_with {
			sandbox.insert("fail_with".to_string(), toml::Value::String(message));
		}
		let mut carrier_impls = HashMap::new();
		carrier_impls.insert("sandbox".to_string(), toml::Value::Table(sandbox));

		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: storage_impls,
			},
			auth: AuthConfig {
				primary: "hs256".to_string(),
				implementations: auth_impls,
			},
			carrier: CarrierConfig {
				primary: self.carrier_primary,
				timeout_seconds: self.carrier_timeout_seconds,
				implementations: carrier_impls,
			},
			shipment: self.shipment,
			api: self.api,
		}
	}
}
