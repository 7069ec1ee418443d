//! Configuration module for the fulfillment service.
//!
//! This module provides the configuration structures for the service and its
//! pluggable backends. Configuration is loaded from TOML files with
//! `${VAR}` / `${VAR:-default}` environment variable substitution and is
//! validated before any component is built.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["carrier.toml", "shipment.toml"]` to include other files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(feature = "testing")]
pub mod builders;
mod loader;

use fulfillment_types::OrderStatus;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default Display echoes the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the fulfillment service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for bearer credential verification.
	pub auth: AuthConfig,
	/// Configuration for the parcel carrier client.
	pub carrier: CarrierConfig,
	/// Shipment request defaults and the pre-shipment status gate.
	#[serde(default)]
	pub shipment: ShipmentConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this service instance, reported by `/health`.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their raw configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for credential verification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the carrier client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CarrierConfig {
	pub primary: String,
	/// Upper bound for a single shipment creation call.
	#[serde(default = "default_carrier_timeout")]
	pub timeout_seconds: u64,
	pub implementations: HashMap<String, toml::Value>,
}

fn default_carrier_timeout() -> u64 {
	30
}

/// Settings consumed by the shipment request builder and orchestrator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShipmentConfig {
	/// Prefix of generated shipping reference numbers.
	#[serde(default = "default_reference_prefix")]
	pub reference_prefix: String,
	/// Order statuses from which a shipment may be created.
	#[serde(default = "default_allowed_statuses")]
	pub allowed_statuses: Vec<OrderStatus>,
	#[serde(default)]
	pub defaults: AddressDefaults,
	/// Last-resort shipper details used when neither the caller nor a
	/// seller profile provides them.
	#[serde(default)]
	pub shipper: ShipperDefaults,
	/// Per-unit parcel profile for line items without measurements.
	#[serde(default)]
	pub parcel: ParcelProfile,
}

impl Default for ShipmentConfig {
	fn default() -> Self {
		Self {
			reference_prefix: default_reference_prefix(),
			allowed_statuses: default_allowed_statuses(),
			defaults: AddressDefaults::default(),
			shipper: ShipperDefaults::default(),
			parcel: ParcelProfile::default(),
		}
	}
}

fn default_reference_prefix() -> String {
	"MKT".to_string()
}

fn default_allowed_statuses() -> Vec<OrderStatus> {
	vec![OrderStatus::Confirmed, OrderStatus::ToShip]
}

/// Hardcoded address fallbacks for both parties.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddressDefaults {
	#[serde(default = "default_country")]
	pub country: String,
	#[serde(default = "default_province")]
	pub province: String,
}

impl Default for AddressDefaults {
	fn default() -> Self {
		Self {
			country: default_country(),
			province: default_province(),
		}
	}
}

fn default_country() -> String {
	"Philippines".to_string()
}

fn default_province() -> String {
	"Metro Manila".to_string()
}

/// System shipper used as the lowest precedence tier for shipper fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShipperDefaults {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub contact_number: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub address_line: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub postal_code: Option<String>,
}

/// Per-unit parcel measurements in centimeters and kilograms.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct ParcelProfile {
	pub length: f64,
	pub width: f64,
	pub height: f64,
	pub weight: f64,
}

impl Default for ParcelProfile {
	fn default() -> Self {
		Self {
			length: 20.0,
			width: 15.0,
			height: 10.0,
			weight: 0.5,
		}
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds. Shipment creation is exempt and bounded
	/// by `carrier.timeout_seconds` instead.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			host: default_api_host(),
			port: default_api_port(),
			timeout_seconds: default_api_timeout(),
			max_request_size: default_max_request_size(),
		}
	}
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match (std::env::var(var_name), default_value) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name
				)));
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply in reverse so earlier offsets stay valid.
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

fn validate_pluggable(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration across all sections.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		validate_pluggable("storage", &self.storage.primary, &self.storage.implementations)?;
		validate_pluggable("auth", &self.auth.primary, &self.auth.implementations)?;
		validate_pluggable("carrier", &self.carrier.primary, &self.carrier.implementations)?;

		if self.carrier.timeout_seconds == 0 || self.carrier.timeout_seconds > 300 {
			return Err(ConfigError::Validation(
				"carrier.timeout_seconds must be between 1 and 300".into(),
			));
		}

		self.validate_shipment()?;

		if let Some(api) = &self.api {
			if api.enabled && api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"api.max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}

	fn validate_shipment(&self) -> Result<(), ConfigError> {
		let shipment = &self.shipment;

		if shipment.reference_prefix.is_empty()
			|| !shipment
				.reference_prefix
				.chars()
				.all(|c| c.is_ascii_alphanumeric())
		{
			return Err(ConfigError::Validation(format!(
				"shipment.reference_prefix '{}' must be non-empty and alphanumeric",
				shipment.reference_prefix
			)));
		}

		if shipment.allowed_statuses.is_empty() {
			return Err(ConfigError::Validation(
				"shipment.allowed_statuses cannot be empty".into(),
			));
		}
		// A shipment can only be created before the parcel leaves the seller.
		if let Some(status) = shipment
			.allowed_statuses
			.iter()
			.find(|s| s.is_terminal() || **s == OrderStatus::Shipping)
		{
			return Err(ConfigError::Validation(format!(
				"shipment.allowed_statuses cannot contain '{}'",
				status
			)));
		}

		let parcel = &shipment.parcel;
		if [parcel.length, parcel.width, parcel.height, parcel.weight]
			.iter()
			.any(|v| !v.is_finite() || *v <= 0.0)
		{
			return Err(ConfigError::Validation(
				"shipment.parcel dimensions and weight must be positive".into(),
			));
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the
/// result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	pub(crate) const BASE_CONFIG: &str = r#"
[service]
id = "fulfillment-test"

[storage]
primary = "memory"
[storage.implementations.memory]

[auth]
primary = "hs256"
[auth.implementations.hs256]
secret = "0123456789abcdef0123456789abcdef"

[carrier]
primary = "sandbox"
[carrier.implementations.sandbox]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TEST_CARRIER_HOST", "carrier.local");
		std::env::set_var("TEST_CARRIER_PORT", "8443");

		let input = "endpoint = \"https://${TEST_CARRIER_HOST}:${TEST_CARRIER_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "endpoint = \"https://carrier.local:8443\"");

		std::env::remove_var("TEST_CARRIER_HOST");
		std::env::remove_var("TEST_CARRIER_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${FULFILLMENT_MISSING_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${FULFILLMENT_MISSING_VAR}\"");
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("FULFILLMENT_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE_CONFIG.parse().unwrap();

		assert_eq!(config.carrier.timeout_seconds, 30);
		assert_eq!(config.shipment.reference_prefix, "MKT");
		assert_eq!(
			config.shipment.allowed_statuses,
			vec![OrderStatus::Confirmed, OrderStatus::ToShip]
		);
		assert_eq!(config.shipment.defaults.country, "Philippines");
		assert_eq!(config.shipment.defaults.province, "Metro Manila");
		assert_eq!(config.shipment.parcel, ParcelProfile::default());
		assert!(config.api.is_none());
	}

	#[test]
	fn test_primary_must_be_configured() {
		let input = BASE_CONFIG.replace("primary = \"sandbox\"", "primary = \"http\"");
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary carrier 'http'"));
	}

	#[test]
	fn test_carrier_timeout_bounds() {
		let input = BASE_CONFIG.replace(
			"primary = \"sandbox\"",
			"primary = \"sandbox\"\ntimeout_seconds = 0",
		);
		assert!(input.parse::<Config>().is_err());
	}

	#[test]
	fn test_shipping_not_allowed_as_pre_shipment_status() {
		let input = format!(
			"{}\n[shipment]\nallowed_statuses = [\"confirmed\", \"shipping\"]\n",
			BASE_CONFIG
		);
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("'shipping'"));
	}

	#[test]
	fn test_unknown_status_rejected_at_parse() {
		let input = format!(
			"{}\n[shipment]\nallowed_statuses = [\"ready_to_ship\"]\n",
			BASE_CONFIG
		);
		assert!(matches!(
			input.parse::<Config>(),
			Err(ConfigError::Parse(_))
		));
	}

	#[test]
	fn test_reference_prefix_must_be_alphanumeric() {
		let input = format!("{}\n[shipment]\nreference_prefix = \"MK-T\"\n", BASE_CONFIG);
		assert!(input.parse::<Config>().is_err());
	}
}
