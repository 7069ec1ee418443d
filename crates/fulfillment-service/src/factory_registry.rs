//! Factory registry for the pluggable implementations.
//!
//! Collects the factory functions exported by each component crate so the
//! engine can be built from whatever implementation names the configuration
//! references.

use fulfillment_auth::AuthFactory;
use fulfillment_carrier::CarrierFactory;
use fulfillment_config::Config;
use fulfillment_core::{FulfillmentBuilder, FulfillmentEngine, FulfillmentFactories};
use fulfillment_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Registry of every available implementation factory.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub auth: HashMap<String, AuthFactory>,
	pub carrier: HashMap<String, CarrierFactory>,
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry {
			storage: HashMap::new(),
			auth: HashMap::new(),
			carrier: HashMap::new(),
		};

		for (name, factory) in fulfillment_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.storage.insert(name.to_string(), factory);
		}
		for (name, factory) in fulfillment_auth::get_all_implementations() {
			tracing::debug!("Registering auth implementation: {}", name);
			registry.auth.insert(name.to_string(), factory);
		}
		for (name, factory) in fulfillment_carrier::get_all_implementations() {
			tracing::debug!("Registering carrier implementation: {}", name);
			registry.carrier.insert(name.to_string(), factory);
		}

		registry
	})
}

/// Selects the factories for the implementations named in a config section.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the engine for `config` using the registered factories.
pub fn build_engine_from_config(
	config: Config,
) -> Result<FulfillmentEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let auth_factories = build_factories!(registry, config.auth.implementations, auth, "auth");
	let carrier_factories =
		build_factories!(registry, config.carrier.implementations, carrier, "carrier");

	let factories = FulfillmentFactories {
		storage_factories,
		auth_factories,
		carrier_factories,
	};

	Ok(FulfillmentBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_config::builders::config::ConfigBuilder;

	#[test]
	fn test_registry_lists_all_implementations() {
		let registry = get_registry();
		assert!(registry.storage.contains_key("memory"));
		assert!(registry.storage.contains_key("file"));
		assert!(registry.auth.contains_key("hs256"));
		assert!(registry.carrier.contains_key("http"));
		assert!(registry.carrier.contains_key("sandbox"));
	}

	#[test]
	fn test_unknown_implementation_names_available_ones() {
		let mut config = ConfigBuilder::new().build();
		config
			.carrier
			.implementations
			.insert("pigeon".into(), toml::Value::Table(toml::map::Map::new()));

		let err = build_engine_from_config(config).err().unwrap().to_string();
		assert!(err.contains("Unknown carrier implementation 'pigeon'"));
		assert!(err.contains("http, sandbox"));
	}

	#[test]
	fn test_builds_test_config() {
		assert!(build_engine_from_config(ConfigBuilder::new().build()).is_ok());
	}
}
