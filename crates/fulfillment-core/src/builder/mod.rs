//! Builder pattern for constructing fulfillment engines.
//!
//! Maps the implementation names in the configuration to factory functions
//! for storage, credential verification and the carrier, and wires the
//! resulting services into a [`FulfillmentEngine`].

use crate::engine::FulfillmentEngine;
use fulfillment_auth::{AuthError, AuthInterface, AuthService};
use fulfillment_carrier::{CarrierError, CarrierInterface, CarrierService};
use fulfillment_config::Config;
use fulfillment_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by the name used
/// in the configuration.
pub struct FulfillmentFactories<SF, AF, CF> {
	pub storage_factories: HashMap<String, SF>,
	pub auth_factories: HashMap<String, AF>,
	pub carrier_factories: HashMap<String, CF>,
}

/// Builder for constructing a FulfillmentEngine with pluggable
/// implementations.
pub struct FulfillmentBuilder {
	config: Config,
}

impl FulfillmentBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine from the primary implementation of each component.
	pub fn build<SF, AF, CF>(
		self,
		factories: FulfillmentFactories<SF, AF, CF>,
	) -> Result<FulfillmentEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AuthInterface>, AuthError>,
		CF: Fn(&toml::Value) -> Result<Box<dyn CarrierInterface>, CarrierError>,
	{
		let storage = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage));

		let auth = load_primary(
			"auth",
			&self.config.auth.primary,
			&self.config.auth.implementations,
			&factories.auth_factories,
		)?;
		let auth = Arc::new(AuthService::new(auth));

		let carrier = load_primary(
			"carrier",
			&self.config.carrier.primary,
			&self.config.carrier.implementations,
			&factories.carrier_factories,
		)?;
		let timeout = Duration::from_secs(self.config.carrier.timeout_seconds);
		let carrier = Arc::new(CarrierService::new(carrier, timeout));
		tracing::info!(
			component = "carrier",
			timeout_seconds = self.config.carrier.timeout_seconds,
			"Carrier call timeout set"
		);

		Ok(FulfillmentEngine::new(self.config, storage, auth, carrier))
	}
}

/// Creates every configured implementation of one component and returns the
/// primary one.
///
/// Every configured implementation is instantiated so that a broken
/// secondary configuration is reported at startup rather than on failover.
fn load_primary<T: ?Sized, E: Display, F>(
	component: &'static str,
	primary: &str,
	configs: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in configs {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	if loaded.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"no valid {} implementations available",
			component
		)));
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}
