//! Main entry point for the fulfillment service.
//!
//! This binary serves the shipment creation, tracking and stage transition
//! API on top of pluggable storage, credential verification and carrier
//! implementations selected by the configuration file.

use clap::Parser;
use fulfillment_config::{ApiConfig, Config};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the fulfillment service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the fulfillment service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the fulfillment engine with the configured implementations
/// 5. Serves the API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started fulfillment service");

	let config_path = args
		.config
		.to_str()
		.ok_or("configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let api_config: ApiConfig = config.api.clone().unwrap_or_default();
	if !api_config.enabled {
		tracing::warn!("API server disabled in configuration, nothing to run");
		return Ok(());
	}

	let engine = Arc::new(factory_registry::build_engine_from_config(config)?);
	server::start_server(api_config, engine).await?;

	tracing::info!("Stopped fulfillment service");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_args_defaults() {
		let args = Args::parse_from(["fulfillment"]);
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_overrides() {
		let args = Args::parse_from(["fulfillment", "-c", "prod.toml", "--log-level", "debug"]);
		assert_eq!(args.config, PathBuf::from("prod.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[test]
	fn test_missing_api_section_serves_by_default() {
		assert!(ApiConfig::default().enabled);
	}

	#[tokio::test]
	async fn test_engine_from_config_file() {
		let dir = tempfile::tempdir().unwrap();
		let storage_path = dir.path().join("storage");
		let config_path = dir.path().join("config.toml");
		std::fs::write(
			&config_path,
			format!(
				r#"
[service]
id = "fulfillment-file"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"

[auth]
primary = "hs256"
[auth.implementations.hs256]
secret = "0123456789abcdef0123456789abcdef"

[carrier]
primary = "sandbox"
[carrier.implementations.sandbox]
"#,
				storage_path.display()
			),
		)
		.unwrap();

		let config = Config::from_file(config_path.to_str().unwrap()).await.unwrap();
		assert!(config.api.is_none());

		let engine = factory_registry::build_engine_from_config(config).unwrap();
		assert_eq!(engine.config().service.id, "fulfillment-file");
	}
}
