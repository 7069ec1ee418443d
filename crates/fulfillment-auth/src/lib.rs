//! Caller authentication for the fulfillment service.
//!
//! This module turns the `Authorization` header of a request into an
//! [`AuthContext`]. Header parsing lives in [`AuthService`]; verification of
//! the bearer credential itself is delegated to a pluggable
//! [`AuthInterface`] implementation selected in configuration.

use async_trait::async_trait;
use fulfillment_types::{AuthContext, ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod hs256;
}

#[cfg(feature = "testing")]
pub use implementations::hs256::testing;

/// Errors that can occur while authenticating a caller.
#[derive(Debug, Error)]
pub enum AuthError {
	/// No `Authorization` header, or not a bearer credential.
	#[error("Missing bearer credential")]
	MissingCredential,
	/// The credential is malformed or its signature does not verify.
	#[error("Invalid credential: {0}")]
	InvalidCredential(String),
	/// The credential verified but is past its expiry.
	#[error("Credential expired")]
	Expired,
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Verifies bearer credentials.
///
/// Implementations are pure: they never perform I/O with side effects.
#[async_trait]
pub trait AuthInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Verifies a raw bearer token and returns the caller identity.
	async fn verify(&self, token: &str) -> Result<AuthContext, AuthError>;
}

/// Type alias for auth factory functions.
pub type AuthFactory = fn(&toml::Value) -> Result<Box<dyn AuthInterface>, AuthError>;

/// Registry trait for auth implementations.
pub trait AuthRegistry: ImplementationRegistry<Factory = AuthFactory> {}

/// Get all registered auth implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AuthFactory)> {
	use implementations::hs256;

	vec![(hs256::Registry::NAME, hs256::Registry::factory())]
}

/// Resolves request credentials into caller identities.
pub struct AuthService {
	implementation: Box<dyn AuthInterface>,
}

impl AuthService {
	pub fn new(implementation: Box<dyn AuthInterface>) -> Self {
		Self { implementation }
	}

	/// Resolves the value of an `Authorization` header.
	///
	/// The scheme is matched case-insensitively and must be `Bearer`.
	pub async fn resolve(&self, header: Option<&str>) -> Result<AuthContext, AuthError> {
		let token = parse_bearer(header.ok_or(AuthError::MissingCredential)?)?;
		let context = self.implementation.verify(token).await?;

		tracing::debug!(
			subject = %fulfillment_types::truncate_id(&context.subject_id),
			admin = context.is_admin(),
			"Resolved caller"
		);
		Ok(context)
	}
}

fn parse_bearer(header: &str) -> Result<&str, AuthError> {
	let header = header.trim();
	let (scheme, token) = header
		.split_once(' ')
		.ok_or(AuthError::MissingCredential)?;

	if !scheme.eq_ignore_ascii_case("bearer") {
		return Err(AuthError::MissingCredential);
	}

	let token = token.trim();
	if token.is_empty() {
		return Err(AuthError::MissingCredential);
	}
	Ok(token)
}
