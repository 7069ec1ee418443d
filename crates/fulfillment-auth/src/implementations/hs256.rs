//! HMAC-SHA256 signed bearer tokens.
//!
//! Only the `HS256` algorithm is accepted. Token issuance belongs to the
//! identity provider; this module only verifies.

use crate::{AuthError, AuthInterface};
use async_trait::async_trait;
use fulfillment_types::{
	AuthContext, ConfigSchema, Field, FieldType, Schema, SecretString, ValidationError,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

const MIN_SECRET_LEN: usize = 32;
const MAX_LEEWAY_SECONDS: i64 = 300;

/// Claims carried by a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
	pub sub: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(default)]
	pub roles: Vec<String>,
	#[serde(default)]
	pub admin: bool,
	/// Expiry as Unix seconds.
	pub exp: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nbf: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
}

/// Verifier for HS256 tokens signed with a shared secret.
pub struct Hs256Verifier {
	key: DecodingKey,
	validation: Validation,
}

impl Hs256Verifier {
	pub fn new(secret: SecretString, issuer: Option<String>, leeway_seconds: i64) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = leeway_seconds.max(0) as u64;
		validation.validate_nbf = true;
		if let Some(issuer) = &issuer {
			validation.set_issuer(&[issuer]);
			validation.set_required_spec_claims(&["exp", "iss"]);
		}

		Self {
			key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
			validation,
		}
	}

	fn verify_token(&self, token: &str) -> Result<AuthContext, AuthError> {
		let claims = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
			.map_err(|e| match e.kind() {
				ErrorKind::ExpiredSignature => AuthError::Expired,
				_ => AuthError::InvalidCredential(e.to_string()),
			})?
			.claims;

		if claims.sub.trim().is_empty() {
			return Err(AuthError::InvalidCredential("empty subject".into()));
		}

		Ok(AuthContext {
			subject_id: claims.sub,
			email: claims.email.filter(|e| !e.trim().is_empty()),
			roles: claims.roles,
			admin: claims.admin,
		})
	}
}

#[async_trait]
impl AuthInterface for Hs256Verifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(Hs256Schema)
	}

	async fn verify(&self, token: &str) -> Result<AuthContext, AuthError> {
		self.verify_token(token)
	}
}

/// Configuration schema for the HS256 verifier.
pub struct Hs256Schema;

impl ConfigSchema for Hs256Schema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("secret", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(secret) if secret.len() >= MIN_SECRET_LEN => Ok(()),
					_ => Err(format!(
						"secret must be at least {} bytes",
						MIN_SECRET_LEN
					)),
				}
			})],
			vec![
				Field::new("issuer", FieldType::String),
				Field::new(
					"leeway_seconds",
					FieldType::Integer {
						min: Some(0),
						max: Some(MAX_LEEWAY_SECONDS),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HS256 verifier from configuration.
///
/// Configuration parameters:
/// - `secret`: shared HMAC key, at least 32 bytes
/// - `issuer`: expected `iss` claim (optional)
/// - `leeway_seconds`: clock skew tolerance, 0..=300 (default: 0)
pub fn create_verifier(config: &toml::Value) -> Result<Box<dyn AuthInterface>, AuthError> {
	Hs256Schema
		.validate(config)
		.map_err(|e| AuthError::Configuration(format!("Invalid configuration: {}", e)))?;

	let secret = config
		.get("secret")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| AuthError::Configuration("secret is required".into()))?;
	let issuer = config
		.get("issuer")
		.and_then(|v| v.as_str())
		.map(str::to_string);
	let leeway_seconds = config
		.get("leeway_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(0);

	Ok(Box::new(Hs256Verifier::new(secret, issuer, leeway_seconds)))
}

/// Registry for the HS256 implementation.
pub struct Registry;

impl fulfillment_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "hs256";
	type Factory = crate::AuthFactory;

	fn factory() -> Self::Factory {
		create_verifier
	}
}

impl crate::AuthRegistry for Registry {}

/// Token minting for tests of crates that sit behind the verifier.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
	use super::*;
	use jsonwebtoken::{EncodingKey, Header};

	/// Signs `claims` with `secret` into a compact HS256 token.
	pub fn mint_token(secret: &str, claims: &Claims) -> String {
		jsonwebtoken::encode(
			&Header::new(Algorithm::HS256),
			claims,
			&EncodingKey::from_secret(secret.as_bytes()),
		)
		.expect("claims encode")
	}

	/// Claims for `subject` that expire an hour from now.
	pub fn claims_for(subject: &str) -> Claims {
		Claims {
			sub: subject.to_string(),
			email: None,
			roles: Vec::new(),
			admin: false,
			exp: chrono::Utc::now().timestamp() + 3600,
			nbf: None,
			iss: None,
		}
	}
}
