//! Caller identity types.

use serde::{Deserialize, Serialize};

/// Identity of the caller of a fulfillment operation.
///
/// Produced fresh for every request from a verified credential and never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthContext {
	pub subject_id: String,
	pub email: Option<String>,
	/// Role claims carried by the credential.
	pub roles: Vec<String>,
	/// Explicit admin flag claim.
	pub admin: bool,
}

impl AuthContext {
	/// Returns true if the caller holds the admin flag or the `admin` role.
	pub fn is_admin(&self) -> bool {
		self.admin || self.roles.iter().any(|r| r.eq_ignore_ascii_case("admin"))
	}

	/// Case-insensitive comparison against the caller's email claim.
	pub fn email_matches(&self, other: &str) -> bool {
		self.email
			.as_deref()
			.is_some_and(|own| !own.is_empty() && own.eq_ignore_ascii_case(other.trim()))
	}
}
