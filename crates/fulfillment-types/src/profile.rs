//! Buyer and seller profile records.
//!
//! Profiles are owned by user administration and are read-only here. They
//! feed the second tier of shipment field resolution and the seller branch
//! of the authorization policy.

use serde::{Deserialize, Serialize};

/// Postal address stored on a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub line: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub barangay: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub city: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub province: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub postal_code: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country: Option<String>,
}

/// A buyer's user profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<PostalAddress>,
}

/// A seller (store) record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
	pub id: String,
	/// User account that owns the store.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_user_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub store_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<PostalAddress>,
}
