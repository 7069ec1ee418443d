//! Carrier shipment payloads and caller overrides.
//!
//! `CarrierShipmentRequest` is the body sent to the carrier's shipment
//! creation endpoint and uses the carrier's PascalCase field names. The
//! override types mirror the optional fields accepted by `POST /shipments`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shipment creation request in the carrier's wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CarrierShipmentRequest {
	pub shipping_reference_no: String,
	pub shipper: PartyAddress,
	pub recipient: PartyAddress,
	pub shipment_items: Vec<ShipmentItem>,
	pub shipment_description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub remarks: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub special_instruction: Option<String>,
	#[serde(rename = "CODAmountToCollect", with = "rust_decimal::serde::float")]
	pub cod_amount_to_collect: Decimal,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub requested_pickup_schedule: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_by_user_email: Option<String>,
}

/// Shipper or recipient block of a carrier request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PartyAddress {
	pub name: String,
	pub contact_number: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	pub address_line1: String,
	/// Barangay or district.
	pub district: String,
	pub city: String,
	pub province: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub postal_code: Option<String>,
	pub country: String,
}

/// One parcel line of a carrier request. Weight and declared value are
/// totals for the line (already multiplied by quantity).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ShipmentItem {
	pub description: String,
	pub quantity: u32,
	pub length: f64,
	pub width: f64,
	pub height: f64,
	pub weight: f64,
	#[serde(with = "rust_decimal::serde::float")]
	pub declared_value: Decimal,
}

/// Caller-supplied overrides for a shipment creation attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentOverrides {
	#[serde(default)]
	pub recipient_info: Option<PartyOverrides>,
	#[serde(default)]
	pub shipper_info: Option<PartyOverrides>,
	#[serde(default)]
	pub shipment_items: Option<Vec<ShipmentItemOverride>>,
	#[serde(default)]
	pub shipment_description: Option<String>,
	#[serde(default)]
	pub remarks: Option<String>,
	#[serde(default)]
	pub special_instruction: Option<String>,
	#[serde(default)]
	pub cod_amount_to_collect: Option<Decimal>,
	#[serde(default)]
	pub requested_pickup_schedule: Option<String>,
	#[serde(default)]
	pub created_by_user_email: Option<String>,
}

/// Per-field overrides for a shipper or recipient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartyOverrides {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub contact_number: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default, alias = "address")]
	pub address_line1: Option<String>,
	#[serde(default, alias = "barangay")]
	pub district: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub province: Option<String>,
	#[serde(default)]
	pub postal_code: Option<String>,
	#[serde(default)]
	pub country: Option<String>,
}

/// A caller-supplied parcel line. Missing measurements fall back to the
/// default parcel profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentItemOverride {
	pub description: String,
	#[serde(default = "default_quantity")]
	pub quantity: u32,
	#[serde(default)]
	pub length: Option<f64>,
	#[serde(default)]
	pub width: Option<f64>,
	#[serde(default)]
	pub height: Option<f64>,
	#[serde(default)]
	pub weight: Option<f64>,
	#[serde(default)]
	pub declared_value: Option<Decimal>,
}

fn default_quantity() -> u32 {
	1
}

/// Result of a successful shipment creation as reported by the carrier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarrierResult {
	pub tracking_id: String,
	pub total_shipping_amount: Decimal,
	/// Raw response body for audit.
	pub raw_response: serde_json::Value,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_carrier_request_uses_carrier_field_names() {
		let request = CarrierShipmentRequest {
			shipping_reference_no: "MKT-ord-1-1".into(),
			shipper: PartyAddress {
				name: "Shop".into(),
				contact_number: "0917".into(),
				email: None,
				address_line1: "1 Shop St".into(),
				district: "N/A".into(),
				city: "Pasig".into(),
				province: "Metro Manila".into(),
				postal_code: None,
				country: "Philippines".into(),
			},
			recipient: PartyAddress {
				name: "Ana".into(),
				contact_number: "0918".into(),
				email: Some("ana@example.com".into()),
				address_line1: "123 Main St".into(),
				district: "San Isidro".into(),
				city: "Makati".into(),
				province: "Metro Manila".into(),
				postal_code: Some("1200".into()),
				country: "Philippines".into(),
			},
			shipment_items: vec![],
			shipment_description: "Mug".into(),
			remarks: None,
			special_instruction: None,
			cod_amount_to_collect: Decimal::new(29900, 2),
			requested_pickup_schedule: None,
			created_by_user_email: None,
		};

		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(value["ShippingReferenceNo"], "MKT-ord-1-1");
		assert_eq!(value["Recipient"]["AddressLine1"], "123 Main St");
		assert_eq!(value["CODAmountToCollect"], json!(299.0));
		assert!(value.get("Remarks").is_none());
	}

	#[test]
	fn test_party_overrides_accept_aliases() {
		let overrides: PartyOverrides = serde_json::from_value(json!({
			"address": "9 Side St",
			"barangay": "Poblacion"
		}))
		.unwrap();
		assert_eq!(overrides.address_line1.as_deref(), Some("9 Side St"));
		assert_eq!(overrides.district.as_deref(), Some("Poblacion"));
	}
}
