//! Order record types for the fulfillment service.
//!
//! The order is created upstream by checkout. The fulfillment core reads its
//! items, payment and address fields and only ever writes the status, the
//! fulfillment stage, the embedded carrier record and the status history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A marketplace order as persisted in the order store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Opaque identifier, unique per store collection.
	pub id: String,
	/// Current order status.
	pub status: OrderStatus,
	/// Sub-stage while `status` is `to_ship`; `None` otherwise.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fulfillment_stage: Option<FulfillmentStage>,
	/// The buyer's identity.
	pub owner_id: String,
	/// Sellers associated with the order.
	#[serde(default)]
	pub seller_ids: Vec<String>,
	/// Purchased line items.
	#[serde(default)]
	pub items: Vec<LineItem>,
	/// Buyer-supplied address plus the carrier record once shipped.
	#[serde(default)]
	pub shipping_info: ShippingInfo,
	#[serde(default)]
	pub payment_info: PaymentInfo,
	#[serde(default)]
	pub summary: OrderSummary,
	/// Append-only status log.
	#[serde(default)]
	pub status_history: Vec<StatusHistoryEntry>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
	/// Returns the carrier tracking id if a shipment was already created.
	///
	/// Empty strings left behind by older writers count as unset.
	pub fn tracking_id(&self) -> Option<&str> {
		self.shipping_info
			.carrier
			.as_ref()
			.and_then(|record| record.tracking_id.as_deref())
			.filter(|id| !id.trim().is_empty())
	}

	/// Returns true if this order already has a carrier shipment.
	pub fn has_shipment(&self) -> bool {
		self.tracking_id().is_some()
	}

	/// Appends a status history entry for the current status and stage.
	pub fn push_history(&mut self, note: impl Into<String>, timestamp: DateTime<Utc>) {
		self.status_history.push(StatusHistoryEntry {
			status: self.status,
			stage: self.fulfillment_stage,
			note: note.into(),
			timestamp,
		});
	}
}

/// Status of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	Unpaid,
	Confirmed,
	ToShip,
	Shipping,
	Delivered,
	FailedDelivery,
	Cancelled,
	ReturnRefund,
}

impl OrderStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Unpaid => "unpaid",
			OrderStatus::Confirmed => "confirmed",
			OrderStatus::ToShip => "to_ship",
			OrderStatus::Shipping => "shipping",
			OrderStatus::Delivered => "delivered",
			OrderStatus::FailedDelivery => "failed_delivery",
			OrderStatus::Cancelled => "cancelled",
			OrderStatus::ReturnRefund => "return_refund",
		}
	}

	/// Terminal statuses accept no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderStatus::Delivered
				| OrderStatus::FailedDelivery
				| OrderStatus::Cancelled
				| OrderStatus::ReturnRefund
		)
	}

	/// Returns an iterator over all statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Unpaid,
			Self::Confirmed,
			Self::ToShip,
			Self::Shipping,
			Self::Delivered,
			Self::FailedDelivery,
			Self::Cancelled,
			Self::ReturnRefund,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| format!("unknown order status '{}'", s))
	}
}

/// Physical progress of an order while its status is `to_ship`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStage {
	ToPack,
	ToArrangement,
	ToHandOver,
}

impl FulfillmentStage {
	pub fn as_str(&self) -> &'static str {
		match self {
			FulfillmentStage::ToPack => "to_pack",
			FulfillmentStage::ToArrangement => "to_arrangement",
			FulfillmentStage::ToHandOver => "to_hand_over",
		}
	}
}

impl fmt::Display for FulfillmentStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Actions that move an order through the fulfillment lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentAction {
	MoveToShip,
	MoveToArrangement,
	MoveToHandOver,
	/// Only applied after a carrier shipment was created.
	ConfirmHandover,
	MarkDelivered,
	MarkFailedDelivery,
	Cancel,
	OpenReturnRefund,
}

impl FulfillmentAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			FulfillmentAction::MoveToShip => "move_to_ship",
			FulfillmentAction::MoveToArrangement => "move_to_arrangement",
			FulfillmentAction::MoveToHandOver => "move_to_hand_over",
			FulfillmentAction::ConfirmHandover => "confirm_handover",
			FulfillmentAction::MarkDelivered => "mark_delivered",
			FulfillmentAction::MarkFailedDelivery => "mark_failed_delivery",
			FulfillmentAction::Cancel => "cancel",
			FulfillmentAction::OpenReturnRefund => "open_return_refund",
		}
	}

	/// Administrative actions require the admin claim.
	pub fn is_administrative(&self) -> bool {
		matches!(
			self,
			FulfillmentAction::MarkDelivered
				| FulfillmentAction::MarkFailedDelivery
				| FulfillmentAction::Cancel
				| FulfillmentAction::OpenReturnRefund
		)
	}
}

impl fmt::Display for FulfillmentAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A purchased line item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
	#[serde(default)]
	pub product_id: String,
	pub name: String,
	pub quantity: u32,
	pub unit_price: Decimal,
	/// Per-unit declared value; the unit price is used when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub declared_value: Option<Decimal>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dimensions: Option<Dimensions>,
	/// Per-unit weight in kilograms.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub weight: Option<f64>,
}

/// Per-unit package dimensions in centimeters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Dimensions {
	pub length: f64,
	pub width: f64,
	pub height: f64,
}

/// Buyer-supplied shipping details plus the carrier record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub recipient_name: Option<String>,
	/// Free-text address line, possibly containing a barangay segment.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
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
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub carrier: Option<CarrierShipmentRecord>,
}

/// Outcome of a successful carrier shipment creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CarrierShipmentRecord {
	#[serde(default)]
	pub tracking_id: Option<String>,
	pub shipping_reference_no: String,
	pub total_shipping_amount: Decimal,
	pub requested_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pickup_schedule: Option<String>,
	/// Raw carrier response kept for audit and tracking replay.
	#[serde(default)]
	pub response: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
}

impl PaymentInfo {
	/// Returns true for cash-on-delivery payments.
	pub fn is_cod(&self) -> bool {
		self.method
			.as_deref()
			.is_some_and(|m| m.trim().eq_ignore_ascii_case("cod"))
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
	#[serde(default)]
	pub total: Decimal,
}

/// One entry of the append-only status history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
	pub status: OrderStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stage: Option<FulfillmentStage>,
	#[serde(default)]
	pub note: String,
	pub timestamp: DateTime<Utc>,
}
