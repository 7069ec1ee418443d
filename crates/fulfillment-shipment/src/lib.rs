//! Shipment request construction for the fulfillment service.
//!
//! Turns a stored order, optional caller overrides and the buyer and seller
//! profiles into the carrier's shipment creation payload. Nothing in this
//! crate performs I/O; profile lookups and the carrier call belong to the
//! orchestrator in `fulfillment-core`.

use thiserror::Error;

/// Free-text address decomposition.
pub mod address;
/// Tiered field resolution and carrier request assembly.
pub mod builder;
/// Shipping reference number generation.
pub mod reference;

pub use address::{decompose, district_or, DecomposedAddress, UNKNOWN_DISTRICT};
pub use builder::{BuildInput, ShipmentRequestBuilder, MAX_DESCRIPTION_CHARS};
pub use reference::ReferenceGenerator;

/// Errors raised while building a carrier request.
#[derive(Debug, Error)]
pub enum BuildError {
	/// No tier supplied a value for a required field.
	#[error("Missing {party} {field}")]
	MissingField {
		party: &'static str,
		field: &'static str,
	},
	/// A caller-supplied parcel line is unusable.
	#[error("Invalid shipment item: {0}")]
	InvalidItem(String),
	/// The order has no shippable line items.
	#[error("Order has no shippable items")]
	NoItems,
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
}
