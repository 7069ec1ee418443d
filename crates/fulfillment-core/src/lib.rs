//! Core fulfillment engine for the marketplace.
//!
//! This crate owns the order fulfillment state machine and the carrier
//! shipment orchestrator. It composes the order repository, the
//! authorization policy, the shipment request builder and the carrier
//! client into the operations exposed by the service: shipment creation,
//! tracking lookup and stage transitions.

use fulfillment_auth::AuthError;
use thiserror::Error;

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod policy;
pub mod repository;
pub mod state;

pub use builder::{BuilderError, FulfillmentBuilder, FulfillmentFactories};
pub use engine::FulfillmentEngine;
pub use handlers::{ShipmentOrchestrator, TrackingService, TransitionHandler};
pub use policy::{Access, AuthorizationPolicy};
pub use repository::{
	OrderMutation, OrderRepository, ProfileDirectory, RepositoryError, StorageOrderRepository,
	StorageProfileDirectory,
};

/// Failures of a fulfillment operation, by kind.
///
/// Callers branch on the variant; each maps to one response class.
#[derive(Debug, Error)]
pub enum FulfillmentError {
	/// Missing or invalid credential.
	#[error("Authentication failed: {0}")]
	Authentication(String),
	/// The caller has no relation to the order.
	#[error("Not authorized to act on this order")]
	Authorization,
	#[error("{0}")]
	NotFound(String),
	/// The order already has a carrier shipment.
	#[error("Order already shipped with tracking id {tracking_id}")]
	DuplicateRequest { tracking_id: String },
	/// The order's status does not permit the action.
	#[error("{0}")]
	InvalidState(String),
	/// A required field could not be resolved or an input is malformed.
	#[error("{0}")]
	Validation(String),
	/// The carrier call did not produce a usable answer.
	#[error("Carrier transport error: {message}")]
	CarrierTransport {
		reference_no: String,
		message: String,
		raw_response: serde_json::Value,
	},
	/// The carrier declined the shipment.
	#[error("Carrier rejected shipment: {message}")]
	CarrierBusiness {
		reference_no: String,
		message: String,
		raw_response: serde_json::Value,
	},
	/// Lookup mode reserved for a later release.
	#[error("{0}")]
	NotImplemented(String),
	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<AuthError> for FulfillmentError {
	fn from(e: AuthError) -> Self {
		match e {
			AuthError::Configuration(message) => FulfillmentError::Internal(message),
			other => FulfillmentError::Authentication(other.to_string()),
		}
	}
}

impl From<RepositoryError> for FulfillmentError {
	fn from(e: RepositoryError) -> Self {
		match e {
			RepositoryError::NotFound(id) => {
				FulfillmentError::NotFound(format!("Order {} not found", id))
			},
			RepositoryError::Conflict { tracking_id } => {
				FulfillmentError::DuplicateRequest { tracking_id }
			},
			RepositoryError::Rejected(e) => FulfillmentError::InvalidState(e.to_string()),
			RepositoryError::Storage(message) => FulfillmentError::Internal(message),
		}
	}
}
