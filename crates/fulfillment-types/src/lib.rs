//! Common types module for the fulfillment service.
//!
//! This crate defines the data model shared by every fulfillment component:
//! the order record and its statuses, carrier payloads, caller identity,
//! HTTP API request/response shapes and configuration validation helpers.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Caller identity produced by credential verification.
pub mod auth;
/// Order record, statuses, fulfillment stages and status history.
pub mod order;
/// Buyer and seller profile records consulted while building shipments.
pub mod profile;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Redacting wrapper for credentials and API keys.
pub mod secret_string;
/// Carrier request payloads, caller overrides and carrier results.
pub mod shipment;
/// Storage collection keys.
pub mod storage;
/// Utility functions for display formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use api::*;
pub use auth::*;
pub use order::*;
pub use profile::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use shipment::*;
pub use storage::*;
pub use utils::{truncate_chars, truncate_id};
pub use validation::*;
