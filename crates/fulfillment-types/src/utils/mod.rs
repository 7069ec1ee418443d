//! Utility functions for common formatting needs.

pub mod formatting;

pub use formatting::{truncate_chars, truncate_id};
