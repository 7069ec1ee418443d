//! State management for order fulfillment.

pub mod order;

pub use order::{
	advance_to_shipping, apply, forward_action, next_state, rules, FulfillmentState,
	TransitionError,
};
