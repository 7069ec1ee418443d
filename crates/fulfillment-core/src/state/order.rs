//! Order fulfillment state machine.
//!
//! The single definition of which actions move an order between statuses
//! and fulfillment stages:
//!
//! ```text
//! confirmed --move_to_ship--> to_ship(to_pack)
//!   --move_to_arrangement--> to_ship(to_arrangement)
//!   --move_to_hand_over--> to_ship(to_hand_over)
//!   --confirm_handover--> shipping --mark_delivered--> delivered
//! ```
//!
//! Any non-terminal order can additionally be failed, cancelled or moved to
//! return/refund by an administrator. Leaving `to_ship` clears the stage.

use chrono::{DateTime, Utc};
use fulfillment_types::{
	FulfillmentAction, FulfillmentStage, Order, OrderStatus, TransitionRule,
};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while applying a transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
	#[error("Cannot {action} an order in status {status}{}", stage_suffix(.stage))]
	InvalidTransition {
		status: OrderStatus,
		stage: Option<FulfillmentStage>,
		action: FulfillmentAction,
	},
	/// Hand-over confirmation without a carrier shipment on record.
	#[error("Hand-over requires a carrier shipment")]
	ShipmentRequired,
}

fn stage_suffix(stage: &Option<FulfillmentStage>) -> String {
	stage.map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// Status and stage pair identifying a node of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FulfillmentState {
	pub status: OrderStatus,
	pub stage: Option<FulfillmentStage>,
}

impl FulfillmentState {
	/// Normalized state of `order`.
	///
	/// The stage is only meaningful while the order is `to_ship`; a `to_ship`
	/// order without a stage predates stage tracking and counts as `to_pack`.
	pub fn of(order: &Order) -> Self {
		let stage = match order.status {
			OrderStatus::ToShip => Some(order.fulfillment_stage.unwrap_or(FulfillmentStage::ToPack)),
			_ => None,
		};
		Self {
			status: order.status,
			stage,
		}
	}

	const fn new(status: OrderStatus, stage: Option<FulfillmentStage>) -> Self {
		Self { status, stage }
	}
}

const ADMINISTRATIVE_EXITS: [(FulfillmentAction, OrderStatus); 3] = [
	(FulfillmentAction::MarkFailedDelivery, OrderStatus::FailedDelivery),
	(FulfillmentAction::Cancel, OrderStatus::Cancelled),
	(FulfillmentAction::OpenReturnRefund, OrderStatus::ReturnRefund),
];

/// Forward path, in lifecycle order.
const FORWARD: [(FulfillmentState, FulfillmentAction, FulfillmentState); 5] = [
	(
		FulfillmentState::new(OrderStatus::Confirmed, None),
		FulfillmentAction::MoveToShip,
		FulfillmentState::new(OrderStatus::ToShip, Some(FulfillmentStage::ToPack)),
	),
	(
		FulfillmentState::new(OrderStatus::ToShip, Some(FulfillmentStage::ToPack)),
		FulfillmentAction::MoveToArrangement,
		FulfillmentState::new(OrderStatus::ToShip, Some(FulfillmentStage::ToArrangement)),
	),
	(
		FulfillmentState::new(OrderStatus::ToShip, Some(FulfillmentStage::ToArrangement)),
		FulfillmentAction::MoveToHandOver,
		FulfillmentState::new(OrderStatus::ToShip, Some(FulfillmentStage::ToHandOver)),
	),
	(
		FulfillmentState::new(OrderStatus::ToShip, Some(FulfillmentStage::ToHandOver)),
		FulfillmentAction::ConfirmHandover,
		FulfillmentState::new(OrderStatus::Shipping, None),
	),
	(
		FulfillmentState::new(OrderStatus::Shipping, None),
		FulfillmentAction::MarkDelivered,
		FulfillmentState::new(OrderStatus::Delivered, None),
	),
];

/// Every non-terminal state.
fn live_states() -> Vec<FulfillmentState> {
	let mut states = vec![
		FulfillmentState::new(OrderStatus::Unpaid, None),
		FulfillmentState::new(OrderStatus::Confirmed, None),
	];
	states.extend(
		[
			FulfillmentStage::ToPack,
			FulfillmentStage::ToArrangement,
			FulfillmentStage::ToHandOver,
		]
		.into_iter()
		.map(|stage| FulfillmentState::new(OrderStatus::ToShip, Some(stage))),
	);
	states.push(FulfillmentState::new(OrderStatus::Shipping, None));
	states
}

/// Ordered transition table; the map below is derived from it.
static RULES: Lazy<Vec<(FulfillmentState, FulfillmentAction, FulfillmentState)>> =
	Lazy::new(|| {
		let mut rules = FORWARD.to_vec();
		for from in live_states() {
			for (action, status) in ADMINISTRATIVE_EXITS {
				rules.push((from, action, FulfillmentState::new(status, None)));
			}
		}
		rules
	});

static TRANSITIONS: Lazy<HashMap<(FulfillmentState, FulfillmentAction), FulfillmentState>> =
	Lazy::new(|| {
		RULES
			.iter()
			.map(|(from, action, to)| ((*from, *action), *to))
			.collect()
	});

/// Returns the state `action` leads to from `from`, if the move is legal.
pub fn next_state(from: FulfillmentState, action: FulfillmentAction) -> Option<FulfillmentState> {
	TRANSITIONS.get(&(from, action)).copied()
}

/// The next step towards `shipping`, if `from` is on the forward path
/// before it.
pub fn forward_action(from: FulfillmentState) -> Option<FulfillmentAction> {
	FORWARD
		.iter()
		.take_while(|(_, _, to)| to.status != OrderStatus::Delivered)
		.find(|(state, _, _)| *state == from)
		.map(|(_, action, _)| *action)
}

/// Applies `action` to `order` and appends a history entry.
///
/// `confirm_handover` additionally requires the order to carry a carrier
/// tracking id.
pub fn apply(
	order: &mut Order,
	action: FulfillmentAction,
	note: Option<&str>,
	now: DateTime<Utc>,
) -> Result<(), TransitionError> {
	let from = FulfillmentState::of(order);
	let to = next_state(from, action).ok_or(TransitionError::InvalidTransition {
		status: from.status,
		stage: from.stage,
		action,
	})?;

	if action == FulfillmentAction::ConfirmHandover && !order.has_shipment() {
		return Err(TransitionError::ShipmentRequired);
	}

	order.status = to.status;
	order.fulfillment_stage = to.stage;
	order.updated_at = Some(now);

	let note = note
		.map(str::trim)
		.filter(|n| !n.is_empty())
		.map(str::to_string)
		.unwrap_or_else(|| action.as_str().to_string());
	order.push_history(note, now);
	Ok(())
}

/// Moves `order` to `shipping` along the forward path with a single history
/// entry.
///
/// Skipped stages are validated against the transition table but not
/// recorded as separate moves; the entry names the stage the order was
/// handed over from.
pub fn advance_to_shipping(
	order: &mut Order,
	note: &str,
	now: DateTime<Utc>,
) -> Result<(), TransitionError> {
	if !order.has_shipment() {
		return Err(TransitionError::ShipmentRequired);
	}

	let start = FulfillmentState::of(order);
	let mut state = start;
	while state.status != OrderStatus::Shipping {
		let rejected = TransitionError::InvalidTransition {
			status: state.status,
			stage: state.stage,
			action: FulfillmentAction::ConfirmHandover,
		};
		let action = forward_action(state).ok_or_else(|| rejected.clone())?;
		state = next_state(state, action).ok_or(rejected)?;
	}

	order.status = state.status;
	order.fulfillment_stage = state.stage;
	order.updated_at = Some(now);

	let from = match start.stage {
		Some(stage) => stage.as_str(),
		None => start.status.as_str(),
	};
	order.push_history(format!("{} (from {})", note.trim(), from), now);
	Ok(())
}

/// The transition table in lifecycle order.
pub fn rules() -> Vec<TransitionRule> {
	RULES
		.iter()
		.map(|(from, action, to)| TransitionRule {
			from_status: from.status,
			from_stage: from.stage,
			action: *action,
			to_status: to.status,
			to_stage: to.stage,
			administrative: action.is_administrative(),
		})
		.collect()
}
