//! Caller-driven stage transitions.

use super::load_authorized;
use crate::policy::AuthorizationPolicy;
use crate::repository::{OrderRepository, RepositoryError};
use crate::state::{self, FulfillmentState};
use crate::FulfillmentError;
use chrono::Utc;
use fulfillment_types::{truncate_id, AuthContext, FulfillmentAction, TransitionResponse};
use std::sync::Arc;
use tracing::instrument;

/// Applies fulfillment actions requested by sellers and administrators.
///
/// `confirm_handover` is never accepted here. It is only applied by the
/// shipment orchestrator after the carrier accepted a shipment.
pub struct TransitionHandler {
	orders: Arc<dyn OrderRepository>,
	policy: Arc<AuthorizationPolicy>,
}

impl TransitionHandler {
	pub fn new(orders: Arc<dyn OrderRepository>, policy: Arc<AuthorizationPolicy>) -> Self {
		Self { orders, policy }
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), action = %action))]
	pub async fn transition(
		&self,
		caller: &AuthContext,
		order_id: &str,
		action: FulfillmentAction,
		note: Option<String>,
	) -> Result<TransitionResponse, FulfillmentError> {
		if action == FulfillmentAction::ConfirmHandover {
			return Err(FulfillmentError::Validation(
				"confirm_handover is applied by shipment creation".into(),
			));
		}

		let (order, _) =
			load_authorized(self.orders.as_ref(), &self.policy, caller, order_id).await?;

		if action.is_administrative() && !caller.is_admin() {
			return Err(FulfillmentError::Authorization);
		}

		// Fail fast without taking the write path; the mutation re-checks.
		let from = FulfillmentState::of(&order);
		if state::next_state(from, action).is_none() {
			let rejected = state::TransitionError::InvalidTransition {
				status: from.status,
				stage: from.stage,
				action,
			};
			return Err(FulfillmentError::InvalidState(rejected.to_string()));
		}

		let updated = self
			.orders
			.update(
				order_id,
				Box::new(move |order| {
					state::apply(order, action, note.as_deref(), Utc::now())
						.map_err(RepositoryError::from)
				}),
			)
			.await?;

		tracing::info!(
			status = %updated.status,
			stage = ?updated.fulfillment_stage,
			"Order transitioned"
		);

		Ok(TransitionResponse {
			order_id: updated.id,
			status: updated.status,
			fulfillment_stage: updated.fulfillment_stage,
		})
	}
}
