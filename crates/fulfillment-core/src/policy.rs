//! Authorization policy for order operations.

use crate::repository::ProfileDirectory;
use fulfillment_types::{truncate_id, AuthContext, Order, SellerProfile};
use futures::future::join_all;
use std::sync::Arc;

/// Why a caller may act on an order.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
	Owner,
	Admin,
	/// The caller owns or operates one of the order's sellers.
	Seller(SellerProfile),
	Denied,
}

impl Access {
	pub fn is_granted(&self) -> bool {
		!matches!(self, Access::Denied)
	}
}

/// Decides whether a caller may act on an order.
///
/// A caller may act on an order they bought, on any order when they hold the
/// admin claim, and on an order sold by a store whose owner account or email
/// matches theirs.
pub struct AuthorizationPolicy {
	profiles: Arc<dyn ProfileDirectory>,
}

impl AuthorizationPolicy {
	pub fn new(profiles: Arc<dyn ProfileDirectory>) -> Self {
		Self { profiles }
	}

	pub async fn can_act_on_order(&self, caller: &AuthContext, order: &Order) -> bool {
		self.access(caller, order).await.is_granted()
	}

	/// Resolves the caller's relation to `order`.
	///
	/// Seller records are fetched concurrently. A seller that cannot be read
	/// is treated as not matching.
	pub async fn access(&self, caller: &AuthContext, order: &Order) -> Access {
		if !caller.subject_id.is_empty() && caller.subject_id == order.owner_id {
			return Access::Owner;
		}
		if caller.is_admin() {
			return Access::Admin;
		}

		let lookups = order
			.seller_ids
			.iter()
			.map(|seller_id| self.profiles.seller(seller_id));

		for (seller_id, result) in order.seller_ids.iter().zip(join_all(lookups).await) {
			match result {
				Ok(Some(seller)) if seller_matches(&seller, caller) => {
					return Access::Seller(seller);
				},
				Ok(_) => {},
				Err(e) => tracing::warn!(
					seller_id = %truncate_id(seller_id),
					error = %e,
					"Seller lookup failed during authorization"
				),
			}
		}
		Access::Denied
	}
}

fn seller_matches(seller: &SellerProfile, caller: &AuthContext) -> bool {
	let owner_matches = seller
		.owner_user_id
		.as_deref()
		.is_some_and(|owner| !owner.is_empty() && owner == caller.subject_id);
	let email_matches = seller
		.email
		.as_deref()
		.is_some_and(|email| caller.email_matches(email));
	owner_matches || email_matches
}
