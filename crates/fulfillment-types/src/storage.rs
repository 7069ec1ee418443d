//! Storage collection keys.

use std::str::FromStr;

/// Collections of the document store.
///
/// Orders live in two collections: the current one and the collection
/// written by the previous checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	Orders,
	LegacyOrders,
	Sellers,
	Users,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::LegacyOrders => "legacy_orders",
			StorageKey::Sellers => "sellers",
			StorageKey::Users => "users",
		}
	}

	/// Order collections in lookup order.
	pub fn order_collections() -> [StorageKey; 2] {
		[StorageKey::Orders, StorageKey::LegacyOrders]
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Orders, Self::LegacyOrders, Self::Sellers, Self::Users].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}
