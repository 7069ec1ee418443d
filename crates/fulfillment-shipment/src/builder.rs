//! Carrier request construction.
//!
//! Every shipper and recipient attribute is resolved from up to four tiers,
//! highest first: the caller's override, the fetched profile record, the
//! order's stored shipping info, and the configured system default. The
//! first non-blank value wins.

use crate::address::{decompose, district_or};
use crate::BuildError;
use fulfillment_config::{AddressDefaults, ParcelProfile, ShipmentConfig, ShipperDefaults};
use fulfillment_types::{
	truncate_chars, CarrierShipmentRequest, LineItem, Order, PartyAddress, PartyOverrides,
	PostalAddress, SellerProfile, ShipmentItem, ShipmentItemOverride, ShipmentOverrides,
	ShippingInfo, UserProfile,
};
use rust_decimal::Decimal;

/// Maximum length of a derived shipment description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 100;

/// Inputs of a single build.
#[derive(Debug, Clone, Copy)]
pub struct BuildInput<'a> {
	pub order: &'a Order,
	pub overrides: &'a ShipmentOverrides,
	/// The buyer's profile, when it could be fetched.
	pub buyer: Option<&'a UserProfile>,
	/// Profile of the seller shipping the order, when it could be fetched.
	pub seller: Option<&'a SellerProfile>,
	/// Reference number generated for this creation attempt.
	pub reference_no: &'a str,
}

/// Builds carrier shipment requests from orders.
#[derive(Debug, Clone)]
pub struct ShipmentRequestBuilder {
	defaults: AddressDefaults,
	shipper: ShipperDefaults,
	parcel: ParcelProfile,
}

impl ShipmentRequestBuilder {
	pub fn new(defaults: AddressDefaults, shipper: ShipperDefaults, parcel: ParcelProfile) -> Self {
		Self {
			defaults,
			shipper,
			parcel,
		}
	}

	pub fn from_config(config: &ShipmentConfig) -> Self {
		Self::new(
			config.defaults.clone(),
			config.shipper.clone(),
			config.parcel,
		)
	}

	/// Builds the carrier request, or reports the first field that could not
	/// be resolved. Performs no I/O.
	pub fn build(&self, input: BuildInput<'_>) -> Result<CarrierShipmentRequest, BuildError> {
		let BuildInput {
			order,
			overrides,
			buyer,
			seller,
			reference_no,
		} = input;

		let recipient = resolve_party(
			"recipient",
			&[
				Tier::from_overrides(overrides.recipient_info.as_ref()),
				Tier::from_user(buyer),
				Tier::from_shipping_info(&order.shipping_info),
				Tier::from_defaults(&self.defaults),
			],
		)?;

		let shipper = resolve_party(
			"shipper",
			&[
				Tier::from_overrides(overrides.shipper_info.as_ref()),
				Tier::from_seller(seller),
				Tier::from_shipper_defaults(&self.shipper, &self.defaults),
			],
		)?;

		let shipment_items = match overrides.shipment_items.as_deref() {
			Some(items) if !items.is_empty() => self.items_from_overrides(items)?,
			_ => self.items_from_order(&order.items)?,
		};

		let shipment_description = non_blank(overrides.shipment_description.as_deref())
			.map(str::to_string)
			.unwrap_or_else(|| describe(order));

		let cod_amount_to_collect = match overrides.cod_amount_to_collect {
			Some(amount) if amount.is_sign_negative() => {
				return Err(BuildError::InvalidAmount(format!(
					"codAmountToCollect cannot be negative: {}",
					amount
				)));
			},
			Some(amount) => amount,
			None if order.payment_info.is_cod() => order.summary.total,
			None => Decimal::ZERO,
		};

		Ok(CarrierShipmentRequest {
			shipping_reference_no: reference_no.to_string(),
			shipper,
			recipient,
			shipment_items,
			shipment_description,
			remarks: owned(
				non_blank(overrides.remarks.as_deref())
					.or(non_blank(order.shipping_info.notes.as_deref())),
			),
			special_instruction: owned(non_blank(overrides.special_instruction.as_deref())),
			cod_amount_to_collect,
			requested_pickup_schedule: owned(non_blank(
				overrides.requested_pickup_schedule.as_deref(),
			)),
			created_by_user_email: owned(non_blank(overrides.created_by_user_email.as_deref())),
		})
	}

	/// One parcel line per order item with quantity-scaled weight and value.
	fn items_from_order(&self, items: &[LineItem]) -> Result<Vec<ShipmentItem>, BuildError> {
		let derived: Vec<ShipmentItem> = items
			.iter()
			.filter(|item| item.quantity > 0)
			.map(|item| {
				let quantity = item.quantity;
				let dims = item.dimensions;
				let unit_value = item.declared_value.unwrap_or(item.unit_price);
				ShipmentItem {
					description: item.name.clone(),
					quantity,
					length: dims.map_or(self.parcel.length, |d| d.length),
					width: dims.map_or(self.parcel.width, |d| d.width),
					height: dims.map_or(self.parcel.height, |d| d.height),
					weight: item.weight.unwrap_or(self.parcel.weight) * f64::from(quantity),
					declared_value: unit_value * Decimal::from(quantity),
				}
			})
			.collect();

		if derived.is_empty() {
			return Err(BuildError::NoItems);
		}
		Ok(derived)
	}

	/// Caller-supplied parcel lines; missing measurements use the parcel
	/// profile scaled by quantity.
	fn items_from_overrides(
		&self,
		items: &[ShipmentItemOverride],
	) -> Result<Vec<ShipmentItem>, BuildError> {
		items
			.iter()
			.map(|item| {
				if item.quantity == 0 {
					return Err(BuildError::InvalidItem(format!(
						"'{}' has zero quantity",
						item.description
					)));
				}
				let measurements = [item.length, item.width, item.height, item.weight];
				if measurements.iter().flatten().any(|v| !v.is_finite() || *v <= 0.0) {
					return Err(BuildError::InvalidItem(format!(
						"'{}' has a non-positive measurement",
						item.description
					)));
				}
				Ok(ShipmentItem {
					description: item.description.clone(),
					quantity: item.quantity,
					length: item.length.unwrap_or(self.parcel.length),
					width: item.width.unwrap_or(self.parcel.width),
					height: item.height.unwrap_or(self.parcel.height),
					weight: item
						.weight
						.unwrap_or(self.parcel.weight * f64::from(item.quantity)),
					declared_value: item.declared_value.unwrap_or(Decimal::ZERO),
				})
			})
			.collect()
	}
}

/// Product names joined with ", ", cut to [`MAX_DESCRIPTION_CHARS`].
fn describe(order: &Order) -> String {
	let names: Vec<&str> = order
		.items
		.iter()
		.filter_map(|item| non_blank(Some(item.name.as_str())))
		.collect();

	if names.is_empty() {
		return format!("Order {}", order.id);
	}
	truncate_chars(&names.join(", "), MAX_DESCRIPTION_CHARS)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}

fn owned(value: Option<&str>) -> Option<String> {
	value.map(str::to_string)
}

/// Candidate values for one precedence tier.
#[derive(Debug, Default, Clone, Copy)]
struct Tier<'a> {
	/// Set only for the caller's override tier; an explicit district there
	/// outranks one parsed from the address line.
	explicit: bool,
	name: Option<&'a str>,
	contact_number: Option<&'a str>,
	email: Option<&'a str>,
	address_line: Option<&'a str>,
	district: Option<&'a str>,
	city: Option<&'a str>,
	province: Option<&'a str>,
	postal_code: Option<&'a str>,
	country: Option<&'a str>,
}

impl<'a> Tier<'a> {
	fn from_overrides(overrides: Option<&'a PartyOverrides>) -> Self {
		let Some(o) = overrides else {
			return Self {
				explicit: true,
				..Self::default()
			};
		};
		Self {
			explicit: true,
			name: o.name.as_deref(),
			contact_number: o.contact_number.as_deref(),
			email: o.email.as_deref(),
			address_line: o.address_line1.as_deref(),
			district: o.district.as_deref(),
			city: o.city.as_deref(),
			province: o.province.as_deref(),
			postal_code: o.postal_code.as_deref(),
			country: o.country.as_deref(),
		}
	}

	fn with_address(mut self, address: Option<&'a PostalAddress>) -> Self {
		if let Some(a) = address {
			self.address_line = a.line.as_deref();
			self.district = a.barangay.as_deref();
			self.city = a.city.as_deref();
			self.province = a.province.as_deref();
			self.postal_code = a.postal_code.as_deref();
			self.country = a.country.as_deref();
		}
		self
	}

	fn from_user(profile: Option<&'a UserProfile>) -> Self {
		let Some(p) = profile else {
			return Self::default();
		};
		Self {
			name: p.display_name.as_deref(),
			contact_number: p.phone.as_deref(),
			email: p.email.as_deref(),
			..Self::default()
		}
		.with_address(p.address.as_ref())
	}

	fn from_seller(profile: Option<&'a SellerProfile>) -> Self {
		let Some(p) = profile else {
			return Self::default();
		};
		Self {
			name: p.store_name.as_deref(),
			contact_number: p.phone.as_deref(),
			email: p.email.as_deref(),
			..Self::default()
		}
		.with_address(p.address.as_ref())
	}

	fn from_shipping_info(info: &'a ShippingInfo) -> Self {
		Self {
			explicit: false,
			name: info.recipient_name.as_deref(),
			contact_number: info.phone.as_deref(),
			email: info.email.as_deref(),
			address_line: info.address.as_deref(),
			district: info.barangay.as_deref(),
			city: info.city.as_deref(),
			province: info.province.as_deref(),
			postal_code: info.postal_code.as_deref(),
			country: info.country.as_deref(),
		}
	}

	fn from_defaults(defaults: &'a AddressDefaults) -> Self {
		Self {
			province: Some(defaults.province.as_str()),
			country: Some(defaults.country.as_str()),
			..Self::default()
		}
	}

	fn from_shipper_defaults(shipper: &'a ShipperDefaults, defaults: &'a AddressDefaults) -> Self {
		Self {
			name: shipper.name.as_deref(),
			contact_number: shipper.contact_number.as_deref(),
			email: shipper.email.as_deref(),
			address_line: shipper.address_line.as_deref(),
			city: shipper.city.as_deref(),
			postal_code: shipper.postal_code.as_deref(),
			..Self::from_defaults(defaults)
		}
	}
}

fn pick<'a>(tiers: &[Tier<'a>], field: impl Fn(&Tier<'a>) -> Option<&'a str>) -> Option<&'a str> {
	tiers.iter().find_map(|tier| non_blank(field(tier)))
}

fn resolve_party(party: &'static str, tiers: &[Tier<'_>]) -> Result<PartyAddress, BuildError> {
	let required = |field: &'static str, value: Option<&str>| {
		value
			.map(str::to_string)
			.ok_or(BuildError::MissingField { party, field })
	};

	let raw_line = pick(tiers, |t| t.address_line);
	let decomposed = decompose(raw_line.unwrap_or_default());
	if decomposed.line.is_empty() {
		return Err(BuildError::MissingField {
			party,
			field: "addressLine1",
		});
	}

	let explicit_district = pick(
		&tiers.iter().copied().filter(|t| t.explicit).collect::<Vec<_>>(),
		|t| t.district,
	);
	let fallback_district = pick(
		&tiers.iter().copied().filter(|t| !t.explicit).collect::<Vec<_>>(),
		|t| t.district,
	);
	let district = match explicit_district {
		Some(district) => district.to_string(),
		None => district_or(&decomposed, fallback_district),
	};

	Ok(PartyAddress {
		name: required("name", pick(tiers, |t| t.name))?,
		contact_number: required("contactNumber", pick(tiers, |t| t.contact_number))?,
		email: owned(pick(tiers, |t| t.email)),
		address_line1: decomposed.line,
		district,
		city: required("city", pick(tiers, |t| t.city))?,
		province: required("province", pick(tiers, |t| t.province))?,
		postal_code: owned(pick(tiers, |t| t.postal_code)),
		country: required("country", pick(tiers, |t| t.country))?,
	})
}
