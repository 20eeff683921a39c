//! Cart line types.
//!
//! A cart line belongs to one customer until it is consumed by an order.
//! Price and quantity are optional on the record because older rows may lack
//! them; [`CartLine::priced_quantity`] is the only place that fills them in.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a cart line currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartLineState {
	/// Waiting in the cart; consumed by the next order placement.
	InCart,
	/// Set aside at checkout; not consumed until reopened.
	CheckedOut,
}

impl CartLineState {
	pub fn as_str(&self) -> &'static str {
		match self {
			CartLineState::InCart => "in_cart",
			CartLineState::CheckedOut => "checked_out",
		}
	}
}

impl fmt::Display for CartLineState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A line in a customer's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
	pub id: Uuid,
	pub customer_id: u64,
	pub item_name: String,
	pub unit_price: Option<Decimal>,
	pub quantity: Option<u32>,
	pub state: CartLineState,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl CartLine {
	/// Creates an in-cart line.
	pub fn new(
		customer_id: u64,
		item_name: impl Into<String>,
		unit_price: Decimal,
		quantity: u32,
		now: DateTime<Utc>,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			customer_id,
			item_name: item_name.into(),
			unit_price: Some(unit_price),
			quantity: Some(quantity),
			state: CartLineState::InCart,
			created_at: now,
			updated_at: now,
		}
	}

	/// Price and quantity with missing values defaulted.
	///
	/// A missing price counts as zero. A missing or zero quantity counts as one.
	pub fn priced_quantity(&self) -> (Decimal, u32) {
		let price = self.unit_price.unwrap_or(Decimal::ZERO);
		let quantity = self.quantity.filter(|q| *q > 0).unwrap_or(1);
		(price, quantity)
	}

	/// `price * quantity` after defaulting.
	pub fn subtotal(&self) -> Decimal {
		let (price, quantity) = self.priced_quantity();
		price * Decimal::from(quantity)
	}

	pub fn is_in_cart(&self) -> bool {
		self.state == CartLineState::InCart
	}
}

/// One line as shown in a cart view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
	pub id: Uuid,
	pub item_name: String,
	pub item_price: Decimal,
	pub quantity: u32,
	pub subtotal: Decimal,
	pub state: CartLineState,
}

/// A customer's cart as shown to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
	pub customer_id: u64,
	pub items: Vec<CartItemView>,
	/// Sum of the subtotals of in-cart lines only.
	pub total: Decimal,
}

impl CartView {
	pub fn from_lines(customer_id: u64, lines: &[CartLine]) -> Self {
		let items = lines
			.iter()
			.map(|line| {
				let (item_price, quantity) = line.priced_quantity();
				CartItemView {
					id: line.id,
					item_name: line.item_name.clone(),
					item_price,
					quantity,
					subtotal: line.subtotal(),
					state: line.state,
				}
			})
			.collect();
		let total = lines
			.iter()
			.filter(|line| line.is_in_cart())
			.map(CartLine::subtotal)
			.sum();
		Self {
			customer_id,
			items,
			total,
		}
	}
}
