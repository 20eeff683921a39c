//! Order types for the restaurant workflow.
//!
//! An order owns its lines: they are stored inside the order record, so the
//! two are always written and removed together.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::OrderStatus;

/// One item of a placed order.
///
/// Name and price are copied from the cart at placement time and do not
/// follow later menu changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
	pub id: Uuid,
	pub item_name: String,
	pub unit_price: Decimal,
	pub quantity: u32,
	/// Always `unit_price * quantity`.
	pub line_total: Decimal,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl OrderLine {
	/// Creates a line stamped with `now` and its total already computed.
	pub fn new(
		item_name: impl Into<String>,
		unit_price: Decimal,
		quantity: u32,
		now: DateTime<Utc>,
	) -> Self {
		Self {
			id: Uuid::new_v4(),
			item_name: item_name.into(),
			unit_price,
			quantity,
			line_total: unit_price * Decimal::from(quantity),
			created_at: now,
			updated_at: now,
		}
	}

	pub fn set_unit_price(&mut self, unit_price: Decimal) {
		self.unit_price = unit_price;
		self.recompute_total();
	}

	pub fn set_quantity(&mut self, quantity: u32) {
		self.quantity = quantity;
		self.recompute_total();
	}

	fn recompute_total(&mut self) {
		self.line_total = self.unit_price * Decimal::from(self.quantity);
	}
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Assigned at creation and never changed.
	pub id: Uuid,
	pub customer_id: u64,
	/// Employee handling the order, if any.
	pub employee_id: Option<u64>,
	/// Sum of all line totals.
	pub total_amount: Decimal,
	pub status: OrderStatus,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub lines: Vec<OrderLine>,
}

impl Order {
	/// Builds a pending order from its lines, all stamped with the same `now`.
	pub fn new(
		customer_id: u64,
		employee_id: Option<u64>,
		lines: Vec<OrderLine>,
		now: DateTime<Utc>,
	) -> Self {
		let total_amount = lines.iter().map(|line| line.line_total).sum();
		Self {
			id: Uuid::new_v4(),
			customer_id,
			employee_id,
			total_amount,
			status: OrderStatus::INITIAL,
			created_at: now,
			updated_at: now,
			lines,
		}
	}

	/// Number of items across all lines.
	pub fn item_count(&self) -> u64 {
		self.lines.iter().map(|line| u64::from(line.quantity)).sum()
	}
}
