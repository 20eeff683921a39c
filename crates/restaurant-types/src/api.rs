//! Types handed to external callers.
//!
//! Snapshots are the read model of an order: flattened, camelCase and with
//! the customer's display name resolved. Error kinds carry the status code an
//! HTTP layer would answer with.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Order, OrderLine, OrderStatus};

/// One line of an order snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemSnapshot {
	pub id: Uuid,
	pub item_name: String,
	pub item_price: Decimal,
	pub quantity: u32,
	pub subtotal: Decimal,
}

impl From<&OrderLine> for OrderItemSnapshot {
	fn from(line: &OrderLine) -> Self {
		Self {
			id: line.id,
			item_name: line.item_name.clone(),
			item_price: line.unit_price,
			quantity: line.quantity,
			subtotal: line.line_total,
		}
	}
}

/// Read-only view of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
	pub order_id: Uuid,
	pub customer_id: u64,
	pub customer_name: String,
	pub employee_id: Option<u64>,
	pub items: Vec<OrderItemSnapshot>,
	pub total_price: Decimal,
	pub status: OrderStatus,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl OrderSnapshot {
	pub fn new(order: &Order, customer_name: impl Into<String>) -> Self {
		Self {
			order_id: order.id,
			customer_id: order.customer_id,
			customer_name: customer_name.into(),
			employee_id: order.employee_id,
			items: order.lines.iter().map(OrderItemSnapshot::from).collect(),
			total_price: order.total_amount,
			status: order.status,
			created_at: order.created_at,
			updated_at: order.updated_at,
		}
	}
}

/// Broad category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
	NotFound,
	BadRequest,
	Conflict,
	Forbidden,
	Internal,
}

impl ErrorKind {
	/// HTTP status code for this kind of failure.
	pub fn status_code(&self) -> u16 {
		match self {
			ErrorKind::NotFound => 404,
			ErrorKind::BadRequest => 400,
			ErrorKind::Conflict => 409,
			ErrorKind::Forbidden => 403,
			ErrorKind::Internal => 500,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::NotFound => "NOT_FOUND",
			ErrorKind::BadRequest => "BAD_REQUEST",
			ErrorKind::Conflict => "CONFLICT",
			ErrorKind::Forbidden => "FORBIDDEN",
			ErrorKind::Internal => "INTERNAL_ERROR",
		}
	}
}

/// Error body returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error code, e.g. `NOT_FOUND`
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// HTTP-equivalent status
	pub status: u16,
}

impl ErrorResponse {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			error: kind.as_str().to_string(),
			message: message.into(),
			status: kind.status_code(),
		}
	}
}
