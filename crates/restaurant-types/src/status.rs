//! Order status values and the rules for moving between them.
//!
//! Orders follow a strict forward path, Pending -> In Progress -> Finish.
//! Cancellation is reachable from every status. Finish and Cancelled are
//! terminal apart from that universal move to Cancelled.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string does not name a known order status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid status value: '{value}'. Valid values are: Pending, In Progress, Finish, Cancelled")]
pub struct InvalidStatusError {
	/// The rejected input, verbatim.
	pub value: String,
}

/// Status of an order in the restaurant workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
	/// Order has been placed and waits for the kitchen.
	#[serde(rename = "Pending")]
	Pending,
	/// Order is being prepared.
	#[serde(rename = "In Progress")]
	InProgress,
	/// Order has been served.
	#[serde(rename = "Finish")]
	Finish,
	/// Order was cancelled.
	#[serde(rename = "Cancelled")]
	Cancelled,
}

/// Static transition table - each status maps to the statuses it may move to.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Pending,
		HashSet::from([OrderStatus::InProgress, OrderStatus::Cancelled]),
	);
	m.insert(
		OrderStatus::InProgress,
		HashSet::from([OrderStatus::Finish, OrderStatus::Cancelled]),
	);
	// terminal, except for cancellation
	m.insert(OrderStatus::Finish, HashSet::from([OrderStatus::Cancelled]));
	m.insert(OrderStatus::Cancelled, HashSet::from([OrderStatus::Cancelled]));
	m
});

impl OrderStatus {
	/// Status assigned to every newly placed order.
	pub const INITIAL: OrderStatus = OrderStatus::Pending;

	/// Returns the canonical string for this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Pending",
			OrderStatus::InProgress => "In Progress",
			OrderStatus::Finish => "Finish",
			OrderStatus::Cancelled => "Cancelled",
		}
	}

	/// Returns an iterator over all statuses in workflow order.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::InProgress,
			Self::Finish,
			Self::Cancelled,
		]
		.into_iter()
	}

	/// Parses a status string, ignoring ASCII case.
	///
	/// Empty and unknown strings are rejected with an error naming the
	/// offending value and the allowed set.
	pub fn parse(value: &str) -> Result<Self, InvalidStatusError> {
		Self::all()
			.find(|status| status.as_str().eq_ignore_ascii_case(value))
			.ok_or_else(|| InvalidStatusError {
				value: value.to_string(),
			})
	}

	/// Checks whether a string names a status without producing an error.
	pub fn is_valid(value: &str) -> bool {
		Self::parse(value).is_ok()
	}

	/// True for statuses that only allow the move to Cancelled.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Finish | OrderStatus::Cancelled)
	}

	/// Checks if moving from this status to `next` is allowed.
	pub fn can_transition_to(&self, next: OrderStatus) -> bool {
		TRANSITIONS
			.get(self)
			.is_some_and(|allowed| allowed.contains(&next))
	}
}

/// Checks a transition given as raw strings.
///
/// Returns `false` when either side is missing or does not parse; never fails.
pub fn is_valid_transition(current: Option<&str>, proposed: Option<&str>) -> bool {
	let (Some(current), Some(proposed)) = (current, proposed) else {
		return false;
	};
	match (OrderStatus::parse(current), OrderStatus::parse(proposed)) {
		(Ok(from), Ok(to)) => from.can_transition_to(to),
		_ => false,
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = InvalidStatusError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl From<OrderStatus> for &'static str {
	fn from(status: OrderStatus) -> Self {
		status.as_str()
	}
}
