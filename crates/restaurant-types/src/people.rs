//! Customers and employees.
//!
//! Only the fields the ordering workflow needs are kept: an id to resolve,
//! a display name for snapshots and, for customers, a contact email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
	pub id: u64,
	pub name: String,
	pub email: String,
	pub created_at: DateTime<Utc>,
}

/// A registered employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
	pub id: u64,
	pub name: String,
	pub created_at: DateTime<Utc>,
}
