//! Helper utilities for common operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Returns the current wall-clock time in UTC.
///
/// Every record timestamp in the workspace comes from here.
pub fn current_time() -> DateTime<Utc> {
	Utc::now()
}

/// Number of fraction digits carried by `amount` once trailing zeros are dropped.
///
/// `1.50` has a money scale of 1, `12.99` of 2.
pub fn money_scale(amount: Decimal) -> u32 {
	amount.normalize().scale()
}
