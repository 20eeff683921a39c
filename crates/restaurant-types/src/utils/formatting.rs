//! String formatting utilities.
//!
//! Provides functions for formatting identifiers and money amounts for
//! display in logs and command output.

use rust_decimal::Decimal;

/// Utility function to truncate an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

/// Formats a money amount with exactly two fraction digits.
///
/// Amounts are rounded half away from zero, so `0.305` becomes `"0.31"`.
pub fn format_money(amount: Decimal) -> String {
	let rounded =
		amount.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
	format!("{:.2}", rounded)
}
