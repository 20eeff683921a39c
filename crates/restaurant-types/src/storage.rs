//! Storage namespaces.

use std::str::FromStr;

/// Namespaces under which records are stored.
///
/// Replaces string literals in storage calls with typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Orders, with their lines embedded
	Orders,
	/// Cart lines, one record per line
	CartLines,
	/// Registered customers
	Customers,
	/// Registered employees
	Employees,
	/// Id sequence counters
	Sequences,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::CartLines => "cart_lines",
			StorageKey::Customers => "customers",
			StorageKey::Employees => "employees",
			StorageKey::Sequences => "sequences",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::CartLines,
			Self::Customers,
			Self::Employees,
			Self::Sequences,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
