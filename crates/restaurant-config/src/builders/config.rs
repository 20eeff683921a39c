//! Configuration builder for creating test and development configurations.

use crate::{CartConfig, Config, RestaurantConfig, StorageConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to an in-memory backend and the standard cart limits.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	restaurant_id: String,
	restaurant_name: String,
	storage_primary: String,
	storage_implementations: HashMap<String, toml::Value>,
	cart: CartConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		let mut storage_implementations = HashMap::new();
		storage_implementations.insert(
			"memory".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);
		Self {
			restaurant_id: "test-restaurant".to_string(),
			restaurant_name: "Test Restaurant".to_string(),
			storage_primary: "memory".to_string(),
			storage_implementations,
			cart: CartConfig::default(),
		}
	}

	pub fn restaurant_id(mut self, id: impl Into<String>) -> Self {
		self.restaurant_id = id.into();
		self
	}

	/// Uses the named backend as primary with the given options.
	pub fn storage(mut self, primary: impl Into<String>, options: toml::Value) -> Self {
		let primary = primary.into();
		self.storage_implementations.insert(primary.clone(), options);
		self.storage_primary = primary;
		self
	}

	pub fn cart(mut self, cart: CartConfig) -> Self {
		self.cart = cart;
		self
	}

	pub fn build(self) -> Config {
		Config {
			restaurant: RestaurantConfig {
				id: self.restaurant_id,
				name: self.restaurant_name,
			},
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations: self.storage_implementations,
			},
			cart: self.cart,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_build_passes_validation() {
		let config = ConfigBuilder::new().build();
		assert!(config.validate().is_ok());
		assert_eq!(config.storage.primary, "memory");
	}
}
