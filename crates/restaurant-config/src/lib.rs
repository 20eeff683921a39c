//! Restaurant configuration.
//!
//! A configuration is TOML with `[restaurant]`, `[storage]` and `[cart]`
//! sections. Values may reference the environment as `${NAME}` or
//! `${NAME:-fallback}`.
//!
//! The entry file can pull other files in with `include = ["storage.toml"]`.
//! A section may be defined in only one of them.

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

use regex::{Captures, Regex};
use restaurant_types::{Field, FieldType, Schema};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// keep the message, drop the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this restaurant instance.
	pub restaurant: RestaurantConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Limits applied to cart edits.
	#[serde(default)]
	pub cart: CartConfig,
}

/// Identity of this restaurant instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestaurantConfig {
	/// Unique identifier, used in logs.
	pub id: String,
	/// Display name.
	#[serde(default = "default_restaurant_name")]
	pub name: String,
}

fn default_restaurant_name() -> String {
	"Restaurant".to_string()
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Limits applied when items are added to or changed in a cart.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CartConfig {
	#[serde(default = "default_min_quantity")]
	pub min_quantity: u32,
	#[serde(default = "default_max_quantity")]
	pub max_quantity: u32,
	/// Maximum item name length in characters.
	#[serde(default = "default_max_item_name_length")]
	pub max_item_name_length: usize,
	#[serde(default = "default_min_price")]
	pub min_price: Decimal,
	#[serde(default = "default_max_price")]
	pub max_price: Decimal,
	/// Maximum number of fraction digits in a price.
	#[serde(default = "default_price_decimal_places")]
	pub price_decimal_places: u32,
}

fn default_min_quantity() -> u32 {
	1
}

fn default_max_quantity() -> u32 {
	99
}

fn default_max_item_name_length() -> usize {
	100
}

fn default_min_price() -> Decimal {
	Decimal::new(1, 2) // 0.01
}

fn default_max_price() -> Decimal {
	Decimal::new(999_999, 2) // 9999.99
}

fn default_price_decimal_places() -> u32 {
	2
}

impl Default for CartConfig {
	fn default() -> Self {
		Self {
			min_quantity: default_min_quantity(),
			max_quantity: default_max_quantity(),
			max_item_name_length: default_max_item_name_length(),
			min_price: default_min_price(),
			max_price: default_max_price(),
			price_decimal_places: default_price_decimal_places(),
		}
	}
}

/// Schema for the raw `[cart]` table, checked before deserialization.
fn cart_schema() -> Schema {
	let non_negative = || FieldType::Decimal {
		min: Some(Decimal::ZERO),
		max: None,
	};
	Schema::new(
		vec![],
		vec![
			Field::new(
				"min_quantity",
				FieldType::Integer {
					min: Some(1),
					max: Some(i64::from(u32::MAX)),
				},
			),
			Field::new(
				"max_quantity",
				FieldType::Integer {
					min: Some(1),
					max: Some(i64::from(u32::MAX)),
				},
			),
			Field::new(
				"max_item_name_length",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			),
			Field::new("min_price", non_negative()),
			Field::new("max_price", non_negative()),
			Field::new(
				"price_decimal_places",
				FieldType::Integer {
					min: Some(0),
					max: Some(28),
				},
			),
		],
	)
}

/// Substitutes `${NAME}` and `${NAME:-fallback}` with environment values.
///
/// Names are upper-case identifiers. A reference without a fallback to an
/// unset variable is an error. Input is capped at 1 MiB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration is {} bytes, above the {} byte limit",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let pattern = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(e.to_string()))?;

	let mut missing = None;
	let resolved = pattern.replace_all(input, |caps: &Captures| {
		let name = &caps[1];
		match (std::env::var(name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(fallback)) => fallback.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' is not set",
			name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Parses and validates an already env-resolved TOML value.
	pub(crate) fn from_value(value: toml::Value) -> Result<Self, ConfigError> {
		if let Some(cart) = value.get("cart") {
			cart_schema()
				.validate(cart)
				.map_err(|e| ConfigError::Validation(format!("[cart] {}", e)))?;
		}
		let config: Config = value.try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.restaurant.id.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Restaurant ID cannot be empty".into(),
			));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		let cart = &self.cart;
		if cart.min_quantity == 0 {
			return Err(ConfigError::Validation(
				"cart.min_quantity must be at least 1".into(),
			));
		}
		if cart.min_quantity > cart.max_quantity {
			return Err(ConfigError::Validation(format!(
				"cart.min_quantity ({}) cannot exceed cart.max_quantity ({})",
				cart.min_quantity, cart.max_quantity
			)));
		}
		if cart.max_item_name_length == 0 {
			return Err(ConfigError::Validation(
				"cart.max_item_name_length must be at least 1".into(),
			));
		}
		if cart.min_price.is_sign_negative() {
			return Err(ConfigError::Validation(
				"cart.min_price cannot be negative".into(),
			));
		}
		if cart.min_price > cart.max_price {
			return Err(ConfigError::Validation(format!(
				"cart.min_price ({}) cannot exceed cart.max_price ({})",
				cart.min_price, cart.max_price
			)));
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let value: toml::Value = toml::from_str(&resolved)?;
		Config::from_value(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[restaurant]
id = "bistro"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TEST_RESTAURANT_HOST", "localhost");
		std::env::set_var("TEST_RESTAURANT_PORT", "5432");

		let input = "host = \"${TEST_RESTAURANT_HOST}:${TEST_RESTAURANT_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("TEST_RESTAURANT_HOST");
		std::env::remove_var("TEST_RESTAURANT_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${MISSING_RESTAURANT_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${MISSING_RESTAURANT_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("MISSING_RESTAURANT_VAR"));
	}

	#[test]
	fn test_minimal_config_uses_cart_defaults() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.restaurant.id, "bistro");
		assert_eq!(config.restaurant.name, "Restaurant");
		assert_eq!(config.storage.primary, "memory");
		assert_eq!(config.cart, CartConfig::default());
		assert_eq!(config.cart.max_quantity, 99);
		assert_eq!(config.cart.max_price, Decimal::new(999_999, 2));
	}

	#[test]
	fn test_cart_section_overrides() {
		let input = format!(
			"{}\n[cart]\nmax_quantity = 20\nmax_price = \"500.00\"\n",
			MINIMAL
		);
		let config: Config = input.parse().unwrap();
		assert_eq!(config.cart.max_quantity, 20);
		assert_eq!(config.cart.max_price, Decimal::new(50000, 2));
		assert_eq!(config.cart.min_quantity, 1);
	}

	#[test]
	fn test_cart_section_rejects_float_price() {
		let input = format!("{}\n[cart]\nmax_price = 12.5\n", MINIMAL);
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("max_price"));
	}

	#[test]
	fn test_cart_bounds_must_be_ordered() {
		let input = format!("{}\n[cart]\nmin_quantity = 10\nmax_quantity = 5\n", MINIMAL);
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("min_quantity"));
	}

	#[test]
	fn test_primary_storage_must_be_configured() {
		let input = r#"
[restaurant]
id = "bistro"

[storage]
primary = "file"
[storage.implementations.memory]
"#;
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary storage 'file'"));
	}

	#[test]
	fn test_empty_restaurant_id_rejected() {
		let input = MINIMAL.replace("\"bistro\"", "\"\"");
		assert!(input.parse::<Config>().is_err());
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("TEST_RESTAURANT_ID", "env-bistro");

		let input = r#"
[restaurant]
id = "${TEST_RESTAURANT_ID}"
name = "${TEST_RESTAURANT_NAME:-Corner Bistro}"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "${TEST_RESTAURANT_STORAGE:-./data/storage}"
"#;
		let config: Config = input.parse().unwrap();
		assert_eq!(config.restaurant.id, "env-bistro");
		assert_eq!(config.restaurant.name, "Corner Bistro");
		assert_eq!(
			config.storage.implementations["file"]
				.get("storage_path")
				.and_then(|v| v.as_str()),
			Some("./data/storage")
		);

		std::env::remove_var("TEST_RESTAURANT_ID");
	}
}
