//! Configuration validation utilities.
//!
//! Schemas describe the shape of a TOML table: which fields must be present,
//! which may be present, their types and any extra checks. Storage backends
//! and the `[cart]` section are validated through these helpers before
//! anything is built from them.

use rust_decimal::Decimal;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: &'static str,
		actual: &'static str,
	},
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// An integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	/// A decimal amount, written either as a TOML string (`"9999.99"`) or as
	/// an integer. Floats are rejected because they cannot hold money exactly.
	Decimal {
		min: Option<Decimal>,
		max: Option<Decimal>,
	},
}

/// Custom check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a check that runs once the value has the right type.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn invalid(&self, message: String) -> ValidationError {
		ValidationError::InvalidValue {
			field: self.name.clone(),
			message,
		}
	}

	fn mismatch(&self, expected: &'static str, value: &toml::Value) -> ValidationError {
		ValidationError::TypeMismatch {
			field: self.name.clone(),
			expected,
			actual: value.type_str(),
		}
	}

	fn within<T: PartialOrd + Display>(
		&self,
		value: T,
		min: Option<&T>,
		max: Option<&T>,
	) -> Result<(), ValidationError> {
		if let Some(min) = min.filter(|min| value < **min) {
			return Err(self.invalid(format!("Value {} is less than minimum {}", value, min)));
		}
		if let Some(max) = max.filter(|max| value > **max) {
			return Err(self.invalid(format!("Value {} is greater than maximum {}", value, max)));
		}
		Ok(())
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		match &self.field_type {
			FieldType::String => {
				if !value.is_str() {
					return Err(self.mismatch("string", value));
				}
			},
			FieldType::Integer { min, max } => {
				let number = value.as_integer().ok_or_else(|| self.mismatch("integer", value))?;
				self.within(number, min.as_ref(), max.as_ref())?;
			},
			FieldType::Decimal { min, max } => {
				let amount = decimal_from_toml(value).ok_or_else(|| self.mismatch("decimal", value))?;
				self.within(amount, min.as_ref(), max.as_ref())?;
			},
		}
		match &self.validator {
			Some(validator) => validator(value).map_err(|message| self.invalid(message)),
			None => Ok(()),
		}
	}
}

/// Validation schema for a TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a table; optional fields are checked only when present.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config.as_table().ok_or(ValidationError::TypeMismatch {
			field: "root".to_string(),
			expected: "table",
			actual: config.type_str(),
		})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}
		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}
		Ok(())
	}
}

/// Reads a decimal out of a TOML value.
///
/// Accepts strings holding a decimal literal and integers.
pub fn decimal_from_toml(value: &toml::Value) -> Option<Decimal> {
	match value {
		toml::Value::String(s) => Decimal::from_str(s.trim()).ok(),
		toml::Value::Integer(i) => Some(Decimal::from(*i)),
		_ => None,
	}
}

/// A configuration schema that can validate TOML values.
///
/// Backends return one of these so their options are checked before the
/// backend is constructed.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(s: &str) -> toml::Value {
		toml::from_str(s).unwrap()
	}

	fn cart_limits_schema() -> Schema {
		Schema::new(
			vec![Field::new(
				"max_quantity",
				FieldType::Integer {
					min: Some(1),
					max: Some(1000),
				},
			)],
			vec![
				Field::new(
					"max_price",
					FieldType::Decimal {
						min: Some(Decimal::ZERO),
						max: None,
					},
				),
				Field::new("label", FieldType::String).with_validator(|v| {
					if v.as_str().is_some_and(|s| s.is_empty()) {
						Err("must not be empty".to_string())
					} else {
						Ok(())
					}
				}),
			],
		)
	}

	#[test]
	fn test_accepts_valid_table() {
		let value = parse("max_quantity = 99\nmax_price = \"9999.99\"\nlabel = \"x\"");
		assert!(cart_limits_schema().validate(&value).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let value = parse("max_price = \"1.00\"");
		let err = cart_limits_schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::MissingField(f) if f == "max_quantity"));
	}

	#[test]
	fn test_integer_bounds() {
		let value = parse("max_quantity = 0");
		let err = cart_limits_schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { field, .. } if field == "max_quantity"));
	}

	#[test]
	fn test_decimal_rejects_float_and_negative() {
		let value = parse("max_quantity = 5\nmax_price = 1.5");
		let err = cart_limits_schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::TypeMismatch { expected, .. } if expected == "decimal"));

		let value = parse("max_quantity = 5\nmax_price = \"-1\"");
		let err = cart_limits_schema().validate(&value).unwrap_err();
		assert!(matches!(err, ValidationError::InvalidValue { .. }));
	}

	#[test]
	fn test_custom_validator_runs() {
		let value = parse("max_quantity = 5\nlabel = \"\"");
		let err = cart_limits_schema().validate(&value).unwrap_err();
		assert!(err.to_string().contains("must not be empty"));
	}

	#[test]
	fn test_decimal_from_toml() {
		assert_eq!(
			decimal_from_toml(&toml::Value::String("0.01".into())),
			Some(Decimal::new(1, 2))
		);
		assert_eq!(decimal_from_toml(&toml::Value::Integer(7)), Some(Decimal::from(7)));
		assert_eq!(decimal_from_toml(&toml::Value::Float(0.5)), None);
	}
}
