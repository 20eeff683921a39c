//! Builder for constructing restaurant engines.
//!
//! Storage backends are created through factory functions looked up by the
//! names configured under `[storage.implementations]`.

use crate::RestaurantEngine;
use restaurant_config::Config;
use restaurant_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions needed to build a RestaurantEngine.
pub struct EngineFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for constructing a RestaurantEngine with pluggable storage.
pub struct EngineBuilder {
	config: Config,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine, creating every configured storage implementation
	/// that has a factory and using the primary one.
	pub fn build<SF>(self, factories: EngineFactories<SF>) -> Result<RestaurantEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.storage_factories.get(name) else {
				tracing::warn!(component = "storage", implementation = %name, "No factory registered, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					storage_impls.insert(name.clone(), implementation);
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
				},
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		if storage_impls.is_empty() {
			return Err(BuilderError::MissingComponent(
				"No valid storage implementations available".into(),
			));
		}

		let primary_storage = &self.config.storage.primary;
		let backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary_storage
			))
		})?;

		let storage = Arc::new(StorageService::new(backend));
		Ok(RestaurantEngine::new(self.config, storage))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use restaurant_config::builders::ConfigBuilder;
	use restaurant_storage::get_all_implementations;

	fn all_factories() -> EngineFactories<restaurant_storage::StorageFactory> {
		EngineFactories {
			storage_factories: get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[test]
	fn test_builds_with_memory_storage() {
		let engine = EngineBuilder::new(ConfigBuilder::new().build())
			.build(all_factories())
			.unwrap();
		assert_eq!(engine.config().restaurant.id, "test-restaurant");
	}

	#[test]
	fn test_builds_with_file_storage() {
		let dir = tempfile::TempDir::new().unwrap();
		let mut options = toml::map::Map::new();
		options.insert(
			"storage_path".to_string(),
			toml::Value::String(dir.path().display().to_string()),
		);
		let config = ConfigBuilder::new()
			.storage("file", toml::Value::Table(options))
			.build();

		let engine = EngineBuilder::new(config).build(all_factories());
		assert!(engine.is_ok());
	}

	#[test]
	fn test_missing_factory_is_reported() {
		let factories: EngineFactories<restaurant_storage::StorageFactory> = EngineFactories {
			storage_factories: HashMap::new(),
		};
		let result = EngineBuilder::new(ConfigBuilder::new().build()).build(factories);
		assert!(matches!(result, Err(BuilderError::MissingComponent(_))));
	}

	#[test]
	fn test_invalid_backend_options_fail() {
		let mut options = toml::map::Map::new();
		options.insert("storage_path".to_string(), toml::Value::Integer(3));
		let config = ConfigBuilder::new()
			.storage("file", toml::Value::Table(options))
			.build();

		let result = EngineBuilder::new(config).build(all_factories());
		assert!(matches!(result, Err(BuilderError::Config(msg)) if msg.contains("file")));
	}
}
