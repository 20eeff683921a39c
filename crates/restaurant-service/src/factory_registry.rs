//! Registry of storage backend factories.
//!
//! Backends are looked up by the names used under `[storage.implementations]`.

use restaurant_config::Config;
use restaurant_core::{EngineBuilder, EngineFactories, RestaurantEngine};
use restaurant_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Every backend the binary knows how to create.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();
		for (name, factory) in restaurant_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}
		registry
	})
}

/// Builds the engine, failing on any configured backend the registry lacks.
pub fn build_engine_from_config(
	config: Config,
) -> Result<RestaurantEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let mut storage_factories = HashMap::new();
	for name in config.storage.implementations.keys() {
		let Some(factory) = registry.storage.get(name) else {
			let mut available: Vec<_> = registry.storage.keys().cloned().collect();
			available.sort();
			return Err(format!(
				"Unknown storage implementation '{}'. Available: [{}]",
				name,
				available.join(", ")
			)
			.into());
		};
		storage_factories.insert(name.clone(), *factory);
	}

	let engine = EngineBuilder::new(config).build(EngineFactories { storage_factories })?;
	Ok(engine)
}

#[cfg(test)]
mod tests {
	use super::*;
	use restaurant_config::builders::ConfigBuilder;

	#[test]
	fn test_registry_knows_builtin_backends() {
		let registry = get_registry();
		assert!(registry.storage.contains_key("memory"));
		assert!(registry.storage.contains_key("file"));
	}

	#[test]
	fn test_unknown_backend_is_rejected() {
		let config = ConfigBuilder::new()
			.storage("redis", toml::Value::Table(toml::map::Map::new()))
			.build();
		let err = build_engine_from_config(config).err().unwrap();
		assert!(err.to_string().contains("Unknown storage implementation 'redis'"));
		assert!(err.to_string().contains("file, memory"));
	}

	#[test]
	fn test_builds_default_engine() {
		assert!(build_engine_from_config(ConfigBuilder::new().build()).is_ok());
	}
}
