//! Loader for configurations split across several files.
//!
//! The entry file may name other files in `include`, either as one path or as
//! an array of paths. Every top-level section must come from exactly one
//! file, no file may be read twice and included files cannot include further.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const INCLUDE_KEY: &str = "include";

/// Reads a configuration and the files it includes, relative to a root directory.
pub struct ConfigLoader {
	root: PathBuf,
	/// Canonical paths read so far.
	seen: HashSet<PathBuf>,
	/// File each top-level section was defined in.
	origins: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(root: impl AsRef<Path>) -> Self {
		Self {
			root: root.as_ref().to_path_buf(),
			seen: HashSet::new(),
			origins: HashMap::new(),
		}
	}

	/// Loads `entry` and its includes, then parses and validates the merged table.
	pub async fn load_config(&mut self, entry: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let entry = self.locate(entry.as_ref())?;
		let mut merged = self.read_table(&entry).await?;
		let includes = take_includes(&mut merged)?;
		self.claim_sections(&merged, &entry)?;

		for include in includes {
			let path = self.locate(&include)?;
			let table = self.read_table(&path).await?;
			if table.contains_key(INCLUDE_KEY) {
				return Err(ConfigError::Validation(format!(
					"{} includes other files; only the entry file may use '{}'",
					path.display(),
					INCLUDE_KEY
				)));
			}
			self.claim_sections(&table, &path)?;
			merged.extend(table);
		}

		Config::from_value(toml::Value::Table(merged))
	}

	fn locate(&self, path: &Path) -> Result<PathBuf, ConfigError> {
		let located = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.root.join(path)
		};
		if !located.is_file() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", located.display()),
			)));
		}
		Ok(located)
	}

	async fn read_table(&mut self, path: &Path) -> Result<toml::Table, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await?;
		if !self.seen.insert(canonical) {
			return Err(ConfigError::Validation(format!(
				"Circular include: {} was already loaded",
				path.display()
			)));
		}
		let text = tokio::fs::read_to_string(path).await?;
		Ok(toml::from_str(&resolve_env_vars(&text)?)?)
	}

	/// Records `source` as the origin of each section in `table`.
	fn claim_sections(&mut self, table: &toml::Table, source: &Path) -> Result<(), ConfigError> {
		for section in table.keys() {
			if let Some(previous) = self.origins.insert(section.clone(), source.to_path_buf()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}",
					section,
					previous.display(),
					source.display()
				)));
			}
		}
		Ok(())
	}
}

/// Removes and returns the include list of the entry file.
fn take_includes(table: &mut toml::Table) -> Result<Vec<PathBuf>, ConfigError> {
	let invalid = || {
		ConfigError::Validation(format!("'{}' must be a path or a list of paths", INCLUDE_KEY))
	};
	match table.remove(INCLUDE_KEY) {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.iter()
			.map(|item| item.as_str().map(PathBuf::from).ok_or_else(invalid))
			.collect(),
		Some(_) => Err(invalid()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");

		let config_content = r#"
[restaurant]
id = "bistro"
name = "Corner Bistro"

[storage]
primary = "memory"
[storage.implementations.memory]

[cart]
max_quantity = 50
"#;
		fs::write(&config_path, config_content).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config(&config_path).await.unwrap();

		assert_eq!(config.restaurant.id, "bistro");
		assert_eq!(config.cart.max_quantity, 50);
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();

		let main_config = r#"
include = ["storage.toml", "cart.toml"]

[restaurant]
id = "bistro"
"#;
		let storage_config = r#"
[storage]
primary = "file"
[storage.implementations.file]
storage_path = "./data"
"#;
		let cart_config = r#"
[cart]
max_price = "100.00"
"#;

		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(temp_dir.path().join("storage.toml"), storage_config).unwrap();
		fs::write(temp_dir.path().join("cart.toml"), cart_config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();

		assert_eq!(config.restaurant.id, "bistro");
		assert_eq!(config.storage.primary, "file");
		assert_eq!(config.cart.max_price.to_string(), "100.00");
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();

		let main_config = r#"
include = ["duplicate.toml"]

[restaurant]
id = "bistro"
"#;
		let duplicate_config = r#"
[restaurant]
id = "another"
"#;

		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(temp_dir.path().join("duplicate.toml"), duplicate_config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let result = loader.load_config("main.toml").await;

		let error_msg = result.unwrap_err().to_string();
		assert!(error_msg.contains("Duplicate section 'restaurant'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();

		let config = r#"
include = ["self.toml"]

[restaurant]
id = "bistro"
"#;
		fs::write(temp_dir.path().join("self.toml"), config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let result = loader.load_config("self.toml").await;

		let error_msg = result.unwrap_err().to_string();
		assert!(error_msg.contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include_is_reported() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = \"missing.toml\"\n[restaurant]\nid = \"x\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("main.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("missing.toml"));
	}

	#[tokio::test]
	async fn test_nested_include_is_rejected() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = \"storage.toml\"\n[restaurant]\nid = \"x\"\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("storage.toml"),
			"include = \"cart.toml\"\n[storage]\nprimary = \"memory\"\n",
		)
		.unwrap();
		fs::write(temp_dir.path().join("cart.toml"), "[cart]\n").unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("main.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("only the entry file"));
	}
}
