//! Core engine for the restaurant ordering system.
//!
//! Wires the repository, the order state machine and the services that
//! implement the exposed operations: placing orders from carts, moving
//! orders through their status workflow, editing carts and registering the
//! customers and employees those operations refer to.

use restaurant_config::Config;
use restaurant_storage::StorageService;
use std::sync::Arc;

pub mod builder;
pub mod handlers;
pub mod repository;
pub mod state;

pub use builder::{BuilderError, EngineBuilder, EngineFactories};
pub use handlers::{CartError, CartService, Directory, DirectoryError, OrderError, OrderService};
pub use repository::{Repository, UnitOfWork};
pub use state::{OrderStateError, OrderStateMachine, Transition};

/// The assembled restaurant engine.
pub struct RestaurantEngine {
	config: Config,
	storage: Arc<StorageService>,
	orders: OrderService,
	cart: CartService,
	directory: Directory,
}

impl RestaurantEngine {
	pub fn new(config: Config, storage: Arc<StorageService>) -> Self {
		let repository = Arc::new(Repository::new(storage.clone()));
		let state_machine = Arc::new(OrderStateMachine::new(repository.clone()));
		Self {
			orders: OrderService::new(repository.clone(), state_machine),
			cart: CartService::new(repository.clone(), config.cart.clone()),
			directory: Directory::new(repository),
			config,
			storage,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	pub fn orders(&self) -> &OrderService {
		&self.orders
	}

	pub fn cart(&self) -> &CartService {
		&self.cart
	}

	pub fn directory(&self) -> &Directory {
		&self.directory
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use restaurant_config::builders::ConfigBuilder;
	use restaurant_storage::implementations::memory::MemoryStorage;
	use restaurant_storage::{StorageError, StorageInterface, WriteOp};
	use restaurant_types::{
		CartLine, ConfigSchema, ErrorKind, OrderStatus, StorageKey, ValidationError,
	};
	use rust_decimal::Decimal;
	use std::str::FromStr;
	use std::sync::atomic::{AtomicBool, Ordering};
	use std::time::Duration;
	use uuid::Uuid;

	fn dec(s: &str) -> Decimal {
		Decimal::from_str(s).unwrap()
	}

	/// Memory backend whose commits can be made to fail.
	struct FlakyStorage {
		inner: MemoryStorage,
		fail_commits: Arc<AtomicBool>,
	}

	#[async_trait]
	impl StorageInterface for FlakyStorage {
		async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
			self.inner.get_bytes(key).await
		}

		async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
			self.inner.set_bytes(key, value).await
		}

		async fn delete(&self, key: &str) -> Result<(), StorageError> {
			self.inner.delete(key).await
		}

		async fn exists(&self, key: &str) -> Result<bool, StorageError> {
			self.inner.exists(key).await
		}

		async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
			self.inner.list(prefix).await
		}

		async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
			if self.fail_commits.load(Ordering::SeqCst) {
				return Err(StorageError::Backend("disk full".into()));
			}
			self.inner.commit(ops).await
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			struct NoOptions;
			impl ConfigSchema for NoOptions {
				fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
					Ok(())
				}
			}
			Box::new(NoOptions)
		}
	}

	fn engine() -> RestaurantEngine {
		RestaurantEngine::new(
			ConfigBuilder::new().build(),
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
		)
	}

	fn flaky_engine() -> (RestaurantEngine, Arc<AtomicBool>) {
		let fail_commits = Arc::new(AtomicBool::new(false));
		let backend = FlakyStorage {
			inner: MemoryStorage::new(),
			fail_commits: fail_commits.clone(),
		};
		let engine = RestaurantEngine::new(
			ConfigBuilder::new().build(),
			Arc::new(StorageService::new(Box::new(backend))),
		);
		(engine, fail_commits)
	}

	async fn customer(engine: &RestaurantEngine, name: &str) -> u64 {
		engine
			.directory()
			.register_customer(name, &format!("{}@example.com", name.to_lowercase()))
			.await
			.unwrap()
			.id
	}

	/// A customer with Pad Thai 8.50 x2 and Tea 1.50 x1 in the cart.
	async fn customer_with_cart(engine: &RestaurantEngine) -> u64 {
		let id = customer(engine, "Ana").await;
		engine
			.cart()
			.add_item(id, "Pad Thai", dec("8.50"), 2)
			.await
			.unwrap();
		engine.cart().add_item(id, "Tea", dec("1.50"), 1).await.unwrap();
		id
	}

	#[tokio::test]
	async fn test_place_order_from_cart() {
		let engine = engine();
		let customer_id = customer_with_cart(&engine).await;

		let snapshot = engine.orders().place_order(customer_id, None).await.unwrap();

		assert_eq!(snapshot.total_price, dec("18.50"));
		assert_eq!(snapshot.status, OrderStatus::Pending);
		assert_eq!(snapshot.customer_name, "Ana");
		assert_eq!(snapshot.items.len(), 2);
		assert_eq!(snapshot.items[0].item_name, "Pad Thai");
		assert_eq!(snapshot.items[0].subtotal, dec("17.00"));
		assert_eq!(snapshot.items[1].item_name, "Tea");
		assert_eq!(snapshot.items[1].subtotal, dec("1.50"));
		assert_eq!(snapshot.created_at, snapshot.updated_at);

		let cart = engine.cart().view(customer_id).await.unwrap();
		assert!(cart.items.is_empty());

		let stored = engine.orders().get_by_id(snapshot.order_id).await.unwrap();
		assert_eq!(stored, snapshot);
	}

	#[tokio::test]
	async fn test_place_order_with_employee() {
		let engine = engine();
		let customer_id = customer_with_cart(&engine).await;
		let employee = engine.directory().register_employee("Bo").await.unwrap();

		let snapshot = engine
			.orders()
			.place_order(customer_id, Some(employee.id))
			.await
			.unwrap();
		assert_eq!(snapshot.employee_id, Some(employee.id));

		let handled = engine.orders().list_by_employee(employee.id).await.unwrap();
		assert_eq!(handled.len(), 1);
	}

	#[tokio::test]
	async fn test_place_order_unknown_people() {
		let engine = engine();
		let customer_id = customer_with_cart(&engine).await;

		let err = engine.orders().place_order(999, None).await.unwrap_err();
		assert!(matches!(err, OrderError::CustomerNotFound(999)));
		assert_eq!(err.kind(), ErrorKind::NotFound);

		let err = engine
			.orders()
			.place_order(customer_id, Some(77))
			.await
			.unwrap_err();
		assert!(matches!(err, OrderError::EmployeeNotFound(77)));

		// nothing consumed
		assert_eq!(engine.cart().view(customer_id).await.unwrap().items.len(), 2);
	}

	#[tokio::test]
	async fn test_empty_cart_writes_nothing() {
		let engine = engine();
		let customer_id = customer(&engine, "Ana").await;

		let err = engine.orders().place_order(customer_id, None).await.unwrap_err();
		assert!(matches!(err, OrderError::EmptyCart(id) if id == customer_id));
		assert_eq!(err.kind(), ErrorKind::BadRequest);
		assert!(engine.orders().list_all().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_checked_out_lines_are_not_ordered() {
		let engine = engine();
		let customer_id = customer_with_cart(&engine).await;
		assert_eq!(engine.cart().check_out(customer_id).await.unwrap(), 2);

		let err = engine.orders().place_order(customer_id, None).await.unwrap_err();
		assert!(matches!(err, OrderError::EmptyCart(_)));

		engine.cart().reopen(customer_id).await.unwrap();
		let snapshot = engine.orders().place_order(customer_id, None).await.unwrap();
		assert_eq!(snapshot.total_price, dec("18.50"));
	}

	#[tokio::test]
	async fn test_missing_price_and_quantity_default() {
		let engine = engine();
		let customer_id = customer(&engine, "Ana").await;

		let now = restaurant_types::current_time();
		let mut free = CartLine::new(customer_id, "Water", Decimal::ONE, 1, now);
		free.unit_price = None;
		let mut single = CartLine::new(customer_id, "Cake", dec("4.25"), 1, now);
		single.quantity = None;
		for line in [&free, &single] {
			engine
				.storage()
				.store(StorageKey::CartLines.as_str(), &line.id.to_string(), line)
				.await
				.unwrap();
		}

		let snapshot = engine.orders().place_order(customer_id, None).await.unwrap();
		assert_eq!(snapshot.total_price, dec("4.25"));
		let water = snapshot.items.iter().find(|i| i.item_name == "Water").unwrap();
		assert_eq!(water.item_price, Decimal::ZERO);
		assert_eq!(water.quantity, 1);
		let cake = snapshot.items.iter().find(|i| i.item_name == "Cake").unwrap();
		assert_eq!(cake.quantity, 1);
	}

	#[tokio::test]
	async fn test_exact_decimal_totals() {
		let engine = engine();
		let customer_id = customer(&engine, "Ana").await;
		engine
			.cart()
			.add_item(customer_id, "Soup", dec("12.99"), 3)
			.await
			.unwrap();
		engine
			.cart()
			.add_item(customer_id, "Mint", dec("0.10"), 3)
			.await
			.unwrap();

		let snapshot = engine.orders().place_order(customer_id, None).await.unwrap();
		assert_eq!(snapshot.items[0].subtotal, dec("38.97"));
		assert_eq!(snapshot.items[1].subtotal, dec("0.30"));
		assert_eq!(snapshot.total_price, dec("39.27"));
	}

	#[tokio::test]
	async fn test_failed_commit_keeps_cart() {
		let (engine, fail_commits) = flaky_engine();
		let customer_id = customer_with_cart(&engine).await;

		fail_commits.store(true, Ordering::SeqCst);
		let err = engine.orders().place_order(customer_id, None).await.unwrap_err();
		assert!(matches!(err, OrderError::Storage(_)));
		assert_eq!(err.kind(), ErrorKind::Internal);
		fail_commits.store(false, Ordering::SeqCst);

		assert!(engine.orders().list_all().await.unwrap().is_empty());
		assert_eq!(engine.cart().view(customer_id).await.unwrap().items.len(), 2);
	}

	#[tokio::test]
	async fn test_double_submission_creates_one_order() {
		let engine = Arc::new(engine());
		let customer_id = customer_with_cart(&engine).await;

		let first = {
			let engine = engine.clone();
			tokio::spawn(async move { engine.orders().place_order(customer_id, None).await })
		};
		let second = {
			let engine = engine.clone();
			tokio::spawn(async move { engine.orders().place_order(customer_id, None).await })
		};
		let results = [first.await.unwrap(), second.await.unwrap()];

		assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
		for err in results.iter().filter_map(|r| r.as_ref().err()) {
			assert!(matches!(
				err,
				OrderError::Conflict(_) | OrderError::EmptyCart(_)
			));
		}
		assert_eq!(engine.orders().list_all().await.unwrap().len(), 1);
		assert!(engine.cart().view(customer_id).await.unwrap().items.is_empty());
	}

	#[tokio::test]
	async fn test_status_moves_forward_only() {
		let engine = engine();
		let customer_id = customer_with_cart(&engine).await;
		let placed = engine.orders().place_order(customer_id, None).await.unwrap();

		tokio::time::sleep(Duration::from_millis(5)).await;
		let started = engine
			.orders()
			.update_status(placed.order_id, "In Progress")
			.await
			.unwrap();
		assert_eq!(started.status, OrderStatus::InProgress);
		assert!(started.updated_at > placed.updated_at);
		assert_eq!(started.created_at, placed.created_at);

		let err = engine
			.orders()
			.update_status(placed.order_id, "Pending")
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			OrderError::InvalidTransition {
				from: OrderStatus::InProgress,
				to: OrderStatus::Pending
			}
		));

		let finished = engine
			.orders()
			.update_status(placed.order_id, "finish")
			.await
			.unwrap();
		assert_eq!(finished.status, OrderStatus::Finish);
	}

	#[tokio::test]
	async fn test_cancel_from_pending_and_in_progress() {
		let engine = engine();
		let customer_id = customer_with_cart(&engine).await;
		let first = engine.orders().place_order(customer_id, None).await.unwrap();
		engine.cart().add_item(customer_id, "Tea", dec("1.50"), 1).await.unwrap();
		let second = engine.orders().place_order(customer_id, None).await.unwrap();

		let cancelled = engine
			.orders()
			.update_status(first.order_id, "Cancelled")
			.await
			.unwrap();
		assert_eq!(cancelled.status, OrderStatus::Cancelled);

		engine
			.orders()
			.update_status(second.order_id, "In Progress")
			.await
			.unwrap();
		let cancelled = engine
			.orders()
			.update_status(second.order_id, "CANCELLED")
			.await
			.unwrap();
		assert_eq!(cancelled.status, OrderStatus::Cancelled);

		// cancelling again changes nothing
		let again = engine
			.orders()
			.update_status(second.order_id, "Cancelled")
			.await
			.unwrap();
		assert_eq!(again, cancelled);
	}

	#[tokio::test]
	async fn test_pending_cannot_skip_to_finish() {
		let engine = engine();
		let customer_id = customer_with_cart(&engine).await;
		let placed = engine.orders().place_order(customer_id, None).await.unwrap();

		let err = engine
			.orders()
			.update_status(placed.order_id, "Finish")
			.await
			.unwrap_err();
		assert!(matches!(err, OrderError::InvalidTransition { .. }));
		assert_eq!(err.kind(), ErrorKind::BadRequest);

		let unchanged = engine.orders().get_by_id(placed.order_id).await.unwrap();
		assert_eq!(unchanged.status, OrderStatus::Pending);
		assert_eq!(unchanged.updated_at, placed.updated_at);
	}

	#[tokio::test]
	async fn test_status_queries_ignore_case() {
		let engine = engine();
		let customer_id = customer_with_cart(&engine).await;
		let first = engine.orders().place_order(customer_id, None).await.unwrap();
		engine.cart().add_item(customer_id, "Tea", dec("1.50"), 1).await.unwrap();
		let second = engine.orders().place_order(customer_id, None).await.unwrap();

		let lower = engine.orders().get_by_status("pending").await.unwrap();
		let canonical = engine.orders().get_by_status("Pending").await.unwrap();
		assert_eq!(lower, canonical);
		assert_eq!(
			lower.iter().map(|s| s.order_id).collect::<Vec<_>>(),
			vec![first.order_id, second.order_id]
		);

		assert_eq!(engine.orders().count_by_status("PENDING").await.unwrap(), 2);
		assert_eq!(engine.orders().count_by_status("Finish").await.unwrap(), 0);

		let err = engine.orders().get_by_status("bogus").await.unwrap_err();
		assert!(matches!(err, OrderError::InvalidStatus(_)));
		assert!(engine.orders().count_by_status("").await.is_err());
		let err = engine
			.orders()
			.update_status(first.order_id, "Done")
			.await
			.unwrap_err();
		assert!(err.to_string().contains("Done"));
	}

	#[tokio::test]
	async fn test_listing_orders() {
		let engine = engine();
		let ana = customer_with_cart(&engine).await;
		let bo = customer(&engine, "Bo").await;
		engine.cart().add_item(bo, "Rice", dec("3.00"), 1).await.unwrap();

		let first = engine.orders().place_order(ana, None).await.unwrap();
		tokio::time::sleep(Duration::from_millis(2)).await;
		let second = engine.orders().place_order(bo, None).await.unwrap();

		let all = engine.orders().list_all().await.unwrap();
		assert_eq!(
			all.iter().map(|s| s.order_id).collect::<Vec<_>>(),
			vec![second.order_id, first.order_id]
		);

		let for_bo = engine.orders().list_by_customer(bo).await.unwrap();
		assert_eq!(for_bo.len(), 1);
		assert_eq!(for_bo[0].customer_name, "Bo");

		assert!(matches!(
			engine.orders().list_by_customer(404).await,
			Err(OrderError::CustomerNotFound(404))
		));
		assert!(matches!(
			engine.orders().get_by_id(Uuid::new_v4()).await,
			Err(OrderError::OrderNotFound(_))
		));
	}

	#[tokio::test]
	async fn test_file_backend_keeps_orders_across_restarts() {
		let dir = tempfile::TempDir::new().unwrap();
		let mut options = toml::map::Map::new();
		options.insert(
			"storage_path".to_string(),
			toml::Value::String(dir.path().display().to_string()),
		);
		let config = ConfigBuilder::new()
			.storage("file", toml::Value::Table(options))
			.build();
		let factories = || EngineFactories {
			storage_factories: restaurant_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		};

		let placed = {
			let engine = EngineBuilder::new(config.clone()).build(factories()).unwrap();
			let customer_id = customer_with_cart(&engine).await;
			engine.orders().place_order(customer_id, None).await.unwrap()
		};

		let engine = EngineBuilder::new(config).build(factories()).unwrap();
		let reloaded = engine.orders().get_by_id(placed.order_id).await.unwrap();
		assert_eq!(reloaded, placed);
		assert_eq!(
			engine.directory().register_customer("Bo", "bo@example.com").await.unwrap().id,
			2
		);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_engines_sharing_a_directory_place_one_order() {
		use restaurant_storage::implementations::file::FileStorage;

		let dir = tempfile::TempDir::new().unwrap();
		let open_engine = || {
			let backend = FileStorage::open(dir.path().to_path_buf()).unwrap();
			Arc::new(RestaurantEngine::new(
				ConfigBuilder::new().build(),
				Arc::new(StorageService::new(Box::new(backend))),
			))
		};
		let first = open_engine();
		let second = open_engine();

		for round in 1..=5 {
			let customer_id = customer_with_cart(&first).await;
			let place = |engine: Arc<RestaurantEngine>| {
				tokio::spawn(async move { engine.orders().place_order(customer_id, None).await })
			};
			let a = place(first.clone());
			let b = place(second.clone());
			let results = [a.await.unwrap(), b.await.unwrap()];

			assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
			assert_eq!(second.orders().list_all().await.unwrap().len(), round);
			assert!(first.cart().view(customer_id).await.unwrap().items.is_empty());
		}
	}
}
