//! Typed persistence for customers, employees, cart lines and orders.
//!
//! Reads return plain values or [`Versioned`] records when the caller will
//! later write back. Writes are collected in a [`UnitOfWork`] and applied
//! with one atomic commit.

use restaurant_storage::{StorageError, StorageService, Versioned, WriteBatch};
use restaurant_types::{CartLine, CartLineState, Customer, Employee, Order, OrderStatus, StorageKey};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

const CUSTOMERS: &str = "customers";
const EMPLOYEES: &str = "employees";

/// Maps `NotFound` to `None`, passing other errors through.
fn optional<T>(result: Result<T, StorageError>) -> Result<Option<T>, StorageError> {
	match result {
		Ok(value) => Ok(Some(value)),
		Err(StorageError::NotFound) => Ok(None),
		Err(e) => Err(e),
	}
}

/// Only the field needed to count orders by status.
#[derive(Deserialize)]
struct StatusProjection {
	status: OrderStatus,
}

/// Persistence collaborator over the typed storage service.
pub struct Repository {
	storage: Arc<StorageService>,
}

impl Repository {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub async fn find_customer_by_id(&self, id: u64) -> Result<Option<Customer>, StorageError> {
		optional(
			self.storage
				.retrieve(StorageKey::Customers.as_str(), &id.to_string())
				.await,
		)
	}

	pub async fn find_employee_by_id(&self, id: u64) -> Result<Option<Employee>, StorageError> {
		optional(
			self.storage
				.retrieve(StorageKey::Employees.as_str(), &id.to_string())
				.await,
		)
	}

	pub async fn find_cart_line(
		&self,
		id: Uuid,
	) -> Result<Option<Versioned<CartLine>>, StorageError> {
		optional(
			self.storage
				.retrieve_versioned(StorageKey::CartLines.as_str(), &id.to_string())
				.await,
		)
	}

	/// All lines of a customer in insertion order (creation time, then id).
	pub async fn find_cart_lines_by_customer(
		&self,
		customer_id: u64,
	) -> Result<Vec<Versioned<CartLine>>, StorageError> {
		let mut lines: Vec<Versioned<CartLine>> = self
			.storage
			.list_versioned(StorageKey::CartLines.as_str())
			.await?
			.into_iter()
			.filter(|line: &Versioned<CartLine>| line.value.customer_id == customer_id)
			.collect();
		lines.sort_by(|a, b| {
			(a.value.created_at, a.value.id).cmp(&(b.value.created_at, b.value.id))
		});
		Ok(lines)
	}

	/// Lines of a customer in the given state, in insertion order.
	pub async fn find_cart_lines_by_customer_and_state(
		&self,
		customer_id: u64,
		state: CartLineState,
	) -> Result<Vec<Versioned<CartLine>>, StorageError> {
		let mut lines = self.find_cart_lines_by_customer(customer_id).await?;
		lines.retain(|line| line.value.state == state);
		Ok(lines)
	}

	pub async fn find_order_by_id(&self, id: Uuid) -> Result<Option<Versioned<Order>>, StorageError> {
		optional(
			self.storage
				.retrieve_versioned(StorageKey::Orders.as_str(), &id.to_string())
				.await,
		)
	}

	/// Every order, oldest first.
	pub async fn find_orders(&self) -> Result<Vec<Order>, StorageError> {
		let mut orders: Vec<Order> = self.storage.list(StorageKey::Orders.as_str()).await?;
		orders.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
		Ok(orders)
	}

	/// Orders with the given status, oldest first.
	pub async fn find_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StorageError> {
		let mut orders = self.find_orders().await?;
		orders.retain(|order| order.status == status);
		Ok(orders)
	}

	pub async fn count_orders_by_status(&self, status: OrderStatus) -> Result<u64, StorageError> {
		let projections: Vec<StatusProjection> =
			self.storage.list(StorageKey::Orders.as_str()).await?;
		Ok(projections.iter().filter(|p| p.status == status).count() as u64)
	}

	pub async fn next_customer_id(&self) -> Result<u64, StorageError> {
		self.storage.next_id(CUSTOMERS).await
	}

	pub async fn next_employee_id(&self) -> Result<u64, StorageError> {
		self.storage.next_id(EMPLOYEES).await
	}

	/// Starts collecting writes for one atomic commit.
	pub fn begin(&self) -> UnitOfWork {
		UnitOfWork {
			batch: WriteBatch::new(),
		}
	}

	/// Applies every write of the unit, or none of them.
	pub async fn commit(&self, unit: UnitOfWork) -> Result<(), StorageError> {
		self.storage.commit(unit.batch).await
	}
}

/// Writes collected for one atomic commit.
///
/// Writes against a [`Versioned`] record only apply if the record still holds
/// the bytes it was read from; new records only apply if their key is free.
pub struct UnitOfWork {
	batch: WriteBatch,
}

impl UnitOfWork {
	pub fn insert_customer(&mut self, customer: &Customer) -> Result<&mut Self, StorageError> {
		self.batch
			.insert(StorageKey::Customers.as_str(), &customer.id.to_string(), customer)?;
		Ok(self)
	}

	pub fn insert_employee(&mut self, employee: &Employee) -> Result<&mut Self, StorageError> {
		self.batch
			.insert(StorageKey::Employees.as_str(), &employee.id.to_string(), employee)?;
		Ok(self)
	}

	/// Saves a new order with its lines.
	pub fn save_order(&mut self, order: &Order) -> Result<&mut Self, StorageError> {
		self.batch
			.insert(StorageKey::Orders.as_str(), &order.id.to_string(), order)?;
		Ok(self)
	}

	pub fn replace_order(
		&mut self,
		original: &Versioned<Order>,
		order: &Order,
	) -> Result<&mut Self, StorageError> {
		self.batch
			.replace(StorageKey::Orders.as_str(), original, order)?;
		Ok(self)
	}

	pub fn insert_cart_line(&mut self, line: &CartLine) -> Result<&mut Self, StorageError> {
		self.batch
			.insert(StorageKey::CartLines.as_str(), &line.id.to_string(), line)?;
		Ok(self)
	}

	pub fn replace_cart_line(
		&mut self,
		original: &Versioned<CartLine>,
		line: &CartLine,
	) -> Result<&mut Self, StorageError> {
		self.batch
			.replace(StorageKey::CartLines.as_str(), original, line)?;
		Ok(self)
	}

	pub fn delete_cart_lines(&mut self, lines: &[Versioned<CartLine>]) -> &mut Self {
		for line in lines {
			self.batch.delete_exact(StorageKey::CartLines.as_str(), line);
		}
		self
	}

	pub fn is_empty(&self) -> bool {
		self.batch.is_empty()
	}
}
