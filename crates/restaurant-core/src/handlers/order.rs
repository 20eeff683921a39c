//! Order placement and status handling.
//!
//! Converts a customer's cart into an order in one atomic write and exposes
//! the status workflow and read operations over placed orders.

use crate::repository::Repository;
use crate::state::{OrderStateError, OrderStateMachine, Transition};
use restaurant_storage::StorageError;
use restaurant_types::{
	current_time, truncate_id, CartLineState, ErrorKind, InvalidStatusError, Order, OrderLine,
	OrderSnapshot, OrderStatus,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Errors returned by order operations.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error("Customer not found: {0}")]
	CustomerNotFound(u64),
	#[error("Employee not found: {0}")]
	EmployeeNotFound(u64),
	#[error("Order not found: {0}")]
	OrderNotFound(Uuid),
	#[error("Cart is empty for customer {0}. Cannot place order.")]
	EmptyCart(u64),
	#[error(transparent)]
	InvalidStatus(#[from] InvalidStatusError),
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl OrderError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			OrderError::CustomerNotFound(_)
			| OrderError::EmployeeNotFound(_)
			| OrderError::OrderNotFound(_) => ErrorKind::NotFound,
			OrderError::EmptyCart(_)
			| OrderError::InvalidStatus(_)
			| OrderError::InvalidTransition { .. } => ErrorKind::BadRequest,
			OrderError::Conflict(_) => ErrorKind::Conflict,
			OrderError::Storage(_) => ErrorKind::Internal,
		}
	}
}

impl From<StorageError> for OrderError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::Conflict(key) => OrderError::Conflict(key),
			other => OrderError::Storage(other.to_string()),
		}
	}
}

impl From<OrderStateError> for OrderError {
	fn from(err: OrderStateError) -> Self {
		match err {
			OrderStateError::OrderNotFound(id) => OrderError::OrderNotFound(id),
			OrderStateError::InvalidTransition { from, to } => {
				OrderError::InvalidTransition { from, to }
			},
			OrderStateError::Conflict(id) => {
				OrderError::Conflict(format!("order {} was modified concurrently", id))
			},
			OrderStateError::Storage(msg) => OrderError::Storage(msg),
		}
	}
}

/// Service owning the cart-to-order workflow and order queries.
pub struct OrderService {
	repository: Arc<Repository>,
	state_machine: Arc<OrderStateMachine>,
}

impl OrderService {
	pub fn new(repository: Arc<Repository>, state_machine: Arc<OrderStateMachine>) -> Self {
		Self {
			repository,
			state_machine,
		}
	}

	/// Places an order from every in-cart line of the customer.
	///
	/// The new order and the removal of the consumed cart lines are committed
	/// together. If any consumed line changed or disappeared since it was read,
	/// nothing is written and `Conflict` is returned.
	#[instrument(skip(self))]
	pub async fn place_order(
		&self,
		customer_id: u64,
		employee_id: Option<u64>,
	) -> Result<OrderSnapshot, OrderError> {
		let now = current_time();

		let customer = self
			.repository
			.find_customer_by_id(customer_id)
			.await?
			.ok_or(OrderError::CustomerNotFound(customer_id))?;
		if let Some(employee_id) = employee_id {
			self.repository
				.find_employee_by_id(employee_id)
				.await?
				.ok_or(OrderError::EmployeeNotFound(employee_id))?;
		}

		let cart_lines = self
			.repository
			.find_cart_lines_by_customer_and_state(customer_id, CartLineState::InCart)
			.await?;
		if cart_lines.is_empty() {
			return Err(OrderError::EmptyCart(customer_id));
		}

		let lines = cart_lines
			.iter()
			.map(|line| {
				let (price, quantity) = line.value.priced_quantity();
				OrderLine::new(line.value.item_name.clone(), price, quantity, now)
			})
			.collect();
		let order = Order::new(customer_id, employee_id, lines, now);

		let mut unit = self.repository.begin();
		unit.save_order(&order)?;
		unit.delete_cart_lines(&cart_lines);
		self.repository.commit(unit).await.map_err(|e| match e {
			StorageError::Conflict(key) => {
				warn!(customer_id, %key, "Cart changed while placing order");
				OrderError::Conflict(format!(
					"cart of customer {} changed while the order was being placed",
					customer_id
				))
			},
			other => OrderError::from(other),
		})?;

		info!(
			order_id = %truncate_id(&order.id.to_string()),
			lines = order.lines.len(),
			total = %order.total_amount,
			"Order placed"
		);
		Ok(OrderSnapshot::new(&order, customer.name))
	}

	/// Moves an order to the status named by `proposed` (case-insensitive).
	#[instrument(skip(self, order_id), fields(order_id = %truncate_id(&order_id.to_string())))]
	pub async fn update_status(
		&self,
		order_id: Uuid,
		proposed: &str,
	) -> Result<OrderSnapshot, OrderError> {
		let new_status = OrderStatus::parse(proposed)?;
		let transition = self
			.state_machine
			.transition_order_status(order_id, new_status)
			.await?;

		match &transition {
			Transition::Applied(order) => info!(status = %order.status, "Order status updated"),
			Transition::Unchanged(order) => info!(status = %order.status, "Order status unchanged"),
		}
		self.snapshot(transition.into_order()).await
	}

	/// Orders with the given status, oldest first.
	#[instrument(skip(self))]
	pub async fn get_by_status(&self, status: &str) -> Result<Vec<OrderSnapshot>, OrderError> {
		let status = OrderStatus::parse(status)?;
		let orders = self.repository.find_orders_by_status(status).await?;
		self.snapshots(orders).await
	}

	/// Number of orders with the given status.
	pub async fn count_by_status(&self, status: &str) -> Result<u64, OrderError> {
		let status = OrderStatus::parse(status)?;
		Ok(self.repository.count_orders_by_status(status).await?)
	}

	pub async fn get_by_id(&self, order_id: Uuid) -> Result<OrderSnapshot, OrderError> {
		let order = self.state_machine.get_order(order_id).await?;
		self.snapshot(order).await
	}

	/// Orders placed by a customer, newest first.
	pub async fn list_by_customer(&self, customer_id: u64) -> Result<Vec<OrderSnapshot>, OrderError> {
		self.repository
			.find_customer_by_id(customer_id)
			.await?
			.ok_or(OrderError::CustomerNotFound(customer_id))?;
		let mut orders = self.repository.find_orders().await?;
		orders.retain(|order| order.customer_id == customer_id);
		orders.reverse();
		self.snapshots(orders).await
	}

	/// Orders handled by an employee, newest first.
	pub async fn list_by_employee(&self, employee_id: u64) -> Result<Vec<OrderSnapshot>, OrderError> {
		self.repository
			.find_employee_by_id(employee_id)
			.await?
			.ok_or(OrderError::EmployeeNotFound(employee_id))?;
		let mut orders = self.repository.find_orders().await?;
		orders.retain(|order| order.employee_id == Some(employee_id));
		orders.reverse();
		self.snapshots(orders).await
	}

	/// Every order, newest first.
	pub async fn list_all(&self) -> Result<Vec<OrderSnapshot>, OrderError> {
		let mut orders = self.repository.find_orders().await?;
		orders.reverse();
		self.snapshots(orders).await
	}

	async fn customer_name(&self, customer_id: u64) -> Result<String, OrderError> {
		match self.repository.find_customer_by_id(customer_id).await? {
			Some(customer) => Ok(customer.name),
			None => {
				warn!(customer_id, "Order references an unknown customer");
				Ok(String::new())
			},
		}
	}

	async fn snapshot(&self, order: Order) -> Result<OrderSnapshot, OrderError> {
		let name = self.customer_name(order.customer_id).await?;
		Ok(OrderSnapshot::new(&order, name))
	}

	async fn snapshots(&self, orders: Vec<Order>) -> Result<Vec<OrderSnapshot>, OrderError> {
		let mut names: HashMap<u64, String> = HashMap::new();
		let mut snapshots = Vec::with_capacity(orders.len());
		for order in &orders {
			if !names.contains_key(&order.customer_id) {
				let name = self.customer_name(order.customer_id).await?;
				names.insert(order.customer_id, name);
			}
			let name = names.get(&order.customer_id).cloned().unwrap_or_default();
			snapshots.push(OrderSnapshot::new(order, name));
		}
		Ok(snapshots)
	}
}
