//! Cart handling.
//!
//! Owns cart lines until an order consumes them. Every edit checks that the
//! line belongs to the calling customer and stays within the configured
//! limits.

use crate::repository::Repository;
use restaurant_config::CartConfig;
use restaurant_storage::{StorageError, Versioned};
use restaurant_types::{
	current_time, money_scale, truncate_id, CartLine, CartLineState, CartView, ErrorKind,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
	#[error("Customer not found: {0}")]
	CustomerNotFound(u64),
	#[error("Cart item not found: {0}")]
	CartLineNotFound(Uuid),
	#[error("Access denied: cart item {line_id} does not belong to customer {customer_id}")]
	UnauthorizedCartAccess { line_id: Uuid, customer_id: u64 },
	#[error("Invalid cart operation: {0}")]
	InvalidCartOperation(String),
	#[error("Cart is empty for customer {0}")]
	EmptyCart(u64),
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl CartError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			CartError::CustomerNotFound(_) | CartError::CartLineNotFound(_) => ErrorKind::NotFound,
			CartError::UnauthorizedCartAccess { .. } => ErrorKind::Forbidden,
			CartError::InvalidCartOperation(_) | CartError::EmptyCart(_) => ErrorKind::BadRequest,
			CartError::Conflict(_) => ErrorKind::Conflict,
			CartError::Storage(_) => ErrorKind::Internal,
		}
	}
}

impl From<StorageError> for CartError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::Conflict(key) => {
				CartError::Conflict(format!("{} was modified concurrently", key))
			},
			other => CartError::Storage(other.to_string()),
		}
	}
}

/// Service owning cart lines before they are ordered.
pub struct CartService {
	repository: Arc<Repository>,
	limits: CartConfig,
}

impl CartService {
	pub fn new(repository: Arc<Repository>, limits: CartConfig) -> Self {
		Self { repository, limits }
	}

	fn check_quantity(&self, quantity: u32) -> Result<(), CartError> {
		if quantity < self.limits.min_quantity || quantity > self.limits.max_quantity {
			return Err(CartError::InvalidCartOperation(format!(
				"Quantity must be between {} and {}",
				self.limits.min_quantity, self.limits.max_quantity
			)));
		}
		Ok(())
	}

	fn check_item(&self, item_name: &str, unit_price: Decimal) -> Result<(), CartError> {
		let length = item_name.chars().count();
		if length == 0 || length > self.limits.max_item_name_length {
			return Err(CartError::InvalidCartOperation(format!(
				"Item name must be between 1 and {} characters",
				self.limits.max_item_name_length
			)));
		}
		if unit_price < self.limits.min_price || unit_price > self.limits.max_price {
			return Err(CartError::InvalidCartOperation(format!(
				"Price must be between {} and {}",
				self.limits.min_price, self.limits.max_price
			)));
		}
		if money_scale(unit_price) > self.limits.price_decimal_places {
			return Err(CartError::InvalidCartOperation(format!(
				"Price cannot have more than {} decimal places",
				self.limits.price_decimal_places
			)));
		}
		Ok(())
	}

	async fn require_customer(&self, customer_id: u64) -> Result<(), CartError> {
		self.repository
			.find_customer_by_id(customer_id)
			.await?
			.map(|_| ())
			.ok_or(CartError::CustomerNotFound(customer_id))
	}

	/// Loads a line and checks it belongs to `customer_id`.
	async fn owned_line(
		&self,
		customer_id: u64,
		line_id: Uuid,
	) -> Result<Versioned<CartLine>, CartError> {
		self.require_customer(customer_id).await?;
		let line = self
			.repository
			.find_cart_line(line_id)
			.await?
			.ok_or(CartError::CartLineNotFound(line_id))?;
		if line.value.customer_id != customer_id {
			return Err(CartError::UnauthorizedCartAccess {
				line_id,
				customer_id,
			});
		}
		Ok(line)
	}

	async fn write_quantity(
		&self,
		original: &Versioned<CartLine>,
		quantity: u32,
	) -> Result<CartLine, CartError> {
		let mut line = original.value.clone();
		line.quantity = Some(quantity);
		line.updated_at = current_time();

		let mut unit = self.repository.begin();
		unit.replace_cart_line(original, &line)?;
		self.repository.commit(unit).await?;
		Ok(line)
	}

	/// Adds an item to the cart.
	///
	/// If an in-cart line with the same name exists its quantity grows,
	/// capped at the maximum, and its price is kept. Otherwise a new line is
	/// created.
	#[instrument(skip(self))]
	pub async fn add_item(
		&self,
		customer_id: u64,
		item_name: &str,
		unit_price: Decimal,
		quantity: u32,
	) -> Result<CartLine, CartError> {
		let item_name = item_name.trim();
		self.check_quantity(quantity)?;
		self.check_item(item_name, unit_price)?;
		self.require_customer(customer_id).await?;

		let existing = self
			.repository
			.find_cart_lines_by_customer_and_state(customer_id, CartLineState::InCart)
			.await?
			.into_iter()
			.find(|line| line.value.item_name == item_name);

		if let Some(existing) = existing {
			let (_, current) = existing.value.priced_quantity();
			let merged = current.saturating_add(quantity).min(self.limits.max_quantity);
			let line = self.write_quantity(&existing, merged).await?;
			debug!(line_id = %truncate_id(&line.id.to_string()), quantity = merged, "Merged into existing cart line");
			return Ok(line);
		}

		let line = CartLine::new(customer_id, item_name, unit_price, quantity, current_time());
		let mut unit = self.repository.begin();
		unit.insert_cart_line(&line)?;
		self.repository.commit(unit).await?;
		info!(line_id = %truncate_id(&line.id.to_string()), "Added cart line");
		Ok(line)
	}

	/// Sets the quantity of a line.
	pub async fn update_quantity(
		&self,
		customer_id: u64,
		line_id: Uuid,
		quantity: u32,
	) -> Result<CartLine, CartError> {
		self.check_quantity(quantity)?;
		let line = self.owned_line(customer_id, line_id).await?;
		self.write_quantity(&line, quantity).await
	}

	pub async fn increment(&self, customer_id: u64, line_id: Uuid) -> Result<CartLine, CartError> {
		let line = self.owned_line(customer_id, line_id).await?;
		let (_, current) = line.value.priced_quantity();
		if current >= self.limits.max_quantity {
			return Err(CartError::InvalidCartOperation(format!(
				"Quantity cannot exceed {}",
				self.limits.max_quantity
			)));
		}
		self.write_quantity(&line, current + 1).await
	}

	pub async fn decrement(&self, customer_id: u64, line_id: Uuid) -> Result<CartLine, CartError> {
		let line = self.owned_line(customer_id, line_id).await?;
		let (_, current) = line.value.priced_quantity();
		if current <= self.limits.min_quantity {
			return Err(CartError::InvalidCartOperation(format!(
				"Quantity cannot be less than {}",
				self.limits.min_quantity
			)));
		}
		self.write_quantity(&line, current - 1).await
	}

	pub async fn remove_item(&self, customer_id: u64, line_id: Uuid) -> Result<(), CartError> {
		let line = self.owned_line(customer_id, line_id).await?;
		let mut unit = self.repository.begin();
		unit.delete_cart_lines(std::slice::from_ref(&line));
		self.repository.commit(unit).await?;
		Ok(())
	}

	/// Removes every line of the customer, whatever its state.
	pub async fn clear(&self, customer_id: u64) -> Result<usize, CartError> {
		self.require_customer(customer_id).await?;
		let lines = self.repository.find_cart_lines_by_customer(customer_id).await?;
		let mut unit = self.repository.begin();
		unit.delete_cart_lines(&lines);
		self.repository.commit(unit).await?;
		Ok(lines.len())
	}

	/// All lines of the customer in insertion order.
	pub async fn view(&self, customer_id: u64) -> Result<CartView, CartError> {
		self.require_customer(customer_id).await?;
		let lines: Vec<CartLine> = self
			.repository
			.find_cart_lines_by_customer(customer_id)
			.await?
			.into_iter()
			.map(Versioned::into_value)
			.collect();
		Ok(CartView::from_lines(customer_id, &lines))
	}

	/// Sum of the in-cart lines, i.e. what the next order would cost.
	pub async fn total(&self, customer_id: u64) -> Result<Decimal, CartError> {
		Ok(self.view(customer_id).await?.total)
	}

	/// Marks every in-cart line as checked out.
	pub async fn check_out(&self, customer_id: u64) -> Result<usize, CartError> {
		let moved = self
			.move_lines(customer_id, CartLineState::InCart, CartLineState::CheckedOut)
			.await?;
		if moved == 0 {
			return Err(CartError::EmptyCart(customer_id));
		}
		Ok(moved)
	}

	/// Moves checked-out lines back into the cart.
	pub async fn reopen(&self, customer_id: u64) -> Result<usize, CartError> {
		self.move_lines(customer_id, CartLineState::CheckedOut, CartLineState::InCart)
			.await
	}

	async fn move_lines(
		&self,
		customer_id: u64,
		from: CartLineState,
		to: CartLineState,
	) -> Result<usize, CartError> {
		self.require_customer(customer_id).await?;
		let lines = self
			.repository
			.find_cart_lines_by_customer_and_state(customer_id, from)
			.await?;

		let now = current_time();
		let mut unit = self.repository.begin();
		for original in &lines {
			let mut line = original.value.clone();
			line.state = to;
			line.updated_at = now;
			unit.replace_cart_line(original, &line)?;
		}
		self.repository.commit(unit).await?;
		Ok(lines.len())
	}
}
