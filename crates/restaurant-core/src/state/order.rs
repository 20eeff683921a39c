//! Order state machine.
//!
//! Applies status transitions to stored orders. Legality comes from
//! [`OrderStatus::can_transition_to`]; every write is guarded on the order
//! being unchanged since it was read.

use crate::repository::Repository;
use restaurant_storage::{StorageError, Versioned};
use restaurant_types::{current_time, Order, OrderStatus};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during order state management.
#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Order not found: {0}")]
	OrderNotFound(Uuid),
	#[error("Order {0} was modified concurrently")]
	Conflict(Uuid),
}

/// Outcome of a status transition.
#[derive(Debug, Clone)]
pub enum Transition {
	/// The new status was written.
	Applied(Order),
	/// The order already had the requested status; nothing was written.
	Unchanged(Order),
}

impl Transition {
	pub fn order(&self) -> &Order {
		match self {
			Transition::Applied(order) | Transition::Unchanged(order) => order,
		}
	}

	pub fn into_order(self) -> Order {
		match self {
			Transition::Applied(order) | Transition::Unchanged(order) => order,
		}
	}
}

/// Manages order state transitions and persistence.
pub struct OrderStateMachine {
	repository: Arc<Repository>,
}

impl OrderStateMachine {
	pub fn new(repository: Arc<Repository>) -> Self {
		Self { repository }
	}

	async fn load(&self, order_id: Uuid) -> Result<Versioned<Order>, OrderStateError> {
		self.repository
			.find_order_by_id(order_id)
			.await
			.map_err(|e| OrderStateError::Storage(e.to_string()))?
			.ok_or(OrderStateError::OrderNotFound(order_id))
	}

	/// Applies `updater` to a previously read order and persists it.
	///
	/// `updated_at` is refreshed automatically. Fails with `Conflict` if the
	/// stored order no longer matches what was read.
	pub async fn update_order_with<F>(
		&self,
		original: &Versioned<Order>,
		updater: F,
	) -> Result<Order, OrderStateError>
	where
		F: FnOnce(&mut Order),
	{
		let mut order = original.value.clone();
		updater(&mut order);
		order.updated_at = current_time();

		let mut unit = self.repository.begin();
		unit.replace_order(original, &order)
			.map_err(|e| OrderStateError::Storage(e.to_string()))?;
		self.repository
			.commit(unit)
			.await
			.map_err(|e| match e {
				StorageError::Conflict(_) => OrderStateError::Conflict(order.id),
				other => OrderStateError::Storage(other.to_string()),
			})?;

		Ok(order)
	}

	/// Moves an order to `new_status` if the transition is legal.
	///
	/// Re-applying Cancelled to a cancelled order is legal but writes nothing.
	pub async fn transition_order_status(
		&self,
		order_id: Uuid,
		new_status: OrderStatus,
	) -> Result<Transition, OrderStateError> {
		let stored = self.load(order_id).await?;
		let current = stored.value.status;

		if !current.can_transition_to(new_status) {
			return Err(OrderStateError::InvalidTransition {
				from: current,
				to: new_status,
			});
		}
		if current == new_status {
			return Ok(Transition::Unchanged(stored.into_value()));
		}

		let order = self
			.update_order_with(&stored, |o| o.status = new_status)
			.await?;
		Ok(Transition::Applied(order))
	}

	/// Gets an order by ID.
	pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderStateError> {
		Ok(self.load(order_id).await?.into_value())
	}
}
