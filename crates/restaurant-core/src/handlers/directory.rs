//! Registration and lookup of customers and employees.

use crate::repository::Repository;
use restaurant_storage::StorageError;
use restaurant_types::{current_time, Customer, Employee, ErrorKind};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DirectoryError {
	#[error("Customer not found: {0}")]
	CustomerNotFound(u64),
	#[error("Employee not found: {0}")]
	EmployeeNotFound(u64),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl DirectoryError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			DirectoryError::CustomerNotFound(_) | DirectoryError::EmployeeNotFound(_) => {
				ErrorKind::NotFound
			},
			DirectoryError::InvalidInput(_) => ErrorKind::BadRequest,
			DirectoryError::Storage(_) => ErrorKind::Internal,
		}
	}
}

impl From<StorageError> for DirectoryError {
	fn from(err: StorageError) -> Self {
		DirectoryError::Storage(err.to_string())
	}
}

fn required(field: &str, value: &str) -> Result<String, DirectoryError> {
	let value = value.trim();
	if value.is_empty() {
		return Err(DirectoryError::InvalidInput(format!("{} cannot be empty", field)));
	}
	Ok(value.to_string())
}

/// Customers and employees known to the restaurant.
pub struct Directory {
	repository: Arc<Repository>,
}

impl Directory {
	pub fn new(repository: Arc<Repository>) -> Self {
		Self { repository }
	}

	pub async fn register_customer(&self, name: &str, email: &str) -> Result<Customer, DirectoryError> {
		let name = required("name", name)?;
		let email = required("email", email)?;
		if !email.contains('@') {
			return Err(DirectoryError::InvalidInput(format!(
				"'{}' is not an email address",
				email
			)));
		}

		let customer = Customer {
			id: self.repository.next_customer_id().await?,
			name,
			email,
			created_at: current_time(),
		};
		let mut unit = self.repository.begin();
		unit.insert_customer(&customer)?;
		self.repository.commit(unit).await?;

		info!(customer_id = customer.id, "Registered customer");
		Ok(customer)
	}

	pub async fn register_employee(&self, name: &str) -> Result<Employee, DirectoryError> {
		let name = required("name", name)?;
		let employee = Employee {
			id: self.repository.next_employee_id().await?,
			name,
			created_at: current_time(),
		};
		let mut unit = self.repository.begin();
		unit.insert_employee(&employee)?;
		self.repository.commit(unit).await?;

		info!(employee_id = employee.id, "Registered employee");
		Ok(employee)
	}

	pub async fn customer(&self, id: u64) -> Result<Customer, DirectoryError> {
		self.repository
			.find_customer_by_id(id)
			.await?
			.ok_or(DirectoryError::CustomerNotFound(id))
	}

	pub async fn employee(&self, id: u64) -> Result<Employee, DirectoryError> {
		self.repository
			.find_employee_by_id(id)
			.await?
			.ok_or(DirectoryError::EmployeeNotFound(id))
	}
}
