//! Command-line surface over the engine operations.
//!
//! Each command runs one engine operation and yields a JSON document. Failures
//! are rendered as an `ErrorResponse` carrying the error kind.

use clap::{Args, Subcommand};
use restaurant_core::{CartError, DirectoryError, OrderError, RestaurantEngine};
use restaurant_types::{ErrorKind, ErrorResponse};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Register and look up customers
	#[command(subcommand)]
	Customer(CustomerCommand),
	/// Register and look up employees
	#[command(subcommand)]
	Employee(EmployeeCommand),
	/// Edit a customer's cart
	#[command(subcommand)]
	Cart(CartCommand),
	/// Place orders and move them through their workflow
	#[command(subcommand)]
	Order(OrderCommand),
}

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
	Add { name: String, email: String },
	Show { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum EmployeeCommand {
	Add { name: String },
	Show { id: u64 },
}

#[derive(Args, Debug)]
pub struct LineRef {
	/// Owning customer id
	#[arg(long)]
	customer: u64,
	/// Cart line id
	#[arg(long)]
	line: Uuid,
}

#[derive(Subcommand, Debug)]
pub enum CartCommand {
	Add {
		#[arg(long)]
		customer: u64,
		#[arg(long)]
		item: String,
		#[arg(long)]
		price: Decimal,
		#[arg(long, default_value_t = 1)]
		quantity: u32,
	},
	Show {
		#[arg(long)]
		customer: u64,
	},
	SetQuantity {
		#[command(flatten)]
		line: LineRef,
		#[arg(long)]
		quantity: u32,
	},
	Increment(LineRef),
	Decrement(LineRef),
	Remove(LineRef),
	Clear {
		#[arg(long)]
		customer: u64,
	},
	Total {
		#[arg(long)]
		customer: u64,
	},
	Checkout {
		#[arg(long)]
		customer: u64,
	},
	Reopen {
		#[arg(long)]
		customer: u64,
	},
}

#[derive(Subcommand, Debug)]
pub enum OrderCommand {
	/// Turn the customer's cart into an order
	Place {
		#[arg(long)]
		customer: u64,
		#[arg(long)]
		employee: Option<u64>,
	},
	/// Move an order to a new status
	Status { order: Uuid, status: String },
	Show { order: Uuid },
	/// List orders, newest first, or oldest first when filtered by status
	List {
		#[arg(long, conflicts_with_all = ["employee", "status"])]
		customer: Option<u64>,
		#[arg(long, conflicts_with = "status")]
		employee: Option<u64>,
		#[arg(long)]
		status: Option<String>,
	},
	Count { status: String },
}

#[derive(Debug, Error)]
pub enum CommandError {
	#[error(transparent)]
	Order(#[from] OrderError),
	#[error(transparent)]
	Cart(#[from] CartError),
	#[error(transparent)]
	Directory(#[from] DirectoryError),
	#[error("Failed to render output: {0}")]
	Output(#[from] serde_json::Error),
}

impl CommandError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			CommandError::Order(e) => e.kind(),
			CommandError::Cart(e) => e.kind(),
			CommandError::Directory(e) => e.kind(),
			CommandError::Output(_) => ErrorKind::Internal,
		}
	}

	pub fn to_response(&self) -> ErrorResponse {
		ErrorResponse::new(self.kind(), self.to_string())
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CountResponse {
	status: String,
	count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AffectedLines {
	customer_id: u64,
	lines: usize,
}

fn json<T: Serialize>(value: T) -> Result<Value, CommandError> {
	Ok(serde_json::to_value(value)?)
}

pub async fn run(engine: &RestaurantEngine, command: Command) -> Result<Value, CommandError> {
	match command {
		Command::Customer(cmd) => customer(engine, cmd).await,
		Command::Employee(cmd) => employee(engine, cmd).await,
		Command::Cart(cmd) => cart(engine, cmd).await,
		Command::Order(cmd) => order(engine, cmd).await,
	}
}

async fn customer(engine: &RestaurantEngine, command: CustomerCommand) -> Result<Value, CommandError> {
	let directory = engine.directory();
	match command {
		CustomerCommand::Add { name, email } => json(directory.register_customer(&name, &email).await?),
		CustomerCommand::Show { id } => json(directory.customer(id).await?),
	}
}

async fn employee(engine: &RestaurantEngine, command: EmployeeCommand) -> Result<Value, CommandError> {
	let directory = engine.directory();
	match command {
		EmployeeCommand::Add { name } => json(directory.register_employee(&name).await?),
		EmployeeCommand::Show { id } => json(directory.employee(id).await?),
	}
}

async fn cart(engine: &RestaurantEngine, command: CartCommand) -> Result<Value, CommandError> {
	let cart = engine.cart();
	match command {
		CartCommand::Add {
			customer,
			item,
			price,
			quantity,
		} => json(cart.add_item(customer, &item, price, quantity).await?),
		CartCommand::Show { customer } => json(cart.view(customer).await?),
		CartCommand::SetQuantity { line, quantity } => {
			json(cart.update_quantity(line.customer, line.line, quantity).await?)
		},
		CartCommand::Increment(line) => json(cart.increment(line.customer, line.line).await?),
		CartCommand::Decrement(line) => json(cart.decrement(line.customer, line.line).await?),
		CartCommand::Remove(line) => {
			cart.remove_item(line.customer, line.line).await?;
			json(AffectedLines {
				customer_id: line.customer,
				lines: 1,
			})
		},
		CartCommand::Clear { customer } => json(AffectedLines {
			customer_id: customer,
			lines: cart.clear(customer).await?,
		}),
		CartCommand::Total { customer } => json(cart.total(customer).await?),
		CartCommand::Checkout { customer } => json(AffectedLines {
			customer_id: customer,
			lines: cart.check_out(customer).await?,
		}),
		CartCommand::Reopen { customer } => json(AffectedLines {
			customer_id: customer,
			lines: cart.reopen(customer).await?,
		}),
	}
}

async fn order(engine: &RestaurantEngine, command: OrderCommand) -> Result<Value, CommandError> {
	let orders = engine.orders();
	match command {
		OrderCommand::Place { customer, employee } => json(orders.place_order(customer, employee).await?),
		OrderCommand::Status { order, status } => json(orders.update_status(order, &status).await?),
		OrderCommand::Show { order } => json(orders.get_by_id(order).await?),
		OrderCommand::List {
			customer,
			employee,
			status,
		} => {
			let listed = match (customer, employee, status) {
				(Some(customer), _, _) => orders.list_by_customer(customer).await?,
				(_, Some(employee), _) => orders.list_by_employee(employee).await?,
				(_, _, Some(status)) => orders.get_by_status(&status).await?,
				(None, None, None) => orders.list_all().await?,
			};
			json(listed)
		},
		OrderCommand::Count { status } => {
			let count = orders.count_by_status(&status).await?;
			json(CountResponse { status, count })
		},
	}
}
