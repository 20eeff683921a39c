//! Services behind the exposed operations.
//!
//! Order placement and status handling, cart editing and the directory of
//! customers and employees.

pub mod cart;
pub mod directory;
pub mod order;

pub use cart::{CartError, CartService};
pub use directory::{Directory, DirectoryError};
pub use order::{OrderError, OrderService};
