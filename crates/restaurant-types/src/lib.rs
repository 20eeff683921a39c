//! Common types module for the restaurant ordering system.
//!
//! This module defines the core data types shared by every crate in the
//! workspace: the order status state machine, orders and their lines, cart
//! lines, customers and employees, the snapshots handed back to callers and
//! the configuration validation helpers used by storage backends.

/// Snapshot and error-kind types handed to external callers.
pub mod api;
/// Cart line types consumed by order placement.
pub mod cart;
/// Order and order line types.
pub mod order;
/// Customers and employees.
pub mod people;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Order status values and their transition rules.
pub mod status;
/// Storage namespaces.
pub mod storage;
/// Utility functions for display formatting and timestamps.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use api::*;
pub use cart::*;
pub use order::*;
pub use people::*;
pub use registry::*;
pub use status::*;
pub use storage::*;
pub use utils::{current_time, format_money, money_scale, truncate_id};
pub use validation::*;
