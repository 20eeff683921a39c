//! State management for orders.
//!
//! This module provides the state machine that applies status transitions to
//! stored orders, rejecting illegal moves and concurrent overwrites.

pub mod order;

pub use order::{OrderStateError, OrderStateMachine, Transition};
