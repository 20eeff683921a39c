//! Utility functions shared across the workspace.
//!
//! Display helpers for identifiers and money, plus the clock used to stamp
//! records.

pub mod formatting;
pub mod helpers;

pub use formatting::{format_money, truncate_id};
pub use helpers::{current_time, money_scale};
