//! Shared helpers: progress reporting and sequence ordering.

pub mod order;
pub mod progress;
