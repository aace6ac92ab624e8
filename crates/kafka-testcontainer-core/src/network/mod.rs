//! Network allocation for broker containers.
//!
//! This module provides:
//! - Base58 random identifiers
//! - Isolated network names and broker aliases

pub mod allocator;
pub mod base58;

pub use allocator::{NetworkAllocation, NetworkAllocator};
