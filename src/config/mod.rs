//! Configuration models for allocation pools.

pub mod pool;

pub use pool::{FoundryConfig, PoolConfig};
