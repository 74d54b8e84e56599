//! Redis list job queue.
//!
//! This crate provides:
//! - The `JobQueue` trait consumed by the worker pool
//! - A Redis implementation using LPUSH/BRPOP on a single list
//! - A small checkout pool of multiplexed connections

pub mod error;
pub mod pool;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use pool::{PooledConnection, RedisPool};
pub use queue::{JobQueue, QueueConfig, RedisQueue};
