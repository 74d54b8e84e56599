//! Job persistence.
//!
//! This crate provides:
//! - The `JobStore` trait: URL lookup and terminal status writes
//! - A Postgres implementation over an explicitly owned `sqlx` pool

pub mod error;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use postgres::{PostgresJobStore, StoreConfig};
pub use store::JobStore;
