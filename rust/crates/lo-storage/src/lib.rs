//! LocalOps Storage Layer
//!
//! PostgreSQL repositories for projects, plans, runs, steps, audits and
//! artifacts, plus the Redis Streams run queue.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queue;
pub mod repos;

pub use pool::{create_pool, DbPool};
pub use queue::{QueueClient, RunJob};
pub use repos::*;
