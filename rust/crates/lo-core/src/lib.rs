//! LocalOps Core Library
//!
//! Core primitives for the LocalOps run orchestration plane:
//! - ID types (ProjectId, PlanId, RunId, etc.)
//! - Error types
//! - Configuration
//! - The Plan schema and sandbox metadata
//! - Run event vocabulary

pub mod config;
pub mod error;
pub mod events;
pub mod id;
pub mod plan;
pub mod time;

pub use config::Settings;
pub use error::{Error, Result};
pub use events::{LogStream, RunEvent};
pub use id::*;
pub use plan::{Plan, PlanStep, RiskLevel, SandboxMeta};
