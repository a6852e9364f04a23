//! LocalOps policy engine
//!
//! Pure allow/deny decisions over shell command strings. No side effects;
//! callers audit and enforce. The engine is consulted optionally at plan
//! time and mandatorily at step dispatch.

pub mod decision;
pub mod engine;
pub mod rules;

pub use decision::PolicyDecision;
pub use engine::{evaluate_risk, validate_command};
