//! Database entity models
//!
//! These structures map directly to database tables and are used for
//! CRUD operations.

pub mod artifacts;
pub mod audits;
pub mod plans;
pub mod projects;
pub mod runs;
pub mod steps;

pub use artifacts::*;
pub use audits::*;
pub use plans::*;
pub use projects::*;
pub use runs::*;
pub use steps::*;
