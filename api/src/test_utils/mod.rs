//! Test utilities
//!
//! Manual mock implementations and test fixtures for unit testing.
//!
//! Why manual mocks instead of mockall?
//! - mockall has lifetime issues with traits containing `&str` parameters
//! - Manual mocks are more explicit and easier to debug
//!
//! Every repository port has an in-memory counterpart so the application
//! services can be exercised without PostgreSQL.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
