//! MCP tool implementations.
//!
//! This module contains all tools exposed by the fallow server.

pub mod control;
pub mod fetch;
pub mod status;

pub use control::{WorkerControlParams, control_impl};
pub use fetch::{FetchParams, fetch_impl};
pub use status::{CacheStatusParams, status_impl};
