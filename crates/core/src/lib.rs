//! Core types and shared functionality for fallow.
//!
//! This crate provides:
//! - Versioned cache partitions with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, EvictionReport, PartitionKind, PartitionStats, Partitions, ResponseSnapshot};
pub use config::AppConfig;
pub use error::Error;
