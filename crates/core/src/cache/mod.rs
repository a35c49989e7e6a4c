//! SQLite-backed, version-tagged cache partitions.
//!
//! This module provides the persistent store behind the interception layer,
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions created lazily on first read or write
//! - Per-key atomic upserts (last write wins)
//! - Whole-partition deletion on version rollover
//! - Age-based eviction driven by the stored `Date` header

pub mod connection;
pub mod entries;
pub mod eviction;
pub mod hash;
pub mod migrations;
pub mod partitions;
pub mod response;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use eviction::EvictionReport;
pub use partitions::{PartitionKind, PartitionStats, Partitions};
pub use response::ResponseSnapshot;
