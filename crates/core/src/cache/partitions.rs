//! Versioned partition set owned by one worker.
//!
//! `Partitions` is the explicit service object every executor receives. It
//! knows the current version tag and maps each logical partition kind to its
//! versioned name (`static-v2`, `api-v2`, `runtime-v2`). Anything in the
//! database that does not carry one of those names belongs to an older
//! deployment and is removed by [`Partitions::sweep_stale`].

use super::connection::CacheDb;
use super::entries::CacheEntry;
use super::hash::compute_cache_key;
use super::response::ResponseSnapshot;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical partition kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    /// Pre-cached shell assets and navigation documents.
    Static,
    /// Responses from data APIs.
    Api,
    /// Everything cached opportunistically at runtime.
    Runtime,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 3] = [PartitionKind::Static, PartitionKind::Api, PartitionKind::Runtime];

    pub fn as_str(self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Api => "api",
            PartitionKind::Runtime => "runtime",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry count for one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionStats {
    pub name: String,
    pub current: bool,
    pub entries: u64,
}

/// The current-version partition set.
#[derive(Clone, Debug)]
pub struct Partitions {
    db: CacheDb,
    version: String,
}

impl Partitions {
    pub fn new(db: CacheDb, version: impl Into<String>) -> Self {
        Self { db, version: version.into() }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Versioned name of a partition kind.
    pub fn name(&self, kind: PartitionKind) -> String {
        format!("{}-{}", kind.as_str(), self.version)
    }

    /// Names of the partitions that belong to the current version.
    pub fn current_names(&self) -> Vec<String> {
        PartitionKind::ALL.iter().map(|kind| self.name(*kind)).collect()
    }

    pub fn is_current(&self, name: &str) -> bool {
        PartitionKind::ALL.iter().any(|kind| self.name(*kind) == name)
    }

    /// Find the stored response for a request.
    pub async fn lookup(&self, kind: PartitionKind, method: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let key = compute_cache_key(method, url);
        self.db.get_entry(&self.name(kind), &key).await
    }

    /// Store a response for a request.
    ///
    /// Only status 200 is written; anything else returns `Ok(false)` and
    /// leaves the partition untouched.
    pub async fn store(
        &self, kind: PartitionKind, method: &str, url: &str, response: &ResponseSnapshot,
    ) -> Result<bool, Error> {
        if !response.is_cacheable() {
            tracing::debug!(partition = %kind, url, status = response.status, "not caching non-200 response");
            return Ok(false);
        }
        let key = compute_cache_key(method, url);
        self.db
            .put_entry(&self.name(kind), &key, method, url, response)
            .await?;
        Ok(true)
    }

    /// Create any current partition that does not exist yet.
    pub async fn ensure_current(&self) -> Result<(), Error> {
        for name in self.current_names() {
            self.db.open_partition(&name).await?;
        }
        Ok(())
    }

    /// Delete every partition whose name is not in the current set.
    ///
    /// Returns the names that were deleted. A partition that disappears
    /// between listing and deletion is skipped.
    pub async fn sweep_stale(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.list_partitions().await? {
            if self.is_current(&name) {
                continue;
            }
            if self.db.delete_partition(&name).await? {
                tracing::info!(partition = %name, "deleted stale partition");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Entry counts for every partition present, stale ones included.
    pub async fn stats(&self) -> Result<Vec<PartitionStats>, Error> {
        let mut stats = Vec::new();
        for name in self.db.list_partitions().await? {
            let entries = self.db.count_entries(&name).await?;
            stats.push(PartitionStats { current: self.is_current(&name), name, entries });
        }
        Ok(stats)
    }
}
