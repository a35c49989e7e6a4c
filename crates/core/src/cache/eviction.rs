//! Age-based eviction.
//!
//! An entry's age is measured from the `Date` header of the stored response.
//! Entries without a usable `Date` are never evicted.

use super::partitions::{PartitionKind, Partitions};
use crate::Error;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one eviction sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EvictionReport {
    pub partition: String,
    /// Entries examined.
    pub scanned: u64,
    /// Entries deleted for being older than the threshold.
    pub evicted: u64,
    /// Entries left alone because they carry no parseable `Date`.
    pub skipped_undated: u64,
}

impl Partitions {
    /// Delete entries of `kind` whose age exceeds `max_age`.
    pub async fn evict_expired(&self, kind: PartitionKind, max_age: Duration) -> Result<EvictionReport, Error> {
        self.evict_older_than(kind, max_age, Utc::now()).await
    }

    /// Delete entries of `kind` whose age at `now` exceeds `max_age`.
    ///
    /// An entry removed by someone else mid-sweep is not counted and is not
    /// an error.
    pub async fn evict_older_than(
        &self, kind: PartitionKind, max_age: Duration, now: DateTime<Utc>,
    ) -> Result<EvictionReport, Error> {
        let name = self.name(kind);
        let mut report = EvictionReport { partition: name.clone(), ..Default::default() };

        for entry in self.db().list_entries(&name).await? {
            report.scanned += 1;
            let Some(stored_at) = entry.stored_at else {
                report.skipped_undated += 1;
                continue;
            };
            if now - stored_at > max_age && self.db().delete_entry(&name, &entry.key).await? {
                tracing::debug!(partition = %name, url = %entry.url, "evicted expired entry");
                report.evicted += 1;
            }
        }

        tracing::info!(
            partition = %name,
            scanned = report.scanned,
            evicted = report.evicted,
            skipped_undated = report.skipped_undated,
            "eviction sweep finished"
        );

        Ok(report)
    }
}
