//! Partition and entry CRUD operations.
//!
//! Every operation runs as a single call on the connection thread, so a
//! write, a read, and a partition deletion never interleave mid-statement.
//! A read that loses the race against a deletion simply finds nothing.

use super::connection::CacheDb;
use super::response::{ResponseSnapshot, parse_http_date};
use crate::Error;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A stored response keyed by request within one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub response: ResponseSnapshot,
    /// Parsed from the stored `date_header` column, never from the write time.
    pub stored_at: Option<DateTime<Utc>>,
}

const ENTRY_COLUMNS: &str = "cache_key, method, url, status, headers_json, body, date_header";

struct EntryRow {
    key: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
    date_header: Option<String>,
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        key: row.get(0)?,
        method: row.get(1)?,
        url: row.get(2)?,
        status: row.get(3)?,
        headers_json: row.get(4)?,
        body: row.get(5)?,
        date_header: row.get(6)?,
    })
}

fn decode_entry(row: EntryRow) -> Result<CacheEntry, Error> {
    let headers: Vec<(String, String)> = serde_json::from_str(&row.headers_json)?;
    let stored_at = row.date_header.as_deref().and_then(parse_http_date);
    Ok(CacheEntry {
        key: row.key,
        method: row.method,
        url: row.url,
        response: ResponseSnapshot { status: row.status, headers, body: row.body },
        stored_at,
    })
}

fn ensure_partition(conn: &rusqlite::Connection, name: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![name, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

impl CacheDb {
    /// Create a partition if it does not exist yet.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_partition(conn, &name) })
            .await
            .map_err(Error::from)
    }

    /// Names of every partition present, in name order.
    pub async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if the partition was already gone.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the entry for `key` in `partition`.
    ///
    /// The partition is created on first write.
    pub async fn put_entry(
        &self, partition: &str, key: &str, method: &str, url: &str, response: &ResponseSnapshot,
    ) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        let method = method.to_ascii_uppercase();
        let url = url.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let status = response.status;
        let body = response.body.clone();
        let date_header = response.header("date").map(str::to_string);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_partition(&tx, &partition)?;
                tx.execute(
                    "INSERT INTO entries (
                        partition, cache_key, method, url, status, headers_json, body, date_header, written_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(partition, cache_key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        date_header = excluded.date_header,
                        written_at = excluded.written_at",
                    params![
                        partition,
                        key,
                        method,
                        url,
                        status,
                        headers_json,
                        body,
                        date_header,
                        Utc::now().to_rfc3339()
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for `key` in `partition`.
    ///
    /// The partition is created on first read; a missing entry is `None`.
    pub async fn get_entry(&self, partition: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                ensure_partition(conn, &partition)?;
                let row = conn
                    .query_row(
                        &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE partition = ?1 AND cache_key = ?2"),
                        params![partition, key],
                        row_to_entry,
                    )
                    .optional()?;
                row.map(decode_entry).transpose()
            })
            .await
            .map_err(Error::from)
    }

    /// All entries of a partition. A missing partition yields an empty list.
    pub async fn list_entries(&self, partition: &str) -> Result<Vec<CacheEntry>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntry>, Error> {
                let mut stmt =
                    conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE partition = ?1 ORDER BY url"))?;
                let rows = stmt
                    .query_map(params![partition], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows.into_iter().map(decode_entry).collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it was already gone.
    pub async fn delete_entry(&self, partition: &str, key: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND cache_key = ?2",
                    params![partition, key],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a partition.
    pub async fn count_entries(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
