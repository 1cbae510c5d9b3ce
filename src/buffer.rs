// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Durable buffer store.
//!
//! Backend-agnostic trait plus the SQLite implementation this agent ships
//! with, modelled on the `PersistenceStore`/`SqliteStore` split this crate
//! grew out of: a small trait callers code against, one real backend behind
//! it, tested against the trait rather than the concrete type.

use crate::error::AgentError;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// A durable buffer entry: an encoded transmission record awaiting upload.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferEntry {
    /// Monotonically increasing local identifier (append order).
    pub id: i64,
    /// Sample timestamp, used to order drain iteration.
    pub timestamp: i64,
    /// The encoded transmission record.
    pub payload: Vec<u8>,
}

/// Durable, crash-safe, ordered queue of encoded payloads.
pub trait BufferStore: Send {
    /// Append a new entry. Must be atomic with respect to a process crash.
    fn store(&self, timestamp: i64, payload: Vec<u8>) -> Result<(), AgentError>;

    /// Entries in non-decreasing `timestamp` order, ties broken by `id`.
    fn iter_oldest_first(&self) -> Result<Vec<BufferEntry>, AgentError>;

    /// Remove a specific entry after a successful upload.
    fn remove(&self, id: i64) -> Result<(), AgentError>;

    /// Number of entries currently buffered.
    fn len(&self) -> Result<usize, AgentError>;

    /// True iff no entries are buffered.
    fn is_empty(&self) -> Result<bool, AgentError> {
        Ok(self.len()? == 0)
    }
}

/// SQLite-backed [`BufferStore`]. Thread-safe via an internal mutex since
/// `rusqlite::Connection` is not `Sync`.
pub struct SqliteBufferStore {
    conn: Mutex<Connection>,
}

impl SqliteBufferStore {
    /// Open (creating if absent) the per-VIN buffer file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            AgentError::FatalInit(format!(
                "failed to open buffer store at {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory buffer store, for tests and for a VIN with no durable
    /// buffer directory configured.
    pub fn open_in_memory() -> Result<Self, AgentError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AgentError::FatalInit(format!("failed to open in-memory buffer: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), AgentError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS buffer (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                payload BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| AgentError::StorageUnavailable(format!("schema init failed: {e}")))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_buffer_timestamp ON buffer(timestamp)",
            [],
        )
        .map_err(|e| AgentError::StorageUnavailable(format!("index init failed: {e}")))?;

        Ok(())
    }

    /// Flush and close. SQLite commits are durable per-statement already;
    /// this exists to give the agent an explicit, documented close point
    /// rather than relying on `Drop` alone.
    pub fn close(self) -> Result<(), AgentError> {
        let conn = self.conn.into_inner().unwrap();
        conn.execute("PRAGMA wal_checkpoint(TRUNCATE)", [])
            .map_err(|e| AgentError::StorageUnavailable(format!("close/flush failed: {e}")))?;
        Ok(())
    }
}

impl BufferStore for SqliteBufferStore {
    fn store(&self, timestamp: i64, payload: Vec<u8>) -> Result<(), AgentError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO buffer (timestamp, payload) VALUES (?1, ?2)",
            params![timestamp, payload],
        )
        .map_err(|e| AgentError::StorageUnavailable(format!("append failed: {e}")))?;
        Ok(())
    }

    fn iter_oldest_first(&self) -> Result<Vec<BufferEntry>, AgentError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, timestamp, payload FROM buffer ORDER BY timestamp ASC, id ASC")
            .map_err(|e| AgentError::StorageUnavailable(format!("iterate failed: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(BufferEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    payload: row.get(2)?,
                })
            })
            .map_err(|e| AgentError::StorageUnavailable(format!("iterate failed: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AgentError::StorageUnavailable(format!("iterate failed: {e}")))
    }

    fn remove(&self, id: i64) -> Result<(), AgentError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM buffer WHERE id = ?1", params![id])
            .map_err(|e| AgentError::StorageUnavailable(format!("remove failed: {e}")))?;
        Ok(())
    }

    fn len(&self) -> Result<usize, AgentError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM buffer", [], |row| row.get(0))
            .map_err(|e| AgentError::StorageUnavailable(format!("count failed: {e}")))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_iterate_returns_the_entry() {
        let store = SqliteBufferStore::open_in_memory().unwrap();
        store.store(1000, vec![1, 2, 3]).unwrap();

        let entries = store.iter_oldest_first().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].timestamp, 1000);
        assert_eq!(entries[0].payload, vec![1, 2, 3]);
    }

    #[test]
    fn iteration_order_is_timestamp_then_id() {
        let store = SqliteBufferStore::open_in_memory().unwrap();
        store.store(300, vec![3]).unwrap();
        store.store(100, vec![1]).unwrap();
        store.store(200, vec![2]).unwrap();
        store.store(100, vec![1, 1]).unwrap(); // tie on timestamp, later id

        let entries = store.iter_oldest_first().unwrap();
        let timestamps: Vec<i64> = entries.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![100, 100, 200, 300]);
        // tie broken by id: the first-appended 100 comes before the second
        assert_eq!(entries[0].payload, vec![1]);
        assert_eq!(entries[1].payload, vec![1, 1]);
    }

    #[test]
    fn remove_deletes_only_the_given_entry() {
        let store = SqliteBufferStore::open_in_memory().unwrap();
        store.store(1, vec![1]).unwrap();
        store.store(2, vec![2]).unwrap();
        let entries = store.iter_oldest_first().unwrap();
        let first_id = entries[0].id;

        store.remove(first_id).unwrap();

        let remaining = store.iter_oldest_first().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].payload, vec![2]);
    }

    #[test]
    fn len_and_is_empty_track_the_entry_count() {
        let store = SqliteBufferStore::open_in_memory().unwrap();
        assert!(store.is_empty().unwrap());
        store.store(1, vec![1]).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(!store.is_empty().unwrap());
    }

    #[test]
    fn durability_across_reopening_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("durability-test.db");

        {
            let store = SqliteBufferStore::open(&path).unwrap();
            for ts in 0..30 {
                store.store(ts, vec![ts as u8]).unwrap();
            }
            store.close().unwrap();
        }

        // Simulates a process restart against the same buffer file.
        let reopened = SqliteBufferStore::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 30);
        let entries = reopened.iter_oldest_first().unwrap();
        assert_eq!(entries.first().unwrap().timestamp, 0);
        assert_eq!(entries.last().unwrap().timestamp, 29);
    }
}
