//! Failure accounting store
//!
//! SQLite-backed tracking of per-process consecutive failures plus an
//! append-only audit trail of every check. The store is only ever
//! written by a single check cycle at a time (the cycle-level lock
//! guarantees that), so each check is one transaction and no further
//! locking happens here.

use crate::error::Result;
use crate::monitor::ProcessHealth;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS process_state (
    process_key TEXT PRIMARY KEY,
    consecutive_failures INTEGER DEFAULT 0,
    last_check_at TEXT,
    last_health TEXT,
    last_pid INTEGER,
    last_heartbeat_ts TEXT,
    last_iteration INTEGER
);

CREATE TABLE IF NOT EXISTS check_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    process_key TEXT NOT NULL,
    checked_at TEXT NOT NULL,
    health TEXT NOT NULL,
    pid INTEGER,
    heartbeat_ts TEXT,
    iteration INTEGER,
    action_taken TEXT
);
";

/// One audit row from the check history
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)] // Audit-trail API, read via history()
pub struct CheckHistoryEntry {
    pub id: i64,
    pub process_key: String,
    /// RFC 3339 timestamp as recorded
    pub checked_at: String,
    pub health: String,
    pub pid: Option<i32>,
    pub heartbeat_ts: Option<String>,
    pub iteration: Option<i64>,
    pub action_taken: Option<String>,
}

/// SQLite-backed store for check state and history
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// In-memory store for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Record a check result. Returns the consecutive-failure count
    /// after the update.
    ///
    /// A `Healthy` verdict resets the counter to 0; any other verdict
    /// increments it by one. The state upsert and the audit insert
    /// commit as one transaction.
    pub fn record_check(
        &mut self,
        process_key: &str,
        health: ProcessHealth,
        pid: Option<i32>,
        heartbeat_ts: Option<DateTime<Utc>>,
        iteration: Option<u64>,
        action: Option<&str>,
    ) -> Result<u32> {
        let now = Utc::now().to_rfc3339();

        let failures = if health == ProcessHealth::Healthy {
            0
        } else {
            self.consecutive_failures(process_key)? + 1
        };

        let heartbeat_ts = heartbeat_ts.map(|t| t.to_rfc3339());
        let iteration = iteration.map(|i| i as i64);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO process_state
               (process_key, consecutive_failures, last_check_at,
                last_health, last_pid, last_heartbeat_ts, last_iteration)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
               ON CONFLICT(process_key) DO UPDATE SET
                 consecutive_failures = excluded.consecutive_failures,
                 last_check_at = excluded.last_check_at,
                 last_health = excluded.last_health,
                 last_pid = excluded.last_pid,
                 last_heartbeat_ts = excluded.last_heartbeat_ts,
                 last_iteration = excluded.last_iteration",
            params![
                process_key,
                failures,
                now,
                health.as_str(),
                pid,
                heartbeat_ts,
                iteration
            ],
        )?;
        tx.execute(
            "INSERT INTO check_history
               (process_key, checked_at, health, pid, heartbeat_ts,
                iteration, action_taken)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                process_key,
                now,
                health.as_str(),
                pid,
                heartbeat_ts,
                iteration,
                action
            ],
        )?;
        tx.commit()?;

        Ok(failures)
    }

    /// Current consecutive-failure count; 0 for a never-checked process
    pub fn consecutive_failures(&self, process_key: &str) -> Result<u32> {
        let count: Option<u32> = self
            .conn
            .query_row(
                "SELECT consecutive_failures FROM process_state WHERE process_key = ?1",
                [process_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    /// Force the counter to 0 after a successful recovery.
    ///
    /// Writes no audit row; an unknown process key is a no-op.
    pub fn reset_failures(&self, process_key: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE process_state SET consecutive_failures = 0 WHERE process_key = ?1",
            [process_key],
        )?;
        Ok(())
    }

    /// Check history for a process, oldest first
    #[allow(dead_code)] // Public API for audit inspection
    pub fn history(&self, process_key: &str) -> Result<Vec<CheckHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, process_key, checked_at, health, pid, heartbeat_ts,
                    iteration, action_taken
               FROM check_history WHERE process_key = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([process_key], |row| {
            Ok(CheckHistoryEntry {
                id: row.get(0)?,
                process_key: row.get(1)?,
                checked_at: row.get(2)?,
                health: row.get(3)?,
                pid: row.get(4)?,
                heartbeat_ts: row.get(5)?,
                iteration: row.get(6)?,
                action_taken: row.get(7)?,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        store: &mut Store,
        key: &str,
        health: ProcessHealth,
        action: Option<&str>,
    ) -> u32 {
        store
            .record_check(key, health, Some(1234), Some(Utc::now()), Some(7), action)
            .unwrap()
    }

    #[test]
    fn test_counter_increments_on_unhealthy() {
        let mut store = Store::open_in_memory().unwrap();

        assert_eq!(record(&mut store, "p", ProcessHealth::TimedOut, None), 1);
        assert_eq!(record(&mut store, "p", ProcessHealth::NoHeartbeat, None), 2);
        assert_eq!(record(&mut store, "p", ProcessHealth::StalePid, None), 3);
        assert_eq!(store.consecutive_failures("p").unwrap(), 3);
    }

    #[test]
    fn test_counter_resets_on_healthy() {
        let mut store = Store::open_in_memory().unwrap();

        record(&mut store, "p", ProcessHealth::TimedOut, None);
        record(&mut store, "p", ProcessHealth::TimedOut, None);
        assert_eq!(record(&mut store, "p", ProcessHealth::Healthy, None), 0);
        assert_eq!(store.consecutive_failures("p").unwrap(), 0);

        // Counting starts over after a healthy check.
        assert_eq!(record(&mut store, "p", ProcessHealth::TimedOut, None), 1);
    }

    #[test]
    fn test_counters_are_independent_per_key() {
        let mut store = Store::open_in_memory().unwrap();

        record(&mut store, "a", ProcessHealth::TimedOut, None);
        record(&mut store, "a", ProcessHealth::TimedOut, None);
        record(&mut store, "b", ProcessHealth::TimedOut, None);

        assert_eq!(store.consecutive_failures("a").unwrap(), 2);
        assert_eq!(store.consecutive_failures("b").unwrap(), 1);
    }

    #[test]
    fn test_unknown_key_has_zero_failures() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.consecutive_failures("never_seen").unwrap(), 0);
    }

    #[test]
    fn test_reset_failures() {
        let mut store = Store::open_in_memory().unwrap();

        record(&mut store, "p", ProcessHealth::TimedOut, None);
        record(&mut store, "p", ProcessHealth::TimedOut, None);
        store.reset_failures("p").unwrap();
        assert_eq!(store.consecutive_failures("p").unwrap(), 0);
    }

    #[test]
    fn test_reset_unknown_key_is_noop() {
        let store = Store::open_in_memory().unwrap();
        store.reset_failures("never_seen").unwrap();
        assert_eq!(store.consecutive_failures("never_seen").unwrap(), 0);
    }

    #[test]
    fn test_history_is_append_only_in_insertion_order() {
        let mut store = Store::open_in_memory().unwrap();

        record(&mut store, "p", ProcessHealth::TimedOut, Some("waiting_for_consecutive"));
        record(&mut store, "p", ProcessHealth::Healthy, None);
        record(&mut store, "q", ProcessHealth::StalePid, None);

        let history = store.history("p").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].health, "timed_out");
        assert_eq!(
            history[0].action_taken.as_deref(),
            Some("waiting_for_consecutive")
        );
        assert_eq!(history[1].health, "healthy");
        assert!(history[0].id < history[1].id);

        // Reset writes no audit row.
        store.reset_failures("p").unwrap();
        assert_eq!(store.history("p").unwrap().len(), 2);
    }

    #[test]
    fn test_record_check_snapshots_state() {
        let mut store = Store::open_in_memory().unwrap();
        let hb = Utc::now();
        store
            .record_check("p", ProcessHealth::TimedOut, Some(42), Some(hb), Some(9), None)
            .unwrap();

        let history = store.history("p").unwrap();
        assert_eq!(history[0].pid, Some(42));
        assert_eq!(history[0].iteration, Some(9));
        assert_eq!(history[0].heartbeat_ts.as_deref(), Some(hb.to_rfc3339().as_str()));
    }

    #[test]
    fn test_reopen_persists_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("vigil.db");

        {
            let mut store = Store::open(&db_path).unwrap();
            record(&mut store, "p", ProcessHealth::TimedOut, None);
        }

        let store = Store::open(&db_path).unwrap();
        assert_eq!(store.consecutive_failures("p").unwrap(), 1);
        assert_eq!(store.history("p").unwrap().len(), 1);
    }
}
