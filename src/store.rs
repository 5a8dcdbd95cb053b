//! Durable standings storage
//!
//! Holds the last-known-good standings per series. The only write path is
//! `replace`, which swaps a series' full row set inside one transaction so
//! readers never observe a partially-updated table.

use crate::models::{CanonicalRecord, ReconciliationRun, RunOutcome};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use thiserror::Error;
use tracing::{info, warn};

/// Schema tuned the same way as the rest of our sqlite usage: WAL so reads
/// coexist with the reconciler's write transaction.
const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;

CREATE TABLE IF NOT EXISTS standings (
    series_id TEXT NOT NULL,
    team_id TEXT NOT NULL,
    team_name TEXT NOT NULL,
    matches INTEGER NOT NULL,
    won INTEGER NOT NULL,
    lost INTEGER NOT NULL,
    draw INTEGER NOT NULL,
    points INTEGER NOT NULL,
    nrr REAL NOT NULL,
    pos INTEGER NOT NULL,
    last_updated TEXT NOT NULL,
    PRIMARY KEY (series_id, team_id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_standings_table
    ON standings(series_id, points DESC, nrr DESC, pos);

CREATE TABLE IF NOT EXISTS series_sync (
    series_id TEXT PRIMARY KEY,
    last_success_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS reconciliation_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    series_id TEXT NOT NULL,
    started_at TEXT NOT NULL,
    outcome TEXT NOT NULL,
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_series
    ON reconciliation_runs(series_id, started_at DESC);
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Standings storage backed by sqlite.
pub struct StandingsStore {
    conn: Mutex<Connection>,
}

impl StandingsStore {
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX; // We handle our own locking

        let conn = Connection::open_with_flags(db_path, flags)?;
        conn.execute_batch(SCHEMA_SQL)?;

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap_or_default();
        if journal_mode.to_lowercase() != "wal" {
            warn!("WAL mode not active, journal_mode = {}", journal_mode);
        }

        info!("📊 Standings database initialized at: {}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Replace the full standings row set for a series in one transaction.
    ///
    /// Either every new row lands or none do; a fault mid-write rolls back
    /// and leaves the prior row set visible to readers. A successful commit
    /// also advances `series_sync.last_success_at`.
    pub fn replace(
        &self,
        series_id: &str,
        records: &[CanonicalRecord],
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        conn.execute("BEGIN IMMEDIATE", [])?;
        match Self::replace_in_tx(&conn, series_id, records) {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    fn replace_in_tx(
        conn: &Connection,
        series_id: &str,
        records: &[CanonicalRecord],
    ) -> Result<(), StoreError> {
        conn.execute(
            "DELETE FROM standings WHERE series_id = ?1",
            params![series_id],
        )?;

        {
            let mut stmt = conn.prepare_cached(
                "INSERT INTO standings
                 (series_id, team_id, team_name, matches, won, lost, draw, points, nrr, pos, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;

            for record in records {
                stmt.execute(params![
                    series_id,
                    &record.team_id,
                    &record.team_name,
                    record.matches,
                    record.won,
                    record.lost,
                    record.draw,
                    record.points,
                    record.nrr,
                    record.pos,
                    record.last_updated.to_rfc3339(),
                ])?;
            }
        }

        let synced_at = records
            .first()
            .map(|r| r.last_updated)
            .unwrap_or_else(Utc::now);

        conn.execute(
            "INSERT INTO series_sync (series_id, last_success_at) VALUES (?1, ?2)
             ON CONFLICT(series_id) DO UPDATE SET last_success_at = excluded.last_success_at",
            params![series_id, synced_at.to_rfc3339()],
        )?;

        Ok(())
    }

    /// Read the standings table for a series, best team first: points
    /// descending, then net run rate descending, unresolved ties in
    /// upstream-provided order. Empty vec (not an error) when no rows exist.
    pub fn read(&self, series_id: &str) -> Result<Vec<CanonicalRecord>, StoreError> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare_cached(
            "SELECT series_id, team_id, team_name, matches, won, lost, draw, points, nrr, pos, last_updated
             FROM standings
             WHERE series_id = ?1
             ORDER BY points DESC, nrr DESC, pos ASC",
        )?;

        let records = stmt
            .query_map([series_id], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Append one reconciliation audit row.
    pub fn record_run(&self, run: &ReconciliationRun) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reconciliation_runs (series_id, started_at, outcome, error)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                &run.series_id,
                run.started_at.to_rfc3339(),
                run.outcome.as_str(),
                run.error.as_deref(),
            ],
        )?;
        Ok(())
    }

    /// Most recent successful reconciliation for a series, if any. This is
    /// what the staleness policy consults.
    pub fn last_success_at(
        &self,
        series_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT last_success_at FROM series_sync WHERE series_id = ?1",
        )?;

        let mut rows = stmt.query([series_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let raw: String = row.get(0)?;
        let parsed = parse_timestamp(&raw)?;
        Ok(Some(parsed))
    }

    /// Recent audit rows for a series, newest first.
    pub fn recent_runs(
        &self,
        series_id: &str,
        limit: usize,
    ) -> Result<Vec<ReconciliationRun>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT series_id, started_at, outcome, error
             FROM reconciliation_runs
             WHERE series_id = ?1
             ORDER BY started_at DESC, id DESC
             LIMIT ?2",
        )?;

        let mut rows = stmt.query(params![series_id, limit])?;
        let mut runs = Vec::new();

        while let Some(row) = rows.next()? {
            let series_id: String = row.get(0)?;
            let started_at: String = row.get(1)?;
            let outcome: String = row.get(2)?;
            let error: Option<String> = row.get(3)?;

            runs.push(ReconciliationRun {
                series_id,
                started_at: parse_timestamp(&started_at)?,
                outcome: RunOutcome::from_str(&outcome),
                error,
            });
        }

        Ok(runs)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<CanonicalRecord> {
        let last_updated: String = row.get(10)?;
        let last_updated = DateTime::parse_from_rfc3339(&last_updated)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        Ok(CanonicalRecord {
            series_id: row.get(0)?,
            team_id: row.get(1)?,
            team_name: row.get(2)?,
            matches: row.get(3)?,
            won: row.get(4)?,
            lost: row.get(5)?,
            draw: row.get(6)?,
            points: row.get(7)?,
            nrr: row.get(8)?,
            pos: row.get(9)?,
            last_updated,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}
