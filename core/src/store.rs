//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The pipeline and the runner call store methods — they never execute
//! SQL directly.
//!
//! Tables are stored cell by cell: `dataset_column` holds the schema in
//! column order, `dataset_cell` one row per populated cell. Floats are
//! stored as REAL, so values round-trip bit for bit.

use crate::{
    error::SimResult,
    event::EventLogEntry,
    table::{Column, ColumnKind, Table},
};
use rusqlite::{params, types::Null, Connection, OptionalExtension};

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    pub fn run_seed(&self, run_id: &str) -> SimResult<Option<u64>> {
        let seed = self
            .conn
            .query_row(
                "SELECT seed FROM run WHERE run_id = ?1",
                params![run_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(seed.map(|s| s as u64))
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, seq, stage, event_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.seq as i64,
                entry.stage,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, seq, stage, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY seq ASC, id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    seq:        row.get::<_, i64>(2)? as u64,
                    stage:      row.get(3)?,
                    event_type: row.get(4)?,
                    payload:    row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Tables ─────────────────────────────────────────────────

    /// Store `table` under `table_name`, replacing any previous version.
    pub fn save_table(&self, run_id: &str, table_name: &str, table: &Table) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM dataset_cell WHERE run_id = ?1 AND table_name = ?2",
            params![run_id, table_name],
        )?;
        tx.execute(
            "DELETE FROM dataset_column WHERE run_id = ?1 AND table_name = ?2",
            params![run_id, table_name],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO dataset (run_id, table_name, row_count) VALUES (?1, ?2, ?3)",
            params![run_id, table_name, table.row_count() as i64],
        )?;
        {
            let mut col_stmt = tx.prepare(
                "INSERT INTO dataset_column (run_id, table_name, position, name, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut cell_stmt = tx.prepare(
                "INSERT INTO dataset_cell
                 (run_id, table_name, position, row_idx, value_real, value_int, value_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, (name, column)) in table.columns().enumerate() {
                let position = position as i64;
                col_stmt.execute(params![run_id, table_name, position, name, column.kind().as_str()])?;
                match column {
                    Column::Float(values) => {
                        for (row, value) in values.iter().enumerate() {
                            if let Some(v) = value {
                                cell_stmt.execute(params![
                                    run_id, table_name, position, row as i64, v, Null, Null
                                ])?;
                            }
                        }
                    }
                    Column::Int(values) => {
                        for (row, value) in values.iter().enumerate() {
                            if let Some(v) = value {
                                cell_stmt.execute(params![
                                    run_id, table_name, position, row as i64, Null, v, Null
                                ])?;
                            }
                        }
                    }
                    Column::Text(values) => {
                        for (row, value) in values.iter().enumerate() {
                            if let Some(v) = value {
                                cell_stmt.execute(params![
                                    run_id, table_name, position, row as i64, Null, Null, v
                                ])?;
                            }
                        }
                    }
                }
            }
        }
        tx.commit()?;
        log::debug!(
            "store: saved {table_name} for run {run_id} ({} rows, {} columns)",
            table.row_count(),
            table.column_count()
        );
        Ok(())
    }

    pub fn load_table(&self, run_id: &str, table_name: &str) -> SimResult<Table> {
        let rows = self
            .conn
            .query_row(
                "SELECT row_count FROM dataset WHERE run_id = ?1 AND table_name = ?2",
                params![run_id, table_name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .ok_or_else(|| anyhow::anyhow!("table {table_name} not stored for run {run_id}"))?
            as usize;

        let mut col_stmt = self.conn.prepare(
            "SELECT position, name, kind FROM dataset_column
             WHERE run_id = ?1 AND table_name = ?2
             ORDER BY position ASC",
        )?;
        let columns = col_stmt
            .query_map(params![run_id, table_name], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut cell_stmt = self.conn.prepare(
            "SELECT row_idx, value_real, value_int, value_text FROM dataset_cell
             WHERE run_id = ?1 AND table_name = ?2 AND position = ?3",
        )?;

        let mut table = Table::with_rows(rows);
        for (position, name, kind) in columns {
            let kind = ColumnKind::parse(&kind)
                .ok_or_else(|| anyhow::anyhow!("column {name} has unknown kind {kind}"))?;
            let cells = cell_stmt
                .query_map(params![run_id, table_name, position], |row| {
                    Ok((
                        row.get::<_, i64>(0)? as usize,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            if let Some((row, ..)) = cells.iter().find(|(row, ..)| *row >= rows) {
                return Err(anyhow::anyhow!("column {name} has a cell at row {row} of {rows}").into());
            }

            let column = match kind {
                ColumnKind::Float => {
                    let mut values = vec![None; rows];
                    for (row, real, _, _) in cells {
                        values[row] = real;
                    }
                    Column::Float(values)
                }
                ColumnKind::Int => {
                    let mut values = vec![None; rows];
                    for (row, _, int, _) in cells {
                        values[row] = int;
                    }
                    Column::Int(values)
                }
                ColumnKind::Text => {
                    let mut values = vec![None; rows];
                    for (row, _, _, text) in cells {
                        values[row] = text;
                    }
                    Column::Text(values)
                }
            };
            table.add_column(name, column)?;
        }
        Ok(table)
    }
}
