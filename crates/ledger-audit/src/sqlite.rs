//! `SQLite`-backed implementation of `LedgerStore`.
//!
//! One `audit_logs` table, WAL journal, and triggers that abort any UPDATE
//! or DELETE. The tip compare-and-swap runs inside an IMMEDIATE transaction,
//! so two processes sharing the same file cannot both chain from one tip.

// SQLite stores ids and counts as i64; they are never negative here.
#![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use ledger_contracts::{
    block::{canonical_timestamp, parse_timestamp},
    Block, LedgerError, LedgerResult, NewBlock, GENESIS_HASH,
};
use ledger_core::LedgerStore;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

const SELECT_COLUMNS: &str = "SELECT id, timestamp, actor, action, details, hash, prev_hash FROM audit_logs";

fn sql_err(e: rusqlite::Error) -> LedgerError {
    LedgerError::store(e)
}

/// A row as it comes out of SQLite, before the timestamp is decoded.
struct RawRow {
    id: i64,
    timestamp: String,
    actor: String,
    action: String,
    details: String,
    hash: String,
    prev_hash: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            actor: row.get(2)?,
            action: row.get(3)?,
            details: row.get(4)?,
            hash: row.get(5)?,
            prev_hash: row.get(6)?,
        })
    }

    fn into_block(self) -> LedgerResult<Block> {
        let sequence_id = self.id as u64;
        let timestamp =
            parse_timestamp(&self.timestamp).map_err(|e| LedgerError::CorruptRecord {
                sequence_id,
                reason: format!("unparsable timestamp '{}': {}", self.timestamp, e),
            })?;

        Ok(Block {
            sequence_id,
            timestamp,
            actor: self.actor,
            action: self.action,
            details: self.details,
            hash: self.hash,
            prev_hash: self.prev_hash,
        })
    }
}

/// The append-only ledger table backed by `SQLite`.
pub struct SqliteLedgerStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl SqliteLedgerStore {
    /// Open or create a ledger database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the file cannot be opened or the schema
    /// cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            LedgerError::store(format!("failed to open ledger '{}': {}", path.display(), e))
        })?;
        Self::initialize(&conn)?;

        debug!(path = %path.display(), "opened sqlite ledger");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a ledger in an in-memory database, for tests.
    pub fn in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Self::initialize(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize(conn: &Connection) -> LedgerResult<()> {
        conn.execute_batch(SCHEMA_SQL).map_err(sql_err)
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LedgerError::store(format!("ledger connection lock poisoned: {}", e)))
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn latest(&self) -> LedgerResult<Option<Block>> {
        let conn = self.lock()?;
        let sql = format!("{} ORDER BY id DESC LIMIT 1", SELECT_COLUMNS);
        conn.query_row(&sql, [], RawRow::from_row)
            .optional()
            .map_err(sql_err)?
            .map(RawRow::into_block)
            .transpose()
    }

    fn get(&self, sequence_id: u64) -> LedgerResult<Option<Block>> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        conn.query_row(&sql, params![sequence_id as i64], RawRow::from_row)
            .optional()
            .map_err(sql_err)?
            .map(RawRow::into_block)
            .transpose()
    }

    fn insert(&self, block: &NewBlock) -> LedgerResult<Block> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sql_err)?;

        let tip: Option<String> = tx
            .query_row(
                "SELECT hash FROM audit_logs ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(sql_err)?;
        let tip = tip.unwrap_or_else(|| GENESIS_HASH.to_string());

        if tip != block.prev_hash {
            // Dropping `tx` rolls back.
            return Err(LedgerError::StaleTip {
                expected: block.prev_hash.clone(),
                found: tip,
            });
        }

        tx.execute(
            "INSERT INTO audit_logs (timestamp, actor, action, details, hash, prev_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                canonical_timestamp(&block.timestamp),
                block.actor,
                block.action,
                block.details,
                block.hash,
                block.prev_hash,
            ],
        )
        .map_err(sql_err)?;
        let sequence_id = tx.last_insert_rowid() as u64;
        tx.commit().map_err(sql_err)?;

        Ok(block.clone().into_block(sequence_id))
    }

    fn read_from(&self, cursor: u64, limit: usize) -> LedgerResult<Vec<Block>> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE id >= ?1 ORDER BY id ASC LIMIT ?2", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql).map_err(sql_err)?;

        let rows = stmt
            .query_map(
                params![cursor.min(i64::MAX as u64) as i64, limit.min(i64::MAX as usize) as i64],
                RawRow::from_row,
            )
            .map_err(sql_err)?;

        let blocks: LedgerResult<Vec<Block>> = rows
            .map(|row| row.map_err(sql_err).and_then(RawRow::into_block))
            .collect();
        blocks
    }

    fn count(&self) -> LedgerResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_logs", [], |row| row.get(0))
            .map_err(sql_err)?;
        Ok(count as u64)
    }
}
