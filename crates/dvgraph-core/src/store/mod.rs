//! SQLite Lineage Store
//!
//! A thin data-access layer over the `nodes` and `edges` tables. The store is
//! the durable record of the graph; [`crate::LineageGraph`] is a cache over it.
//!
//! All writes go through a [`StoreTransaction`] so that a graph mutation
//! touching several rows (auto-created endpoints plus the edge) commits or
//! fails as a unit.

pub mod schema;

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Transaction};
use thiserror::Error;
use tracing::debug;

use crate::node::{LineageNode, NodeIdentity};
use schema::{
    EDGE_COLUMNS, NODE_COLUMNS, SCHEMA_CREATE_EDGES, SCHEMA_CREATE_IDENTITY_INDEX,
    SCHEMA_CREATE_INDEXES, SCHEMA_CREATE_METADATA, SCHEMA_CREATE_NODES, STORE_SCHEMA_VERSION,
};

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: String, found: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options applied when opening a store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a write waits on a locked database before failing
    pub busy_timeout: Duration,
    /// Create the unique (kind, name, version) index
    pub enforce_unique_identity: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
            enforce_unique_identity: true,
        }
    }
}

/// A persisted node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    /// Surrogate id
    pub id: i64,
    /// Kind tag as accepted by the factory
    pub kind: String,
    pub name: String,
    pub version: i64,
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A persisted edge: `to_node_id` depends on `from_node_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRow {
    pub id: i64,
    pub from_node_id: i64,
    pub to_node_id: i64,
}

/// A connection to the lineage database
pub struct LineageStore {
    conn: Connection,
}

impl LineageStore {
    /// Open (or create) a lineage database at `path`
    pub fn open(path: &Path, options: &StoreOptions) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn, options)?;
        let store = Self { conn };
        store.initialize_schema(options)?;

        debug!(path = %path.display(), "Opened lineage store");
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::in_memory_with(&StoreOptions::default())
    }

    /// Create an in-memory database with explicit options
    pub fn in_memory_with(options: &StoreOptions) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn, options)?;
        let store = Self { conn };
        store.initialize_schema(options)?;
        Ok(store)
    }

    fn configure_connection(conn: &Connection, options: &StoreOptions) -> SqliteResult<()> {
        // WAL lets readers proceed while the single writer commits
        conn.pragma_update(None, "journal_mode", "WAL")?;
        // Required for ON DELETE CASCADE on edges
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(options.busy_timeout)?;
        Ok(())
    }

    fn initialize_schema(&self, options: &StoreOptions) -> Result<(), StoreError> {
        self.conn.execute(SCHEMA_CREATE_NODES, [])?;
        self.conn.execute(SCHEMA_CREATE_EDGES, [])?;
        self.conn.execute(SCHEMA_CREATE_METADATA, [])?;
        self.conn.execute_batch(SCHEMA_CREATE_INDEXES)?;
        if options.enforce_unique_identity {
            self.conn.execute(SCHEMA_CREATE_IDENTITY_INDEX, [])?;
        }

        match self.get_metadata("schema_version")? {
            Some(version) if version == STORE_SCHEMA_VERSION => {}
            Some(version) => {
                return Err(StoreError::SchemaVersionMismatch {
                    expected: STORE_SCHEMA_VERSION.to_string(),
                    found: version,
                });
            }
            None => self.set_metadata("schema_version", STORE_SCHEMA_VERSION)?,
        }
        Ok(())
    }

    // =========================================================================
    // Metadata Operations
    // =========================================================================

    /// Get a metadata value
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self
            .conn
            .query_row(
                "SELECT value FROM graph_metadata WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    /// Set a metadata value
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO graph_metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Look up the surrogate id of a node by identity
    pub fn find_node_id(&self, identity: &NodeIdentity) -> Result<Option<i64>, StoreError> {
        find_node_id(&self.conn, identity)
    }

    /// All node rows, in insertion order
    pub fn query_all_nodes(&self) -> Result<Vec<NodeRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {NODE_COLUMNS} FROM nodes ORDER BY id"))?;

        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        raw.into_iter()
            .map(|(id, kind, name, version, properties)| -> Result<NodeRow, StoreError> {
                let properties = properties
                    .map(|json| serde_json::from_str(&json))
                    .transpose()?;
                Ok(NodeRow {
                    id,
                    kind,
                    name,
                    version,
                    properties,
                })
            })
            .collect()
    }

    /// All edge rows, in insertion order
    pub fn query_all_edges(&self) -> Result<Vec<EdgeRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {EDGE_COLUMNS} FROM edges ORDER BY id"))?;

        let edges = stmt
            .query_map([], |row| {
                Ok(EdgeRow {
                    id: row.get(0)?,
                    from_node_id: row.get(1)?,
                    to_node_id: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(edges)
    }

    /// Get node count
    pub fn node_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get edge count
    pub fn edge_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Begin a write transaction. Nothing is persisted until
    /// [`StoreTransaction::commit`]; dropping the transaction rolls back.
    pub fn transaction(&mut self) -> Result<StoreTransaction<'_>, StoreError> {
        Ok(StoreTransaction {
            tx: self.conn.transaction()?,
        })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// A single atomic batch of store writes
pub struct StoreTransaction<'a> {
    tx: Transaction<'a>,
}

impl StoreTransaction<'_> {
    /// Insert a node row unless one with the same identity exists.
    ///
    /// Returns the surrogate id and whether a row was inserted. The existing
    /// row, including its properties, is left untouched.
    pub fn upsert_node(&self, node: &LineageNode) -> Result<(i64, bool), StoreError> {
        if let Some(id) = find_node_id(&self.tx, node.identity())? {
            return Ok((id, false));
        }

        let properties = node.properties().map(serde_json::to_string).transpose()?;
        self.tx.execute(
            "INSERT INTO nodes (kind, name, version, properties) VALUES (?1, ?2, ?3, ?4)",
            params![
                node.kind().as_str(),
                node.name(),
                node.version(),
                properties
            ],
        )?;
        Ok((self.tx.last_insert_rowid(), true))
    }

    /// Delete a node row together with every edge row touching it
    pub fn delete_node(&self, node_id: i64) -> Result<bool, StoreError> {
        self.tx.execute(
            "DELETE FROM edges WHERE from_node_id = ?1 OR to_node_id = ?1",
            [node_id],
        )?;
        let deleted = self.tx.execute("DELETE FROM nodes WHERE id = ?1", [node_id])?;
        Ok(deleted > 0)
    }

    /// Insert an edge row, returning its surrogate id.
    ///
    /// An existing row for the same pair is reused.
    pub fn insert_edge(&self, from_node_id: i64, to_node_id: i64) -> Result<i64, StoreError> {
        self.tx.execute(
            "INSERT OR IGNORE INTO edges (from_node_id, to_node_id) VALUES (?1, ?2)",
            params![from_node_id, to_node_id],
        )?;
        let id = self.tx.query_row(
            "SELECT id FROM edges WHERE from_node_id = ?1 AND to_node_id = ?2",
            params![from_node_id, to_node_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Delete the edge row for a pair of node ids
    pub fn delete_edge(&self, from_node_id: i64, to_node_id: i64) -> Result<bool, StoreError> {
        let deleted = self.tx.execute(
            "DELETE FROM edges WHERE from_node_id = ?1 AND to_node_id = ?2",
            params![from_node_id, to_node_id],
        )?;
        Ok(deleted > 0)
    }

    /// Commit every write made through this transaction
    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

fn find_node_id(conn: &Connection, identity: &NodeIdentity) -> Result<Option<i64>, StoreError> {
    let id = conn
        .query_row(
            "SELECT id FROM nodes WHERE kind = ?1 AND name = ?2 AND version = ?3 ORDER BY id LIMIT 1",
            params![identity.kind().as_str(), identity.name(), identity.version()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}
