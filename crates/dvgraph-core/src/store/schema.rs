//! SQLite Schema Definitions for Lineage Storage
//!
//! Two tables form the durable record of the graph: `nodes` keyed by a
//! surrogate id, and `edges` referencing node ids by foreign key.

/// Schema version stored in `graph_metadata`
pub const STORE_SCHEMA_VERSION: &str = "1";

/// SQL to create the nodes table
///
/// `properties` holds the node's opaque property bag as a JSON object, or
/// NULL when the node has none.
pub const SCHEMA_CREATE_NODES: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    -- Surrogate key
    id INTEGER PRIMARY KEY AUTOINCREMENT,

    -- Domain identity (kind tag, name, version)
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    version INTEGER NOT NULL,

    -- JSON object
    properties TEXT
)
"#;

/// SQL to create the edges table
///
/// An edge row means "to_node depends on from_node". Deleting a node row
/// deletes every edge row touching it.
pub const SCHEMA_CREATE_EDGES: &str = r#"
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,

    -- Upstream and downstream node ids
    from_node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    to_node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,

    -- Edges have set semantics
    UNIQUE(from_node_id, to_node_id)
)
"#;

/// SQL to create indexes for lookups by name and by endpoint
pub const SCHEMA_CREATE_INDEXES: &str = r#"
-- Index on name for version queries
CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name);

-- Indexes on endpoints for cascade and adjacency queries
CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_node_id);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_node_id);
"#;

/// SQL to make the store authoritative for node identity
pub const SCHEMA_CREATE_IDENTITY_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_identity ON nodes(kind, name, version)";

/// SQL to create the metadata table
pub const SCHEMA_CREATE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS graph_metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// Column names for node queries (in order for row mapping)
pub const NODE_COLUMNS: &str = "id, kind, name, version, properties";

/// Column names for edge queries (in order for row mapping)
pub const EDGE_COLUMNS: &str = "id, from_node_id, to_node_id";
