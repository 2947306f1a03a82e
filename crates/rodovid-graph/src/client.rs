//! Neo4j connection management and shared graph client.

use neo4rs::{ConfigBuilder, Graph, Query, Row, Txn};
use rodovid_core::config::Neo4jSettings;
use rodovid_core::StoreError;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Inconsistent graph state: {0}")]
    Corrupt(String),
}

impl From<GraphError> for StoreError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Connection(msg) => StoreError::Unavailable(msg),
            GraphError::Query(e) => StoreError::Query(e.to_string()),
            GraphError::Serialization(msg) => StoreError::Serialization(msg),
            GraphError::Corrupt(msg) => StoreError::Corrupt(msg),
        }
    }
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::from(&Neo4jSettings::default())
    }
}

impl From<&Neo4jSettings> for GraphConfig {
    fn from(settings: &Neo4jSettings) -> Self {
        Self {
            uri: settings.uri.clone(),
            user: settings.user.clone(),
            password: settings.password.clone(),
            max_connections: settings.max_connections,
            fetch_size: settings.fetch_size,
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Get a reference to the underlying neo4rs Graph for direct operations.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<()> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<Row>> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<Row>> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Begin a transaction.
    pub async fn start_txn(&self) -> Result<Txn> {
        Ok(self.graph.start_txn().await?)
    }
}

/// Collect every row of a query run inside `txn`.
pub(crate) async fn txn_rows(txn: &mut Txn, query: Query) -> Result<Vec<Row>> {
    let mut stream = txn.execute(query).await?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await? {
        rows.push(row);
    }
    Ok(rows)
}

/// First row of a query run inside `txn`.
pub(crate) async fn txn_one(txn: &mut Txn, query: Query) -> Result<Option<Row>> {
    Ok(txn_rows(txn, query).await?.into_iter().next())
}

/// Read an integer count column, treating a missing row as zero.
pub(crate) fn count(row: Option<Row>, column: &str) -> i64 {
    row.and_then(|r| r.get::<i64>(column).ok()).unwrap_or(0)
}
