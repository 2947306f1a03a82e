//! Uniqueness constraints for the family graph.
//!
//! Applied once at startup by [`GraphClient::ensure_schema`]; each statement
//! is idempotent thanks to `IF NOT EXISTS`.

use neo4rs::query;

use crate::client::{GraphClient, Result};

pub const CONSTRAINTS: [&str; 4] = [
    "CREATE CONSTRAINT user_id IF NOT EXISTS FOR (u:User) REQUIRE u.id IS UNIQUE",
    "CREATE CONSTRAINT person_id IF NOT EXISTS FOR (p:Person) REQUIRE p.id IS UNIQUE",
    "CREATE CONSTRAINT source_id IF NOT EXISTS FOR (s:Source) REQUIRE s.id IS UNIQUE",
    "CREATE CONSTRAINT invite_id IF NOT EXISTS FOR (i:Invite) REQUIRE i.id IS UNIQUE",
];

impl GraphClient {
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in CONSTRAINTS {
            self.run(query(statement)).await?;
        }
        tracing::debug!(constraints = CONSTRAINTS.len(), "Graph schema ensured");
        Ok(())
    }
}
