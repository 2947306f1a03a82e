//! rodovid-graph: graph backends for the Rodovid family store.
//!
//! [`GraphClient`] implements [`FamilyStore`](rodovid_core::FamilyStore)
//! over Neo4j and is the only component that issues Cypher. [`MemoryStore`]
//! implements the same contract in process for tests and offline use.

pub mod client;
pub mod encode;
pub mod memory;
pub mod mutations;
pub mod queries;
pub mod schema;
pub mod store;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use memory::MemoryStore;
