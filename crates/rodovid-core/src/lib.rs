//! rodovid-core: Shared types, configuration, and the store boundary for Rodovid.
//!
//! This crate provides the foundational types used across all Rodovid components:
//! - Node types (User, Person, Source, Invite) for the family graph
//! - Family and sharing edge metadata
//! - The `FamilyStore` trait implemented by graph backends
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::RodovidConfig;
pub use error::{ConfigError, StoreError};
pub use store::{Access, FamilyStore, GhostContext, Retirement, StoreResult, VisibleGraph};
pub use types::*;
