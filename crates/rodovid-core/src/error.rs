use thiserror::Error;

/// Infrastructure failure reported by a [`FamilyStore`](crate::store::FamilyStore).
///
/// Never used for authorization or validation outcomes; those are expressed
/// through the store's return values.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store query failed: {0}")]
    Query(String),

    #[error("Store serialization error: {0}")]
    Serialization(String),

    #[error("Store returned inconsistent state: {0}")]
    Corrupt(String),
}

/// Failure while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
