//! Configuration management for Rodovid services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`RODOVID__` prefix, `__` separator)
//! 2. Config file (`rodovid.toml` by default)
//! 3. Defaults

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RodovidConfig {
    #[serde(default)]
    pub neo4j: Neo4jSettings,
    #[serde(default)]
    pub validation: ValidationPolicy,
    #[serde(default)]
    pub sharing: SharingPolicy,
    #[serde(default)]
    pub blobs: BlobPolicy,
    #[serde(default)]
    pub ghosts: GhostPolicy,
}

impl RodovidConfig {
    /// Load from `{file_prefix}.toml` (optional) and `RODOVID__*` variables.
    pub fn load(file_prefix: &str) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("RODOVID")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: RodovidConfig = cfg.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject thresholds that would make the validator self-contradictory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.validation;
        if v.marriage_hard_floor > v.min_marriage_age {
            return Err(ConfigError::Invalid(format!(
                "validation.marriage_hard_floor ({}) exceeds validation.min_marriage_age ({})",
                v.marriage_hard_floor, v.min_marriage_age
            )));
        }
        if v.max_lifespan <= 0 {
            return Err(ConfigError::Invalid("validation.max_lifespan must be positive".into()));
        }
        if self.sharing.invite_ttl_hours <= 0 {
            return Err(ConfigError::Invalid("sharing.invite_ttl_hours must be positive".into()));
        }
        Ok(())
    }
}

/// Neo4j connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Thresholds for the consistency validator. All values are in years.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ValidationPolicy {
    /// Marriages below this age are flagged.
    #[serde(default = "default_min_marriage_age")]
    pub min_marriage_age: i32,
    /// Marriages below this age are always an error.
    #[serde(default = "default_marriage_hard_floor")]
    pub marriage_hard_floor: i32,
    #[serde(default = "default_min_parent_age")]
    pub min_parent_age: i32,
    #[serde(default = "default_max_mother_age")]
    pub max_mother_age: i32,
    /// Years a child may be born after the father's death (gestation).
    #[serde(default = "default_father_posthumous_years")]
    pub father_posthumous_years: i32,
    #[serde(default = "default_max_lifespan")]
    pub max_lifespan: i32,
    #[serde(default)]
    pub allow_polygamy: bool,
    /// Pins "now" for age-if-alive checks. Defaults to the wall clock.
    #[serde(default)]
    pub current_year: Option<i32>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_marriage_age: default_min_marriage_age(),
            marriage_hard_floor: default_marriage_hard_floor(),
            min_parent_age: default_min_parent_age(),
            max_mother_age: default_max_mother_age(),
            father_posthumous_years: default_father_posthumous_years(),
            max_lifespan: default_max_lifespan(),
            allow_polygamy: false,
            current_year: None,
        }
    }
}

/// Sharing protocol settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SharingPolicy {
    #[serde(default = "default_invite_ttl_hours")]
    pub invite_ttl_hours: i64,
}

impl Default for SharingPolicy {
    fn default() -> Self {
        Self {
            invite_ttl_hours: default_invite_ttl_hours(),
        }
    }
}

/// Defensive checks on opaque payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobPolicy {
    /// Reject blob fields that do not carry the `ENC_` prefix.
    #[serde(default = "default_true")]
    pub enforce_encrypted_prefix: bool,
}

impl Default for BlobPolicy {
    fn default() -> Self {
        Self {
            enforce_encrypted_prefix: true,
        }
    }
}

/// Language of synthesized ghost labels.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GhostLocale {
    #[default]
    Uk,
    En,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GhostPolicy {
    #[serde(default)]
    pub locale: GhostLocale,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "rodovid-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_min_marriage_age() -> i32 {
    14
}

fn default_marriage_hard_floor() -> i32 {
    10
}

fn default_min_parent_age() -> i32 {
    10
}

fn default_max_mother_age() -> i32 {
    60
}

fn default_father_posthumous_years() -> i32 {
    1
}

fn default_max_lifespan() -> i32 {
    130
}

fn default_invite_ttl_hours() -> i64 {
    24
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RodovidConfig::default();
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.validation.min_marriage_age, 14);
        assert_eq!(config.validation.marriage_hard_floor, 10);
        assert_eq!(config.validation.min_parent_age, 10);
        assert_eq!(config.validation.max_mother_age, 60);
        assert_eq!(config.validation.father_posthumous_years, 1);
        assert_eq!(config.validation.max_lifespan, 130);
        assert!(!config.validation.allow_polygamy);
        assert_eq!(config.sharing.invite_ttl_hours, 24);
        assert!(config.blobs.enforce_encrypted_prefix);
        assert_eq!(config.ghosts.locale, GhostLocale::Uk);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let cfg = config::Config::builder()
            .set_override("validation.allow_polygamy", true)
            .unwrap()
            .set_override("ghosts.locale", "en")
            .unwrap()
            .build()
            .unwrap();
        let loaded: RodovidConfig = cfg.try_deserialize().unwrap();
        assert!(loaded.validation.allow_polygamy);
        assert_eq!(loaded.validation.max_lifespan, 130);
        assert_eq!(loaded.ghosts.locale, GhostLocale::En);
    }

    #[test]
    fn test_inverted_marriage_thresholds_rejected() {
        let mut config = RodovidConfig::default();
        config.validation.marriage_hard_floor = 16;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
