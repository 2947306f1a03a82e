//! rodovid-tree: the Rodovid family-tree service.
//!
//! [`FamilyTree`] gates every read and write by the caller's relationship
//! to a Person, runs the consistency validator before each structural
//! write, manages the ghost-node lifecycle and drives the three-step
//! zero-knowledge sharing handshake. It is generic over the
//! [`FamilyStore`] backend and holds no mutable state of its own.

pub mod error;
pub mod ghost;
pub mod identity;
pub mod relations;
pub mod sharing;
pub mod sources;
pub mod types;

pub use error::{Result, TreeError};
pub use types::{AcceptedInvite, Deletion, PendingInvite, TreeStats, Validated};

use rodovid_core::config::RodovidConfig;
use rodovid_core::{Access, Blob, BlobMap, FamilyStore, Person, PersonId, PersonView, UserId};
use rodovid_validate::{is_record_year, FamilyValidator, ValidationReport};
use tracing::warn;

/// The family-tree service.
pub struct FamilyTree<S> {
    store: S,
    validator: FamilyValidator,
    config: RodovidConfig,
}

impl<S: FamilyStore> FamilyTree<S> {
    /// Create a service with default configuration.
    pub fn new(store: S) -> Self {
        let config = RodovidConfig::default();
        Self {
            store,
            validator: FamilyValidator::new(config.validation.clone()),
            config,
        }
    }

    /// Replace the configuration; the validator is rebuilt from its policy.
    pub fn with_config(mut self, config: RodovidConfig) -> Self {
        self.validator = FamilyValidator::new(config.validation.clone());
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn validator(&self) -> &FamilyValidator {
        &self.validator
    }

    pub fn config(&self) -> &RodovidConfig {
        &self.config
    }

    // ── Shared guards ────────────────────────────────────────────

    fn check_blob(&self, field: &'static str, blob: &Blob) -> Result<()> {
        if self.config.blobs.enforce_encrypted_prefix && !blob.is_encrypted() {
            return Err(TreeError::PlaintextBlob(field));
        }
        Ok(())
    }

    fn check_blobs(&self, blobs: &BlobMap) -> Result<()> {
        for (field, blob) in blobs {
            self.check_blob(field.property(), blob)?;
        }
        Ok(())
    }

    fn check_years(&self, years: &[(&str, Option<i32>)]) -> Result<()> {
        for &(field, year) in years {
            if let Some(year) = year.filter(|y| !is_record_year(*y)) {
                return Err(TreeError::InvalidInput(format!("{field} {year} is out of range")));
            }
        }
        Ok(())
    }

    /// Turn a report with errors into a rejection.
    fn admit(&self, operation: &str, report: ValidationReport) -> Result<ValidationReport> {
        if report.is_admissible() {
            return Ok(report);
        }
        warn!(operation, rejected = %report, "Validation rejected write");
        Err(TreeError::Validation(report))
    }

    /// The Person if `caller` owns it, `NotFound` otherwise.
    async fn owned_person(&self, caller: &UserId, id: PersonId) -> Result<Person> {
        if !self.store.access(caller, id).await?.is_owner() {
            return Err(TreeError::NotFound);
        }
        self.store.get_person(id).await?.ok_or(TreeError::NotFound)
    }

    /// Project a Person for `caller`, or `None` if they cannot see it.
    async fn view_for(&self, caller: &UserId, person: Person) -> Result<Option<PersonView>> {
        if person.owner_id == *caller {
            return Ok(project(person, Access::Owner));
        }
        let access = self.store.access(caller, person.id).await?;
        Ok(project(person, access))
    }
}

/// Shape a Person for a caller with the given access. Viewers never see
/// the owner's private notes.
fn project(person: Person, access: Access) -> Option<PersonView> {
    match access {
        Access::Owner => Some(PersonView { person, is_owner: true, guest_note: None }),
        Access::Viewer { guest_note } => Some(PersonView {
            person: person.redacted_for_viewer(),
            is_owner: false,
            guest_note,
        }),
        Access::None => None,
    }
}
