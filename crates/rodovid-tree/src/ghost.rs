//! Ghost-node lifecycle: deciding between tombstoning, hard deletion and
//! unsharing, and synthesizing placeholder labels.

use chrono::Utc;
use tracing::info;

use rodovid_core::config::GhostLocale;
use rodovid_core::{Access, FamilyStore, Gender, GhostContext, PersonId, Retirement, UserId};

use crate::error::{Result, TreeError};
use crate::types::Deletion;
use crate::FamilyTree;

impl<S: FamilyStore> FamilyTree<S> {
    /// Delete a Person from the caller's point of view.
    ///
    /// - Owner, Person has children: tombstone it with a generated label.
    /// - Owner, no children: remove the node and every edge touching it.
    /// - Viewer: remove only the caller's own share.
    /// - Anyone else: `NotFound`.
    pub async fn delete_person(&self, caller: &UserId, id: PersonId) -> Result<Deletion> {
        match self.store.access(caller, id).await? {
            Access::Owner => self.retire(caller, id).await,
            Access::Viewer { .. } => {
                if !self.store.remove_person_share(caller, id).await? {
                    return Err(TreeError::NotFound);
                }
                info!(person_id = %id, viewer = %caller, "Person unshared");
                Ok(Deletion::Unshared)
            }
            Access::None => Err(TreeError::NotFound),
        }
    }

    async fn retire(&self, owner: &UserId, id: PersonId) -> Result<Deletion> {
        // Ghosting is one-way; a ghost that still anchors descendants keeps its label.
        if let Some(person) = self.store.get_person(id).await? {
            if let Some(tombstone) = person.tombstone {
                if self.store.descendant_count(id).await? > 0 {
                    return Ok(Deletion::Ghosted { ghost_name: tombstone.ghost_name });
                }
            }
        }

        let locale = self.config.ghosts.locale;
        let outcome = self
            .store
            .retire_person(owner, id, Utc::now(), move |ctx| ghost_label(locale, ctx))
            .await?;

        match outcome {
            Retirement::Ghosted(tombstone) => {
                info!(person_id = %id, ghost_name = %tombstone.ghost_name, "Person ghosted");
                Ok(Deletion::Ghosted { ghost_name: tombstone.ghost_name })
            }
            Retirement::Deleted => {
                info!(person_id = %id, "Person deleted");
                Ok(Deletion::Deleted)
            }
            Retirement::NotOwned => Err(TreeError::NotFound),
        }
    }
}

/// Generational placeholder for a ghost, from its gender and its distance
/// to the nearest Person without descendants. Unknown gender uses the
/// masculine form.
pub fn ghost_label(locale: GhostLocale, ctx: GhostContext) -> String {
    let female = ctx.gender == Some(Gender::Female);
    let distance = ctx.leaf_distance.filter(|d| *d > 0);
    match locale {
        GhostLocale::Uk => match distance {
            Some(1) => pick(female, "баба", "дід").into(),
            Some(2) => pick(female, "прабаба", "прадід").into(),
            Some(3) => pick(female, "двоюрідна баба", "двоюрідний дід").into(),
            Some(d) => format!("{} {} коліна", pick(female, "родичка", "родич"), d - 1),
            None => pick(female, "родичка", "родич").into(),
        },
        GhostLocale::En => match distance {
            Some(1) => pick(female, "grandmother", "grandfather").into(),
            Some(2) => pick(female, "great-grandmother", "great-grandfather").into(),
            Some(3) => pick(female, "great-great-grandmother", "great-great-grandfather").into(),
            Some(d) => format!("{} of generation {}", english_relative(ctx.gender), d - 1),
            None => english_relative(ctx.gender).into(),
        },
    }
}

/// English has no common-gender form of "kinsman", so unknown stays neutral.
fn english_relative(gender: Option<Gender>) -> &'static str {
    match gender {
        Some(Gender::Female) => "kinswoman",
        Some(Gender::Male) => "kinsman",
        None => "relative",
    }
}

fn pick(female: bool, feminine: &'static str, masculine: &'static str) -> &'static str {
    if female {
        feminine
    } else {
        masculine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(gender: Option<Gender>, leaf_distance: Option<u32>) -> GhostContext {
        GhostContext { gender, leaf_distance }
    }

    #[test]
    fn test_ukrainian_labels_by_distance() {
        let male = Some(Gender::Male);
        assert_eq!(ghost_label(GhostLocale::Uk, ctx(male, Some(1))), "дід");
        assert_eq!(ghost_label(GhostLocale::Uk, ctx(male, Some(2))), "прадід");
        assert_eq!(ghost_label(GhostLocale::Uk, ctx(male, Some(3))), "двоюрідний дід");
        assert_eq!(ghost_label(GhostLocale::Uk, ctx(male, Some(5))), "родич 4 коліна");
        assert_eq!(ghost_label(GhostLocale::Uk, ctx(male, None)), "родич");
    }

    #[test]
    fn test_feminine_forms() {
        let female = Some(Gender::Female);
        assert_eq!(ghost_label(GhostLocale::Uk, ctx(female, Some(1))), "баба");
        assert_eq!(ghost_label(GhostLocale::Uk, ctx(female, Some(4))), "родичка 3 коліна");
        assert_eq!(ghost_label(GhostLocale::En, ctx(female, Some(2))), "great-grandmother");
    }

    #[test]
    fn test_unknown_gender_is_masculine() {
        assert_eq!(ghost_label(GhostLocale::Uk, ctx(None, Some(1))), "дід");
    }

    #[test]
    fn test_english_fallbacks() {
        assert_eq!(ghost_label(GhostLocale::En, ctx(None, None)), "relative");
        assert_eq!(ghost_label(GhostLocale::En, ctx(None, Some(0))), "relative");
        assert_eq!(ghost_label(GhostLocale::En, ctx(None, Some(6))), "relative of generation 5");
    }

    #[test]
    fn test_english_distant_labels_follow_gender() {
        let female = Some(Gender::Female);
        let male = Some(Gender::Male);
        assert_eq!(ghost_label(GhostLocale::En, ctx(female, Some(4))), "kinswoman of generation 3");
        assert_eq!(ghost_label(GhostLocale::En, ctx(male, Some(6))), "kinsman of generation 5");
        assert_eq!(ghost_label(GhostLocale::En, ctx(female, None)), "kinswoman");
        assert_eq!(ghost_label(GhostLocale::En, ctx(male, Some(0))), "kinsman");
    }
}
