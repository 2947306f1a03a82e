//! Zero-knowledge sharing: the invite → accept → finalize handshake,
//! revocation and the read-only projections over grants and invites.
//!
//! The service only ever sees public keys and tree keys wrapped for a
//! specific recipient. Finalization fans access out over the Persons the
//! invite's owner `OWNS`, so a viewer has nothing they could re-share.

use chrono::{Duration, Utc};
use tracing::{debug, info};

use rodovid_core::{FamilyStore, Invite, InviteId, InviteStatus, ShareGrant, UserId, WrappedKey};

use crate::error::{Result, TreeError};
use crate::types::{AcceptedInvite, PendingInvite};
use crate::FamilyTree;

impl<S: FamilyStore> FamilyTree<S> {
    /// Step 1: the owner opens an invite expiring after `ttl`, or after
    /// `sharing.invite_ttl_hours` when none is given.
    pub async fn create_invite(&self, owner: &UserId, ttl: Option<Duration>) -> Result<Invite> {
        let ttl = ttl.unwrap_or_else(|| Duration::hours(self.config.sharing.invite_ttl_hours));
        if ttl <= Duration::zero() {
            return Err(TreeError::InvalidInput("invite ttl must be positive".into()));
        }

        let now = Utc::now();
        let invite = Invite::new(owner.clone(), now, now + ttl);
        if !self.store.insert_invite(&invite).await? {
            return Err(TreeError::OwnerNotFound(owner.clone()));
        }
        info!(invite_id = %invite.id, owner = %owner, expires_at = %invite.expires_at, "Invite created");
        Ok(invite)
    }

    /// Step 2: a recipient claims a pending invite. Missing, expired,
    /// already-claimed and self-addressed invites all fail the same way.
    pub async fn accept_invite(&self, id: &InviteId, recipient: &UserId) -> Result<AcceptedInvite> {
        let invite = self
            .store
            .accept_invite(id, recipient, Utc::now())
            .await?
            .ok_or(TreeError::InviteUnavailable)?;

        let owner = self.store.get_user(&invite.owner_id).await?.ok_or(TreeError::InviteUnavailable)?;
        let recipient_user = self.store.get_user(recipient).await?.ok_or(TreeError::InviteUnavailable)?;
        info!(invite_id = %id, recipient = %recipient, "Invite accepted");

        Ok(AcceptedInvite {
            invite,
            owner_public_key: owner.public_key,
            recipient_public_key: recipient_user.public_key,
        })
    }

    /// Step 3: the owner attaches the tree key wrapped for the recorded
    /// recipient. Only the invite's owner can finalize it.
    pub async fn finalize_share(
        &self,
        id: &InviteId,
        owner: &UserId,
        wrapped_tree_key: WrappedKey,
    ) -> Result<ShareGrant> {
        if wrapped_tree_key.is_empty() {
            return Err(TreeError::InvalidInput("wrapped tree key must not be empty".into()));
        }
        let grant = self
            .store
            .finalize_invite(id, owner, &wrapped_tree_key, Utc::now())
            .await?
            .ok_or(TreeError::InviteUnavailable)?;
        info!(invite_id = %id, owner = %owner, recipient = %grant.recipient_id, "Share finalized");
        Ok(grant)
    }

    /// Drop the grant and every viewer edge it produced. Anything the
    /// recipient already decrypted stays with them; owners who need more
    /// must rotate the tree key client-side.
    pub async fn revoke_share(&self, owner: &UserId, recipient: &UserId) -> Result<()> {
        if !self.store.revoke_grant(owner, recipient).await? {
            return Err(TreeError::NotFound);
        }
        info!(owner = %owner, recipient = %recipient, "Share revoked");
        Ok(())
    }

    // ── Projections ──────────────────────────────────────────────

    pub async fn shared_with_me(&self, recipient: &UserId) -> Result<Vec<ShareGrant>> {
        let grants = self.store.grants_to(recipient).await?;
        debug!(recipient = %recipient, count = grants.len(), "Listed shares received");
        Ok(grants)
    }

    pub async fn my_shares(&self, owner: &UserId) -> Result<Vec<ShareGrant>> {
        let grants = self.store.grants_from(owner).await?;
        debug!(owner = %owner, count = grants.len(), "Listed shares given");
        Ok(grants)
    }

    /// Accepted, unexpired invites waiting for the owner to finalize, with
    /// the recipient public key needed to wrap the tree key.
    pub async fn pending_invites(&self, owner: &UserId) -> Result<Vec<PendingInvite>> {
        let now = Utc::now();
        let mut pending = Vec::new();
        for invite in self.store.invites_from(owner).await? {
            if invite.status != InviteStatus::Accepted || invite.is_expired(now) {
                continue;
            }
            let Some(recipient_id) = invite.recipient_id else {
                continue;
            };
            let Some(recipient) = self.store.get_user(&recipient_id).await? else {
                continue;
            };
            pending.push(PendingInvite {
                invite_id: invite.id,
                recipient_id,
                recipient_public_key: recipient.public_key,
                accepted_at: invite.accepted_at,
                expires_at: invite.expires_at,
            });
        }
        debug!(owner = %owner, count = pending.len(), "Listed pending invites");
        Ok(pending)
    }

    /// The tree key `owner` wrapped for `recipient`, if a grant exists.
    pub async fn shared_tree_key(&self, recipient: &UserId, owner: &UserId) -> Result<WrappedKey> {
        self.store
            .grants_to(recipient)
            .await?
            .into_iter()
            .find(|grant| grant.owner_id == *owner)
            .map(|grant| grant.wrapped_tree_key)
            .ok_or(TreeError::NotFound)
    }
}
