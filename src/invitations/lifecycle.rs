use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::invitations::store::{InvitationStore, StoreError};
use crate::invitations::token::fingerprint;
use crate::models::invitation::{
    normalize_email, AcceptOutcome, DeclineOutcome, Invitation, Rejection, Requester,
};

/// Failures that are not business-rule rejections. Callers show a generic
/// retry message; the detail is for logs only.
#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("invitation store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("unexpected invitation failure: {0}")]
    Unknown(String),
}

impl InvitationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            InvitationError::StoreUnavailable(_) => {
                "Invitations are temporarily unavailable, please try again"
            }
            InvitationError::Unknown(_) => "Something went wrong, please try again",
        }
    }
}

impl From<StoreError> for InvitationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(detail) => InvitationError::StoreUnavailable(detail),
            other => InvitationError::Unknown(other.to_string()),
        }
    }
}

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

struct CachedListing {
    invitations: Vec<Invitation>,
    listed_seq: u64,
}

/// Accept/decline/list over an injected store, plus a per-email projection of
/// the last listing. The projection holds at most `cache_capacity` emails;
/// the least recently listed one is evicted first.
pub struct InvitationLifecycle {
    store: Arc<dyn InvitationStore>,
    cache: RwLock<HashMap<String, CachedListing>>,
    cache_capacity: usize,
    next_seq: AtomicU64,
}

impl InvitationLifecycle {
    pub fn new(store: Arc<dyn InvitationStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Pending invitations for `email`, with expiry applied to `status` and
    /// project names resolved best-effort. Ordering is unspecified.
    #[tracing::instrument(name = "List pending invitations", skip(self))]
    pub async fn list_pending_invitations(
        &self,
        email: &str,
    ) -> Result<Vec<Invitation>, InvitationError> {
        let now = Utc::now();
        let mut invitations = self.store.list_pending_for_email(email).await?;

        for invitation in invitations.iter_mut() {
            invitation.status = invitation.effective_status(now);
            invitation.project_name = match self.store.project_name(invitation.project_id).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(
                        "Failed to resolve project name for project {}: {}",
                        invitation.project_id,
                        e
                    );
                    None
                }
            };
        }

        tracing::debug!("Found {} pending invitations", invitations.len());
        self.remember(normalize_email(email), invitations.clone());
        Ok(invitations)
    }

    /// Last listing fetched for `email`; empty if never listed.
    pub fn cached_invitations(&self, email: &str) -> Vec<Invitation> {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&normalize_email(email))
            .map(|listing| listing.invitations.clone())
            .unwrap_or_default()
    }

    /// Number of emails with a cached listing.
    pub fn cached_emails(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    #[tracing::instrument(
        name = "Accept invitation",
        skip(self, token, requester),
        fields(token = %fingerprint(token), user_id = %requester.user_id)
    )]
    pub async fn accept_invitation(
        &self,
        token: &str,
        requester: &Requester,
    ) -> Result<AcceptOutcome, InvitationError> {
        let now = Utc::now();
        if let Err(rejection) = self.check_guards(token, requester, now).await? {
            return Ok(AcceptOutcome::Rejected(rejection));
        }

        match self.store.accept_pending(token, requester.user_id, now).await? {
            Some(project_id) => {
                tracing::info!("Invitation accepted, joined project {}", project_id);
                self.forget(&requester.email, token);
                Ok(AcceptOutcome::Accepted { project_id })
            }
            None => {
                tracing::info!("Invitation was resolved concurrently");
                self.forget(&requester.email, token);
                Ok(AcceptOutcome::Rejected(Rejection::NotFound))
            }
        }
    }

    #[tracing::instrument(
        name = "Decline invitation",
        skip(self, token, requester),
        fields(token = %fingerprint(token), user_id = %requester.user_id)
    )]
    pub async fn decline_invitation(
        &self,
        token: &str,
        requester: &Requester,
    ) -> Result<DeclineOutcome, InvitationError> {
        let now = Utc::now();
        if let Err(rejection) = self.check_guards(token, requester, now).await? {
            return Ok(DeclineOutcome::Rejected(rejection));
        }

        let changed = self.store.decline_pending(token, now).await?;
        self.forget(&requester.email, token);
        if changed {
            tracing::info!("Invitation declined");
            Ok(DeclineOutcome::Declined)
        } else {
            tracing::info!("Invitation was resolved concurrently");
            Ok(DeclineOutcome::Rejected(Rejection::NotFound))
        }
    }

    /// Read-side guards. The store re-checks status and expiry in the write.
    async fn check_guards(
        &self,
        token: &str,
        requester: &Requester,
        now: DateTime<Utc>,
    ) -> Result<Result<Invitation, Rejection>, InvitationError> {
        let Some(invitation) = self.store.find_pending_by_token(token).await? else {
            tracing::info!("No pending invitation for token");
            return Ok(Err(Rejection::NotFound));
        };

        if invitation.is_expired_at(now) {
            tracing::info!("Invitation expired at {}", invitation.expires_at);
            self.forget(&requester.email, token);
            return Ok(Err(Rejection::Expired));
        }

        if !invitation.is_addressed_to(&requester.email) {
            tracing::warn!("Invitation addressed to a different email");
            return Ok(Err(Rejection::Unauthorized));
        }

        Ok(Ok(invitation))
    }

    fn remember(&self, email: String, invitations: Vec<Invitation>) {
        if self.cache_capacity == 0 {
            return;
        }
        let mut cache = self.write_cache();
        while !cache.contains_key(&email) && cache.len() >= self.cache_capacity {
            let oldest = cache
                .iter()
                .min_by_key(|(_, listing)| listing.listed_seq)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => cache.remove(&key),
                None => break,
            };
        }
        cache.insert(
            email,
            CachedListing {
                invitations,
                listed_seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
    }

    fn forget(&self, email: &str, token: &str) {
        if let Some(listing) = self.write_cache().get_mut(&normalize_email(email)) {
            listing.invitations.retain(|inv| inv.token != token);
        }
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, CachedListing>> {
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
