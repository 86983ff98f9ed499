#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Barrier;
use uuid::Uuid;

use onboarding_backend::invitations::{InvitationStore, StoreError};
use onboarding_backend::models::invitation::{Invitation, NewInvitation};

/// Holds every caller after its pending-token lookup until `callers` of them
/// have looked the token up, so all of them pass the read-side guards before
/// any conditional update runs.
pub struct LockstepStore {
    inner: Arc<dyn InvitationStore>,
    lookups: Barrier,
}

impl LockstepStore {
    pub fn new(inner: Arc<dyn InvitationStore>, callers: usize) -> Self {
        Self {
            inner,
            lookups: Barrier::new(callers),
        }
    }
}

#[async_trait]
impl InvitationStore for LockstepStore {
    async fn create_invitation(&self, params: NewInvitation) -> Result<Invitation, StoreError> {
        self.inner.create_invitation(params).await
    }

    async fn find_pending_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
        let found = self.inner.find_pending_by_token(token).await?;
        self.lookups.wait().await;
        Ok(found)
    }

    async fn accept_pending(
        &self,
        token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, StoreError> {
        self.inner.accept_pending(token, user_id, now).await
    }

    async fn decline_pending(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.inner.decline_pending(token, now).await
    }

    async fn list_pending_for_email(&self, email: &str) -> Result<Vec<Invitation>, StoreError> {
        self.inner.list_pending_for_email(email).await
    }

    async fn project_name(&self, project_id: Uuid) -> Result<Option<String>, StoreError> {
        self.inner.project_name(project_id).await
    }
}
