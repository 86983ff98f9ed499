use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::invitations as queries;
use crate::invitations::store::{InvitationStore, StoreError};
use crate::invitations::token::generate_invitation_token;
use crate::models::invitation::{Invitation, NewInvitation};

/// Postgres-backed store over the `project_invitations` table.
#[derive(Clone, Debug)]
pub struct PgInvitationStore {
    pool: PgPool,
}

impl PgInvitationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvitationStore for PgInvitationStore {
    async fn create_invitation(&self, params: NewInvitation) -> Result<Invitation, StoreError> {
        let token = params.token.clone().unwrap_or_else(generate_invitation_token);
        let invitation = queries::insert_invitation(&self.pool, &params, &token).await?;
        Ok(invitation)
    }

    async fn find_pending_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
        Ok(queries::fetch_pending_by_token(&self.pool, token).await?)
    }

    async fn accept_pending(
        &self,
        token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some((project_id, role)) = queries::mark_accepted(&mut *tx, token, now).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        // Status and membership commit together or not at all
        queries::insert_project_member(&mut *tx, project_id, user_id, role).await?;
        tx.commit().await?;

        Ok(Some(project_id))
    }

    async fn decline_pending(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(queries::mark_declined(&self.pool, token, now).await?)
    }

    async fn list_pending_for_email(&self, email: &str) -> Result<Vec<Invitation>, StoreError> {
        Ok(queries::fetch_pending_by_email(&self.pool, email).await?)
    }

    async fn project_name(&self, project_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(queries::fetch_project_name(&self.pool, project_id).await?)
    }
}
