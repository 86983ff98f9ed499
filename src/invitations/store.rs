use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::invitation::{Invitation, NewInvitation};

/// Uniform error type for all invitation store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (network, pool exhaustion, shutdown).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed store response: {0}")]
    Malformed(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => StoreError::Malformed(e.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

/// The authoritative invitation collaborator.
///
/// Mutating calls are conditional on the row still being pending and unexpired;
/// implementations must apply that guard in the same atomic step as the write.
#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Issue a new pending invitation. Fails with `Conflict` on a duplicate token.
    async fn create_invitation(&self, params: NewInvitation) -> Result<Invitation, StoreError>;

    /// Look up an invitation by token, only if it is still pending.
    async fn find_pending_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError>;

    /// Move `pending -> accepted` and grant the invited role to `user_id`.
    /// Returns the project id, or `None` when no pending unexpired row matched.
    async fn accept_pending(
        &self,
        token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, StoreError>;

    /// Move `pending -> declined`. Returns whether a row changed.
    async fn decline_pending(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// All pending invitations addressed to `email`, compared case-insensitively.
    async fn list_pending_for_email(&self, email: &str) -> Result<Vec<Invitation>, StoreError>;

    async fn project_name(&self, project_id: Uuid) -> Result<Option<String>, StoreError>;
}
