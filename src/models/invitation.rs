use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[sqlx(rename = "pending")]
    Pending,
    #[sqlx(rename = "accepted")]
    Accepted,
    #[sqlx(rename = "declined")]
    Declined,
    #[sqlx(rename = "expired")]
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
        }
    }

    /// Only `Pending` can still move.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    #[sqlx(rename = "owner")]
    Owner,
    #[sqlx(rename = "admin")]
    Admin,
    #[sqlx(rename = "member")]
    Member,
}

/// A project invitation as stored, plus the project name resolved at read time.
#[derive(Clone, Serialize, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub project_id: Uuid,
    #[sqlx(default)]
    pub project_name: Option<String>,
    pub email: String,
    pub role: ProjectRole,
    pub token: String,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub inviter_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Stored status with expiry applied on top. Expiry is never written back.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        match self.status {
            InvitationStatus::Pending if self.is_expired_at(now) => InvitationStatus::Expired,
            status => status,
        }
    }

    pub fn is_addressed_to(&self, email: &str) -> bool {
        normalize_email(&self.email) == normalize_email(email)
    }
}

// Tokens are bearer credentials and stay out of debug output.
impl std::fmt::Debug for Invitation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invitation")
            .field("id", &self.id)
            .field("project_id", &self.project_id)
            .field("project_name", &self.project_name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("token", &"[redacted]")
            .field("status", &self.status)
            .field("expires_at", &self.expires_at)
            .field("inviter_id", &self.inviter_id)
            .field("created_at", &self.created_at)
            .field("responded_at", &self.responded_at)
            .finish()
    }
}

/// Parameters for issuing an invitation. A token is generated when none is given.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub project_id: Uuid,
    pub email: String,
    pub role: ProjectRole,
    pub expires_at: DateTime<Utc>,
    pub inviter_id: Option<Uuid>,
    pub token: Option<String>,
}

/// The authenticated user acting on an invitation.
#[derive(Debug, Clone)]
pub struct Requester {
    pub user_id: Uuid,
    pub email: String,
}

impl Requester {
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}

/// Expected business-rule failures of accept/decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Never existed, or already accepted/declined.
    #[error("Invitation not found")]
    NotFound,
    #[error("Invitation expired")]
    Expired,
    #[error("This invitation was sent to a different email address")]
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    Accepted { project_id: Uuid },
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclineOutcome {
    Declined,
    Rejected(Rejection),
}

#[derive(Debug, Serialize)]
pub struct AcceptedInvitationResponse {
    pub project_id: Uuid,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
