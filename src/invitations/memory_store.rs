use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::invitations::store::{InvitationStore, StoreError};
use crate::invitations::token::generate_invitation_token;
use crate::models::invitation::{
    normalize_email, Invitation, InvitationStatus, NewInvitation, ProjectRole,
};

#[derive(Default)]
struct State {
    invitations: HashMap<String, Invitation>,
    projects: HashMap<Uuid, String>,
    members: HashMap<(Uuid, Uuid), ProjectRole>,
}

/// In-process store. Every conditional update runs under one lock, which gives
/// the same exactly-once guarantee as the database's guarded UPDATE.
#[derive(Default)]
pub struct MemoryInvitationStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    project_lookup_fails: AtomicBool,
}

impl MemoryInvitationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_project(&self, name: impl Into<String>) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.lock()?.projects.insert(id, name.into());
        Ok(id)
    }

    /// Stored status, ignoring expiry. `None` for unknown tokens.
    pub fn status_of(&self, token: &str) -> Result<Option<InvitationStatus>, StoreError> {
        Ok(self.lock()?.invitations.get(token).map(|inv| inv.status))
    }

    pub fn member_role(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<ProjectRole>, StoreError> {
        Ok(self.lock()?.members.get(&(project_id, user_id)).copied())
    }

    /// Simulate losing the connection to the store.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_project_lookups(&self, fail: bool) {
        self.project_lookup_fails.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl InvitationStore for MemoryInvitationStore {
    async fn create_invitation(&self, params: NewInvitation) -> Result<Invitation, StoreError> {
        let token = params.token.unwrap_or_else(generate_invitation_token);
        let mut state = self.lock()?;
        if state.invitations.contains_key(&token) {
            return Err(StoreError::Conflict("invitation token already exists".to_string()));
        }

        let invitation = Invitation {
            id: Uuid::new_v4(),
            project_id: params.project_id,
            project_name: None,
            email: params.email,
            role: params.role,
            token: token.clone(),
            status: InvitationStatus::Pending,
            expires_at: params.expires_at,
            inviter_id: params.inviter_id,
            created_at: Utc::now(),
            responded_at: None,
        };
        state.invitations.insert(token, invitation.clone());
        Ok(invitation)
    }

    async fn find_pending_by_token(&self, token: &str) -> Result<Option<Invitation>, StoreError> {
        Ok(self
            .lock()?
            .invitations
            .get(token)
            .filter(|inv| inv.status == InvitationStatus::Pending)
            .cloned())
    }

    async fn accept_pending(
        &self,
        token: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, StoreError> {
        let mut state = self.lock()?;
        let Some(invitation) = state.invitations.get_mut(token) else {
            return Ok(None);
        };
        if invitation.status != InvitationStatus::Pending || invitation.is_expired_at(now) {
            return Ok(None);
        }

        invitation.status = InvitationStatus::Accepted;
        invitation.responded_at = Some(now);
        let (project_id, role) = (invitation.project_id, invitation.role);
        state.members.entry((project_id, user_id)).or_insert(role);
        Ok(Some(project_id))
    }

    async fn decline_pending(&self, token: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        match state.invitations.get_mut(token) {
            Some(invitation)
                if invitation.status == InvitationStatus::Pending && !invitation.is_expired_at(now) =>
            {
                invitation.status = InvitationStatus::Declined;
                invitation.responded_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_pending_for_email(&self, email: &str) -> Result<Vec<Invitation>, StoreError> {
        let wanted = normalize_email(email);
        let state = self.lock()?;
        let invitations = state
            .invitations
            .values()
            .filter(|inv| inv.status == InvitationStatus::Pending && normalize_email(&inv.email) == wanted)
            .cloned()
            .collect();
        Ok(invitations)
    }

    async fn project_name(&self, project_id: Uuid) -> Result<Option<String>, StoreError> {
        if self.project_lookup_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("project lookup failed".to_string()));
        }
        Ok(self.lock()?.projects.get(&project_id).cloned())
    }
}
