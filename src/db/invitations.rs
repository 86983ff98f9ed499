use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::invitation::{Invitation, NewInvitation, ProjectRole};

pub async fn insert_invitation(
    pool: &PgPool,
    params: &NewInvitation,
    token: &str,
) -> Result<Invitation, sqlx::Error> {
    let invitation = sqlx::query_as::<_, Invitation>(
        r#"
        INSERT INTO project_invitations (project_id, email, role, token, status, expires_at, inviter_id)
        VALUES ($1, $2, $3, $4, 'pending', $5, $6)
        RETURNING id, project_id, email, role, token, status, expires_at, inviter_id, created_at, responded_at
        "#,
    )
    .bind(params.project_id)
    .bind(&params.email)
    .bind(params.role)
    .bind(token)
    .bind(params.expires_at)
    .bind(params.inviter_id)
    .fetch_one(pool)
    .await?;

    Ok(invitation)
}

pub async fn fetch_pending_by_token(
    pool: &PgPool,
    token: &str,
) -> Result<Option<Invitation>, sqlx::Error> {
    sqlx::query_as::<_, Invitation>(
        r#"
        SELECT id, project_id, email, role, token, status, expires_at, inviter_id, created_at, responded_at
        FROM project_invitations
        WHERE token = $1 AND status = 'pending'
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

/// Conditional `pending -> accepted`. The status and expiry guard live in the
/// UPDATE itself so two concurrent accepts cannot both match.
pub async fn mark_accepted(
    conn: &mut PgConnection,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<(Uuid, ProjectRole)>, sqlx::Error> {
    let row = sqlx::query_as::<_, (Uuid, ProjectRole)>(
        r#"
        UPDATE project_invitations
        SET status = 'accepted', responded_at = $2
        WHERE token = $1 AND status = 'pending' AND expires_at > $2
        RETURNING project_id, role
        "#,
    )
    .bind(token)
    .bind(now)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

pub async fn mark_declined(
    pool: &PgPool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE project_invitations
        SET status = 'declined', responded_at = $2
        WHERE token = $1 AND status = 'pending' AND expires_at > $2
        "#,
    )
    .bind(token)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_project_member(
    conn: &mut PgConnection,
    project_id: Uuid,
    user_id: Uuid,
    role: ProjectRole,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (project_id, user_id) DO NOTHING
        "#,
    )
    .bind(project_id)
    .bind(user_id)
    .bind(role)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn fetch_pending_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Vec<Invitation>, sqlx::Error> {
    sqlx::query_as::<_, Invitation>(
        r#"
        SELECT id, project_id, email, role, token, status, expires_at, inviter_id, created_at, responded_at
        FROM project_invitations
        WHERE LOWER(email) = LOWER($1) AND status = 'pending'
        "#,
    )
    .bind(email.trim())
    .fetch_all(pool)
    .await
}

pub async fn fetch_project_name(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    let name = sqlx::query_scalar::<_, String>(
        r#"
        SELECT name FROM projects WHERE id = $1
        "#,
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    Ok(name)
}
