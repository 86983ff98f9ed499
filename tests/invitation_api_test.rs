//! Invitation HTTP API tests
//!
//! - Authentication is required
//! - Listing returns the caller's pending invitations
//! - Accept/decline map rejections to distinct status codes

use chrono::Duration;
use reqwest::{Client, StatusCode};

use onboarding_backend::models::invitation::InvitationStatus;

mod common;
use common::utils::{seed_invitation, spawn_app, test_user};

#[tokio::test]
async fn backend_health_is_public() {
    let test_app = spawn_app().await;
    let response = Client::new()
        .get(&format!("{}/backend_health", test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn invitations_require_a_bearer_token() {
    let test_app = spawn_app().await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/invitations", test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(&format!("{}/invitations", test_app.address))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_returns_only_the_callers_invitations() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let user = test_user("User@X.com");
    let mine = seed_invitation(&test_app.store, "user@x.com", Duration::hours(1)).await;
    seed_invitation(&test_app.store, "someone@else.com", Duration::hours(1)).await;

    let response = client
        .get(&format!("{}/invitations", test_app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .expect("Failed to list invitations");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total_count"], 1);
    let invitation = &body["data"]["invitations"][0];
    assert_eq!(invitation["id"], mine.id.to_string());
    assert_eq!(invitation["status"], "pending");
    assert_eq!(invitation["role"], "member");
    assert!(invitation["project_name"].is_string());
}

#[tokio::test]
async fn accept_returns_project_and_blocks_later_decline() {
    let test_app = spawn_app().await;
    let client = Client::new();
    let caller_a = test_user("User@X.com");
    let caller_b = test_user("user@x.com");
    let invitation = seed_invitation(&test_app.store, "user@x.com", Duration::hours(1)).await;

    let response = client
        .post(&format!("{}/invitations/{}/accept", test_app.address, invitation.token))
        .header("Authorization", format!("Bearer {}", caller_a.token))
        .send()
        .await
        .expect("Failed to accept invitation");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["project_id"], invitation.project_id.to_string());
    assert_eq!(
        test_app.store.status_of(&invitation.token).unwrap(),
        Some(InvitationStatus::Accepted)
    );

    let response = client
        .post(&format!("{}/invitations/{}/decline", test_app.address, invitation.token))
        .header("Authorization", format!("Bearer {}", caller_b.token))
        .send()
        .await
        .expect("Failed to decline invitation");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn expired_invitation_returns_gone() {
    let test_app = spawn_app().await;
    let user = test_user("user@x.com");
    let invitation = seed_invitation(&test_app.store, "user@x.com", -Duration::minutes(1)).await;

    let response = Client::new()
        .post(&format!("{}/invitations/{}/accept", test_app.address, invitation.token))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .expect("Failed to accept invitation");

    assert_eq!(response.status(), StatusCode::GONE);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "expired");
    assert_eq!(body["message"], "Invitation expired");
}

#[tokio::test]
async fn wrong_email_is_forbidden() {
    let test_app = spawn_app().await;
    let intruder = test_user("someone@else.com");
    let invitation = seed_invitation(&test_app.store, "user@x.com", Duration::hours(1)).await;

    let response = Client::new()
        .post(&format!("{}/invitations/{}/decline", test_app.address, invitation.token))
        .header("Authorization", format!("Bearer {}", intruder.token))
        .send()
        .await
        .expect("Failed to decline invitation");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "This invitation was sent to a different email address");
    assert_eq!(
        test_app.store.status_of(&invitation.token).unwrap(),
        Some(InvitationStatus::Pending)
    );
}

#[tokio::test]
async fn store_outage_returns_service_unavailable() {
    let test_app = spawn_app().await;
    let user = test_user("user@x.com");
    test_app.store.set_unavailable(true);

    let response = Client::new()
        .get(&format!("{}/invitations", test_app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .expect("Failed to list invitations");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
}
