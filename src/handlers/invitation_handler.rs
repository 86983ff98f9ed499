use actix_web::{web, HttpResponse};

use crate::invitations::{InvitationError, InvitationLifecycle};
use crate::middleware::auth::Claims;
use crate::models::common::ApiResponse;
use crate::models::invitation::{
    AcceptOutcome, AcceptedInvitationResponse, DeclineOutcome, Rejection, Requester,
};

/// Get the caller's pending invitations
#[tracing::instrument(
    name = "Get pending invitations",
    skip(lifecycle, claims),
    fields(user_id = %claims.sub)
)]
pub async fn list_invitations(
    lifecycle: web::Data<InvitationLifecycle>,
    claims: web::ReqData<Claims>,
) -> HttpResponse {
    match lifecycle.list_pending_invitations(&claims.email).await {
        Ok(invitations) => HttpResponse::Ok().json(ApiResponse::success(
            "Invitations retrieved successfully",
            serde_json::json!({
                "invitations": invitations,
                "total_count": invitations.len()
            }),
        )),
        Err(e) => error_response(&e),
    }
}

/// Accept an invitation and join its project
#[tracing::instrument(
    name = "Accept invitation",
    skip(lifecycle, claims, token),
    fields(user_id = %claims.sub)
)]
pub async fn accept_invitation(
    lifecycle: web::Data<InvitationLifecycle>,
    claims: web::ReqData<Claims>,
    token: web::Path<String>,
) -> HttpResponse {
    let requester = match requester_from(&claims) {
        Ok(requester) => requester,
        Err(response) => return response,
    };

    match lifecycle.accept_invitation(&token, &requester).await {
        Ok(AcceptOutcome::Accepted { project_id }) => HttpResponse::Ok().json(ApiResponse::success(
            "Invitation accepted successfully",
            AcceptedInvitationResponse { project_id },
        )),
        Ok(AcceptOutcome::Rejected(rejection)) => rejection_response(rejection),
        Err(e) => error_response(&e),
    }
}

/// Decline an invitation
#[tracing::instrument(
    name = "Decline invitation",
    skip(lifecycle, claims, token),
    fields(user_id = %claims.sub)
)]
pub async fn decline_invitation(
    lifecycle: web::Data<InvitationLifecycle>,
    claims: web::ReqData<Claims>,
    token: web::Path<String>,
) -> HttpResponse {
    let requester = match requester_from(&claims) {
        Ok(requester) => requester,
        Err(response) => return response,
    };

    match lifecycle.decline_invitation(&token, &requester).await {
        Ok(DeclineOutcome::Declined) => HttpResponse::Ok().json(
            ApiResponse::<()>::success_message("Invitation declined successfully"),
        ),
        Ok(DeclineOutcome::Rejected(rejection)) => rejection_response(rejection),
        Err(e) => error_response(&e),
    }
}

fn requester_from(claims: &Claims) -> Result<Requester, HttpResponse> {
    claims
        .requester()
        .ok_or_else(|| HttpResponse::BadRequest().json(ApiResponse::<()>::error("Invalid user ID")))
}

fn rejection_response(rejection: Rejection) -> HttpResponse {
    let code = match rejection {
        Rejection::NotFound => "not_found",
        Rejection::Expired => "expired",
        Rejection::Unauthorized => "unauthorized",
    };
    let body = ApiResponse::<()>::error_with_code(rejection.to_string(), code);
    match rejection {
        Rejection::NotFound => HttpResponse::NotFound().json(body),
        Rejection::Expired => HttpResponse::Gone().json(body),
        Rejection::Unauthorized => HttpResponse::Forbidden().json(body),
    }
}

fn error_response(e: &InvitationError) -> HttpResponse {
    tracing::error!("Invitation operation failed: {}", e);
    let body = ApiResponse::<()>::error(e.user_message());
    match e {
        InvitationError::StoreUnavailable(_) => HttpResponse::ServiceUnavailable().json(body),
        InvitationError::Unknown(_) => HttpResponse::InternalServerError().json(body),
    }
}
