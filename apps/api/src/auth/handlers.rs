use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::auth::accounts::{
    self, CompleteRedirectRequest, ResetPasswordRequest, SignInRequest, SignUpRequest,
};
use crate::auth::identity::{Identity, ProfilePatch};
use crate::auth::provider::{FederatedOutcome, FederatedSignIn, UserHandle};
use crate::auth::session::SessionState;
use crate::errors::AppError;
use crate::notifications::{NotificationOutcome, NotificationRequest};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SignedInResponse {
    pub user: UserHandle,
}

/// POST /api/v1/auth/sign-up
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SignedInResponse>), AppError> {
    req.validate().map_err(AppError::Validation)?;
    let user = accounts::register(state.auth.as_ref(), state.profiles.as_ref(), &req).await?;
    Ok((StatusCode::CREATED, Json(SignedInResponse { user })))
}

/// POST /api/v1/auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SignedInResponse>, AppError> {
    req.validate().map_err(AppError::Validation)?;
    let user = accounts::login(state.auth.as_ref(), state.profiles.as_ref(), &req).await?;
    Ok(Json(SignedInResponse { user }))
}

/// POST /api/v1/auth/sign-out
pub async fn handle_sign_out(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    accounts::logout(state.auth.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/reset-password
pub async fn handle_reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<NotificationOutcome>, AppError> {
    accounts::validate_email(&req.email).map_err(AppError::Validation)?;
    accounts::reset_password(state.auth.as_ref(), &req.email).await?;
    let outcome = state
        .notifier
        .send(NotificationRequest::PasswordReset {
            to: req.email.trim().to_string(),
        })
        .await;
    Ok(Json(outcome))
}

/// POST /api/v1/auth/federated
pub async fn handle_federated(
    State(state): State<AppState>,
    Json(req): Json<FederatedSignIn>,
) -> Result<Json<FederatedOutcome>, AppError> {
    let outcome = accounts::federated(state.auth.as_ref(), state.profiles.as_ref(), req).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/auth/federated/complete
pub async fn handle_complete_redirect(
    State(state): State<AppState>,
    Json(req): Json<CompleteRedirectRequest>,
) -> Result<Json<SignedInResponse>, AppError> {
    let user =
        accounts::complete_redirect(state.auth.as_ref(), state.profiles.as_ref(), &req).await?;
    Ok(Json(SignedInResponse { user }))
}

/// GET /api/v1/auth/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionState> {
    Json(state.session.current())
}

/// PATCH /api/v1/auth/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Identity>, AppError> {
    if patch.is_empty() {
        return Err(AppError::Validation("nothing to update".to_string()));
    }
    let identity = state.session.update_profile(patch).await?;
    Ok(Json(identity))
}
