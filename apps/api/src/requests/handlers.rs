use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analytics::{self, AnalyticsEvent};
use crate::auth::identity::Identity;
use crate::errors::AppError;
use crate::notifications::NotificationRequest;
use crate::requests::{
    filter_requests, status_counts, CvRequest, NewCvRequest, RequestStatus, StatusCounts,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RequestListQuery {
    /// A status name, or `all`.
    pub status: Option<String>,
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct RequestListResponse {
    pub requests: Vec<CvRequest>,
    /// Counts over every request, not just the filtered ones.
    pub counts: StatusCounts,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: RequestStatus,
}

fn require_user(state: &AppState) -> Result<Identity, AppError> {
    state.session.identity().ok_or(AppError::Unauthorized)
}

fn require_admin(state: &AppState) -> Result<Identity, AppError> {
    let identity = require_user(state)?;
    if !identity.is_admin() {
        return Err(AppError::Forbidden("admin role required".to_string()));
    }
    Ok(identity)
}

/// POST /api/v1/cv-requests
pub async fn handle_submit_request(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CvRequest>), AppError> {
    let identity = require_user(&state)?;
    let new = NewCvRequest::from_session(&identity, &state.editor.snapshot());
    let request = state.requests.create(new).await?;
    info!("CV request {} submitted by {}", request.id, identity.uid);
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/v1/cv-requests/mine
pub async fn handle_my_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<CvRequest>>, AppError> {
    let identity = require_user(&state)?;
    Ok(Json(state.requests.list_for_user(&identity.uid).await?))
}

/// GET /api/v1/admin/cv-requests
pub async fn handle_list_requests(
    State(state): State<AppState>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<RequestListResponse>, AppError> {
    require_admin(&state)?;
    let status = match query.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<RequestStatus>().map_err(AppError::Validation)?),
    };

    let all = state.requests.list().await?;
    let counts = status_counts(&all);
    let requests = filter_requests(&all, status, query.q.as_deref().unwrap_or_default());
    Ok(Json(RequestListResponse { requests, counts }))
}

/// PATCH /api/v1/admin/cv-requests/:id/status
pub async fn handle_update_request_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<CvRequest>, AppError> {
    let admin = require_admin(&state)?;
    let request = state
        .requests
        .update_status(id, update.status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("CV request {id} not found")))?;

    let target = id.to_string();
    analytics::track(AnalyticsEvent::AdminAction {
        action: "status_update",
        admin_email: &admin.email,
        target: &target,
    });

    if request.status == RequestStatus::Completed {
        let outcome = state
            .notifier
            .send(NotificationRequest::AdminNotification {
                request_id: target,
                user_email: request.user_email.clone(),
                status: request.status.as_str().to_string(),
            })
            .await;
        if !outcome.success {
            warn!("Completion notice for request {id} failed: {}", outcome.message);
        }
    }

    Ok(Json(request))
}
