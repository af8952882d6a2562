use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analytics::{self, AnalyticsEvent};
use crate::auth::identity::SubscriptionTier;
use crate::cv::completeness::{compute_completeness_report, CompletenessReport};
use crate::cv::document::{CvDocument, PersonalInfo, PersonalInfoPatch, Section};
use crate::cv::templates::{filter_templates, find_template, TemplateDescriptor, TemplateFilter};
use crate::errors::AppError;
use crate::notifications::{NotificationOutcome, NotificationRequest};
use crate::persistence::status::SaveStatus;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvView {
    pub cv_data: CvDocument,
    pub selected_template: Option<String>,
    pub owner: Option<String>,
    pub status: SaveStatus,
}

impl CvView {
    fn current(state: &AppState) -> Self {
        let snapshot = state.editor.snapshot();
        Self {
            cv_data: snapshot.document,
            selected_template: snapshot.selected_template,
            owner: state.editor.owner(),
            status: state.editor.status(),
        }
    }
}

#[derive(Serialize)]
pub struct CreatedEntry {
    pub id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectTemplateRequest {
    pub template_id: String,
}

#[derive(Deserialize)]
pub struct TemplateQuery {
    #[serde(default)]
    pub filter: TemplateFilter,
}

#[derive(Serialize)]
pub struct TemplateListing {
    #[serde(flatten)]
    pub template: &'static TemplateDescriptor,
    pub locked: bool,
}

fn current_tier(state: &AppState) -> SubscriptionTier {
    state
        .session
        .identity()
        .map(|identity| identity.subscription)
        .unwrap_or_default()
}

/// GET /api/v1/cv
pub async fn handle_get_cv(State(state): State<AppState>) -> Json<CvView> {
    Json(CvView::current(&state))
}

/// PATCH /api/v1/cv/personal-info
pub async fn handle_update_personal_info(
    State(state): State<AppState>,
    Json(patch): Json<PersonalInfoPatch>,
) -> Json<PersonalInfo> {
    Json(state.editor.update_personal_info(patch))
}

/// POST /api/v1/cv/sections/:section
pub async fn handle_add_entry(
    State(state): State<AppState>,
    Path(section): Path<Section>,
    Json(fields): Json<Value>,
) -> Result<(StatusCode, Json<CreatedEntry>), AppError> {
    let id = state.editor.add_entry(section, fields)?;
    Ok((StatusCode::CREATED, Json(CreatedEntry { id })))
}

/// PATCH /api/v1/cv/sections/:section/:id
pub async fn handle_update_entry(
    State(state): State<AppState>,
    Path((section, id)): Path<(Section, String)>,
    Json(patch): Json<Value>,
) -> Result<StatusCode, AppError> {
    state.editor.update_entry(section, &id, patch)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/cv/sections/:section/:id
pub async fn handle_remove_entry(
    State(state): State<AppState>,
    Path((section, id)): Path<(Section, String)>,
) -> Result<StatusCode, AppError> {
    state.editor.remove_entry(section, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/cv/template
pub async fn handle_select_template(
    State(state): State<AppState>,
    Json(req): Json<SelectTemplateRequest>,
) -> Result<Json<&'static TemplateDescriptor>, AppError> {
    let tier = current_tier(&state);
    let template = state.editor.select_template(&req.template_id, tier)?;
    let identity = state.session.identity();
    analytics::track(AnalyticsEvent::TemplateSelected {
        template_id: template.id,
        email: identity.as_ref().map(|i| i.email.as_str()),
        subscription: tier.as_str(),
    });
    Ok(Json(template))
}

/// POST /api/v1/cv/save
pub async fn handle_save(State(state): State<AppState>) -> Json<SaveStatus> {
    Json(state.editor.save_now().await)
}

/// POST /api/v1/cv/reset
pub async fn handle_reset(State(state): State<AppState>) -> StatusCode {
    state.editor.reset();
    StatusCode::NO_CONTENT
}

/// GET /api/v1/cv/status
pub async fn handle_status(State(state): State<AppState>) -> Json<SaveStatus> {
    Json(state.editor.status())
}

/// GET /api/v1/cv/validation
pub async fn handle_validation(State(state): State<AppState>) -> Json<CompletenessReport> {
    let snapshot = state.editor.snapshot();
    Json(compute_completeness_report(
        &snapshot.document,
        snapshot.selected_template.as_deref(),
    ))
}

/// GET /api/v1/cv/export
pub async fn handle_export(State(state): State<AppState>) -> impl IntoResponse {
    let export = state.editor.export();
    let identity = state.session.identity();
    analytics::track(AnalyticsEvent::CvExported {
        template_id: export.selected_template.as_deref(),
        email: identity.as_ref().map(|i| i.email.as_str()),
    });
    let disposition = format!("attachment; filename=\"{}\"", export.file_name());
    ([(header::CONTENT_DISPOSITION, disposition)], Json(export))
}

/// POST /api/v1/cv/import
pub async fn handle_import(
    State(state): State<AppState>,
    Json(raw): Json<Value>,
) -> Result<Json<CvView>, AppError> {
    state.editor.import(raw, current_tier(&state))?;
    Ok(Json(CvView::current(&state)))
}

/// POST /api/v1/cv/email
pub async fn handle_email_cv(
    State(state): State<AppState>,
) -> Result<Json<NotificationOutcome>, AppError> {
    let identity = state.session.identity().ok_or(AppError::Unauthorized)?;
    let snapshot = state.editor.snapshot();
    let template_name = snapshot
        .selected_template
        .as_deref()
        .and_then(find_template)
        .map(|t| t.name.to_string());
    let sections_completed = Section::ALL
        .iter()
        .filter(|s| snapshot.document.entry_count(**s) > 0)
        .count();

    let outcome = state
        .notifier
        .send(NotificationRequest::CvEmail {
            to: identity.email.clone(),
            user_name: identity.name.clone(),
            cv_data: snapshot.document,
            template_name,
        })
        .await;
    if outcome.success {
        analytics::track(AnalyticsEvent::CvEmailed {
            template_id: snapshot.selected_template.as_deref(),
            email: &identity.email,
            sections_completed,
        });
    }
    Ok(Json(outcome))
}

/// GET /api/v1/templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Json<Vec<TemplateListing>> {
    let tier = current_tier(&state);
    let listings = filter_templates(query.filter)
        .into_iter()
        .map(|template| TemplateListing {
            template,
            locked: template.is_locked_for(tier),
        })
        .collect();
    Json(listings)
}
