use axum::{extract::State, Json};
use serde::Deserialize;

use crate::billing::plans::{SubscriptionPlan, PLANS};
use crate::billing::{self, CancelOutcome, SubscriptionOverview, UpgradeOutcome};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub plan_id: String,
}

/// GET /api/v1/subscriptions/plans
pub async fn handle_list_plans() -> Json<&'static [SubscriptionPlan]> {
    Json(PLANS)
}

/// GET /api/v1/subscriptions/status
pub async fn handle_subscription_status(
    State(state): State<AppState>,
) -> Result<Json<SubscriptionOverview>, AppError> {
    Ok(Json(
        billing::overview(&state.session, state.payments.as_ref()).await?,
    ))
}

/// POST /api/v1/subscriptions/upgrade
pub async fn handle_upgrade(
    State(state): State<AppState>,
    Json(request): Json<UpgradeRequest>,
) -> Result<Json<UpgradeOutcome>, AppError> {
    let outcome = billing::upgrade(
        &state.session,
        state.payments.as_ref(),
        state.notifier.as_ref(),
        &request.plan_id,
    )
    .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/subscriptions/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
) -> Result<Json<CancelOutcome>, AppError> {
    Ok(Json(
        billing::cancel(&state.session, state.payments.as_ref()).await?,
    ))
}
