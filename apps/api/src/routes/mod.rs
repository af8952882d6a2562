pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::billing::handlers as billing;
use crate::cv::handlers as cv;
use crate::requests::handlers as requests;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth & session
        .route("/api/v1/auth/sign-up", post(auth::handle_sign_up))
        .route("/api/v1/auth/sign-in", post(auth::handle_sign_in))
        .route("/api/v1/auth/sign-out", post(auth::handle_sign_out))
        .route(
            "/api/v1/auth/reset-password",
            post(auth::handle_reset_password),
        )
        .route("/api/v1/auth/federated", post(auth::handle_federated))
        .route(
            "/api/v1/auth/federated/complete",
            post(auth::handle_complete_redirect),
        )
        .route("/api/v1/auth/session", get(auth::handle_get_session))
        .route("/api/v1/auth/profile", patch(auth::handle_update_profile))
        // CV editor
        .route("/api/v1/cv", get(cv::handle_get_cv))
        .route(
            "/api/v1/cv/personal-info",
            patch(cv::handle_update_personal_info),
        )
        .route("/api/v1/cv/sections/:section", post(cv::handle_add_entry))
        .route(
            "/api/v1/cv/sections/:section/:id",
            patch(cv::handle_update_entry).delete(cv::handle_remove_entry),
        )
        .route("/api/v1/cv/template", put(cv::handle_select_template))
        .route("/api/v1/cv/save", post(cv::handle_save))
        .route("/api/v1/cv/reset", post(cv::handle_reset))
        .route("/api/v1/cv/status", get(cv::handle_status))
        .route("/api/v1/cv/validation", get(cv::handle_validation))
        .route("/api/v1/cv/export", get(cv::handle_export))
        .route("/api/v1/cv/import", post(cv::handle_import))
        .route("/api/v1/cv/email", post(cv::handle_email_cv))
        .route("/api/v1/templates", get(cv::handle_list_templates))
        // CV requests
        .route(
            "/api/v1/cv-requests",
            post(requests::handle_submit_request),
        )
        .route("/api/v1/cv-requests/mine", get(requests::handle_my_requests))
        .route(
            "/api/v1/admin/cv-requests",
            get(requests::handle_list_requests),
        )
        .route(
            "/api/v1/admin/cv-requests/:id/status",
            patch(requests::handle_update_request_status),
        )
        // Subscriptions
        .route("/api/v1/subscriptions/plans", get(billing::handle_list_plans))
        .route(
            "/api/v1/subscriptions/status",
            get(billing::handle_subscription_status),
        )
        .route(
            "/api/v1/subscriptions/upgrade",
            post(billing::handle_upgrade),
        )
        .route("/api/v1/subscriptions/cancel", post(billing::handle_cancel))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::{Role, UserProfile};
    use crate::requests::store::RequestStore;
    use crate::testing::{handle, TestApp};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(
        app: &TestApp,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = build_router(app.state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn profile(uid: &str, role: Role) -> UserProfile {
        let mut profile = UserProfile::initial(&handle(uid), Some("Jane Doe"));
        profile.role = role;
        profile
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_edit_entry_lifecycle() {
        let app = TestApp::new();
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/cv/sections/experience",
            Some(json!({"company": "Acme", "position": "Engineer"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/cv/sections/experience/{id}");
        let (status, _) = call(&app, "PATCH", &uri, Some(json!({"position": "Lead"}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, cv) = call(&app, "GET", "/api/v1/cv", None).await;
        assert_eq!(cv["cvData"]["experience"][0]["position"], "Lead");

        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_premium_template_is_locked_for_free_tier() {
        let app = TestApp::new();
        let (status, body) = call(
            &app,
            "PUT",
            "/api/v1/cv/template",
            Some(json!({"templateId": "executive"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

        let (status, body) = call(
            &app,
            "PUT",
            "/api/v1/cv/template",
            Some(json!({"templateId": "modern"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["id"], "modern");
    }

    #[tokio::test]
    async fn test_sign_up_then_session_is_signed_in() {
        let app = TestApp::new();
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/auth/sign-up",
            Some(json!({"email": "jane@example.com", "password": "secret1", "name": "Jane"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let uid = body["user"]["uid"].as_str().unwrap().to_string();

        let mut rx = app.state.session.subscribe();
        rx.wait_for(|s| s.identity().is_some()).await.unwrap();
        let (_, session) = call(&app, "GET", "/api/v1/auth/session", None).await;
        assert_eq!(session["state"], "signed_in");
        assert_eq!(session["identity"]["uid"], uid.as_str());
    }

    #[tokio::test]
    async fn test_sign_in_with_bad_input_is_rejected() {
        let app = TestApp::new();
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/auth/sign-in",
            Some(json!({"email": "not-an-email", "password": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_cv_requests_need_sign_in() {
        let app = TestApp::new();
        let (status, _) = call(&app, "POST", "/api/v1/cv-requests", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_completes_a_request() {
        let app = TestApp::new();
        app.sign_in(profile("admin-1", Role::Admin)).await;

        let (status, created) = call(&app, "POST", "/api/v1/cv-requests", None).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        assert_eq!(created["status"], "pending");

        let uri = format!("/api/v1/admin/cv-requests/{}/status", created["id"].as_str().unwrap());
        let (status, updated) = call(&app, "PATCH", &uri, Some(json!({"status": "completed"}))).await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["status"], "completed");

        let (_, listing) = call(
            &app,
            "GET",
            "/api/v1/admin/cv-requests?status=completed",
            None,
        )
        .await;
        assert_eq!(listing["requests"].as_array().unwrap().len(), 1);
        assert_eq!(listing["counts"]["completed"], 1);
        assert_eq!(app.requests.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admin_listing_is_forbidden_for_users() {
        let app = TestApp::new();
        app.sign_in(profile("user-1", Role::User)).await;
        let (status, _) = call(&app, "GET", "/api/v1/admin/cv-requests", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_request_status_update_is_not_found() {
        let app = TestApp::new();
        app.sign_in(profile("admin-1", Role::Admin)).await;
        let uri = format!("/api/v1/admin/cv-requests/{}/status", uuid::Uuid::new_v4());
        let (status, _) = call(&app, "PATCH", &uri, Some(json!({"status": "in_progress"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upgrade_unlocks_premium_templates() {
        let app = TestApp::new();
        app.sign_in(profile("user-1", Role::User)).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/subscriptions/upgrade",
            Some(json!({"planId": "premium_monthly"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["identity"]["subscription"], "premium");

        let (status, _) = call(
            &app,
            "PUT",
            "/api/v1/cv/template",
            Some(json!({"templateId": "executive"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_signed_in_save_reaches_remote() {
        let app = TestApp::new();
        app.sign_in(profile("user-1", Role::User)).await;
        call(
            &app,
            "PATCH",
            "/api/v1/cv/personal-info",
            Some(json!({"fullName": "Jane Doe"})),
        )
        .await;

        let (status, body) = call(&app, "POST", "/api/v1/cv/save", None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let stored = app.remote.stored("user-1").unwrap();
        assert_eq!(stored.document.personal_info.full_name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_export_sets_attachment_header() {
        let app = TestApp::new();
        let response = build_router(app.state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/cv/export")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()["content-disposition"].to_str().unwrap();
        assert!(disposition.starts_with("attachment; filename="));
    }
}
