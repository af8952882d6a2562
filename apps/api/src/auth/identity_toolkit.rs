//! Google Identity Toolkit REST client, the production [`AuthProvider`].
//!
//! Sessions are process-local: signing out forgets the tokens and broadcasts
//! [`AuthEvent::SignedOut`]; nothing is revoked server-side.
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::auth::provider::{
    AuthError, AuthEvent, AuthProvider, FederatedOutcome, FederatedSignIn, UserHandle,
};

pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const GOOGLE_PROVIDER_ID: &str = "google.com";
const EVENT_BUFFER: usize = 16;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: Option<String>,
    provider_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuthUriResponse {
    auth_uri: String,
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ToolkitError {
    error: ToolkitErrorBody,
}

#[derive(Debug, Deserialize)]
struct ToolkitErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    user: UserHandle,
    id_token: Option<String>,
}

pub struct IdentityToolkitProvider {
    client: Client,
    api_key: String,
    base_url: String,
    session: RwLock<Option<ActiveSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl IdentityToolkitProvider {
    pub fn new(api_key: String, base_url: String) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AuthError::Unexpected(format!("failed to build HTTP client: {e}")))?;
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            events,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", self.base_url, method, self.api_key)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Identity toolkit {method} returned {status}: {body}");
            return Err(if status.is_server_error() {
                AuthError::Unexpected(format!("{method} failed with status {status}"))
            } else {
                AuthError::Rejected(rejection_message(&body))
            });
        }

        response.json::<T>().await.map_err(classify_transport_error)
    }

    fn establish(&self, account: AccountResponse) -> UserHandle {
        let user = UserHandle {
            uid: account.local_id,
            email: account.email.unwrap_or_default(),
            display_name: account.display_name,
            photo_url: account.photo_url,
            provider_id: account.provider_id.unwrap_or_else(|| "password".to_string()),
        };
        let session = ActiveSession {
            user: user.clone(),
            id_token: account.id_token,
        };
        *self.session.write().unwrap_or_else(|p| p.into_inner()) = Some(session);
        info!("User {} signed in via {}", user.uid, user.provider_id);
        // No receivers is fine; the session manager may not be listening yet.
        let _ = self.events.send(AuthEvent::SignedIn(user.clone()));
        user
    }

    async fn sign_in_with_idp(
        &self,
        post_body: String,
        request_uri: &str,
        session_id: Option<&str>,
    ) -> Result<UserHandle, AuthError> {
        let mut body = json!({
            "postBody": post_body,
            "requestUri": request_uri,
            "returnIdpCredential": true,
            "returnSecureToken": true,
        });
        if let Some(session_id) = session_id {
            body["sessionId"] = json!(session_id);
        }
        let account: AccountResponse = self.post("signInWithIdp", &body).await?;
        Ok(self.establish(account))
    }
}

#[async_trait]
impl AuthProvider for IdentityToolkitProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserHandle, AuthError> {
        let mut account: AccountResponse = self
            .post(
                "signUp",
                &json!({"email": email, "password": password, "returnSecureToken": true}),
            )
            .await?;

        if let Some(id_token) = &account.id_token {
            let _: serde_json::Value = self
                .post(
                    "update",
                    &json!({
                        "idToken": id_token,
                        "displayName": display_name,
                        "returnSecureToken": false,
                    }),
                )
                .await?;
            account.display_name = Some(display_name.to_string());
        }

        Ok(self.establish(account))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserHandle, AuthError> {
        let account: AccountResponse = self
            .post(
                "signInWithPassword",
                &json!({"email": email, "password": password, "returnSecureToken": true}),
            )
            .await?;
        Ok(self.establish(account))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self
            .session
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(previous) = previous {
            info!("User {} signed out", previous.user.uid);
            if previous.id_token.is_none() {
                warn!("Signed-out session carried no id token");
            }
        }
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        let _: serde_json::Value = self
            .post(
                "sendOobCode",
                &json!({"requestType": "PASSWORD_RESET", "email": email}),
            )
            .await?;
        Ok(())
    }

    async fn federated_sign_in(
        &self,
        request: FederatedSignIn,
    ) -> Result<FederatedOutcome, AuthError> {
        match request {
            FederatedSignIn::Popup { id_token } => {
                let post_body = idp_post_body(&id_token)?;
                let user = self
                    .sign_in_with_idp(post_body, "http://localhost", None)
                    .await?;
                Ok(FederatedOutcome::SignedIn { user })
            }
            FederatedSignIn::Redirect { continue_uri } => {
                let created: CreateAuthUriResponse = self
                    .post(
                        "createAuthUri",
                        &json!({
                            "providerId": GOOGLE_PROVIDER_ID,
                            "continueUri": continue_uri,
                            "customParameter": {"prompt": "select_account"},
                        }),
                    )
                    .await?;
                Ok(FederatedOutcome::Redirect {
                    auth_uri: created.auth_uri,
                    session_id: created.session_id,
                })
            }
        }
    }

    async fn complete_redirect(
        &self,
        request_uri: &str,
        session_id: &str,
    ) -> Result<UserHandle, AuthError> {
        self.sign_in_with_idp(String::new(), request_uri, Some(session_id))
            .await
    }

    fn current_user(&self) -> Option<UserHandle> {
        self.session
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map(|s| s.user.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

fn classify_transport_error(e: reqwest::Error) -> AuthError {
    if e.is_connect() || e.is_timeout() {
        AuthError::Connectivity(e.to_string())
    } else {
        AuthError::Unexpected(e.to_string())
    }
}

/// Form-encoded `postBody` for `signInWithIdp` with a Google id token.
fn idp_post_body(id_token: &str) -> Result<String, AuthError> {
    serde_urlencoded::to_string([("id_token", id_token), ("providerId", GOOGLE_PROVIDER_ID)])
        .map_err(|e| AuthError::Unexpected(format!("failed to encode id token: {e}")))
}

/// Turns the toolkit's error codes (e.g. `EMAIL_EXISTS`,
/// `WEAK_PASSWORD : Password should be at least 6 characters`) into text a
/// user can read.
fn rejection_message(body: &str) -> String {
    let code = serde_json::from_str::<ToolkitError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    let (code, detail) = match code.split_once(" : ") {
        Some((code, detail)) => (code.to_string(), Some(detail.to_string())),
        None => (code, None),
    };
    match code.as_str() {
        "EMAIL_EXISTS" => "An account with this email already exists".to_string(),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password".to_string()
        }
        "USER_DISABLED" => "This account has been disabled".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later".to_string(),
        "INVALID_EMAIL" => "Invalid email address".to_string(),
        _ => detail.unwrap_or(code),
    }
}
