use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// What the auth provider knows about a signed-in user, available without
/// any further lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserHandle {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub provider_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(UserHandle),
    SignedOut,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth provider unreachable: {0}")]
    Connectivity(String),

    #[error("{0}")]
    Rejected(String),

    #[error("unexpected auth provider response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FederatedSignIn {
    /// The UI already completed the Google popup and hands over its id token.
    Popup { id_token: String },
    /// Start a full-page redirect; the UI navigates to the returned URI.
    Redirect { continue_uri: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FederatedOutcome {
    SignedIn { user: UserHandle },
    Redirect { auth_uri: String, session_id: String },
}

/// Authentication capability. Implementations broadcast an [`AuthEvent`] on
/// every sign-in and sign-out so observers never have to poll.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserHandle, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserHandle, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn reset_password(&self, email: &str) -> Result<(), AuthError>;

    async fn federated_sign_in(
        &self,
        request: FederatedSignIn,
    ) -> Result<FederatedOutcome, AuthError>;

    /// Finishes a redirect started by [`FederatedSignIn::Redirect`].
    async fn complete_redirect(
        &self,
        request_uri: &str,
        session_id: &str,
    ) -> Result<UserHandle, AuthError>;

    fn current_user(&self) -> Option<UserHandle>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
