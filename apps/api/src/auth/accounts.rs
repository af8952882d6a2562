use serde::Deserialize;
use tracing::{info, warn};

use crate::analytics::{self, AnalyticsEvent, SignInMethod};
use crate::auth::identity::UserProfile;
use crate::auth::profile::ProfileStore;
use crate::auth::provider::{AuthError, AuthProvider, FederatedOutcome, FederatedSignIn, UserHandle};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl SignInRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err("password is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRedirectRequest {
    pub request_uri: String,
    pub session_id: String,
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(format!("'{email}' is not a valid email address")),
    }
}

/// Creates the account and its stored profile. The account stands even if the
/// profile write fails; the profile is then created on the next sign-in.
pub async fn register(
    auth: &dyn AuthProvider,
    profiles: &dyn ProfileStore,
    req: &SignUpRequest,
) -> Result<UserHandle, AuthError> {
    let name = req.name.trim();
    let user = auth.sign_up(req.email.trim(), &req.password, name).await?;
    ensure_profile(profiles, &user, Some(name)).await;
    analytics::track(AnalyticsEvent::Registration {
        method: SignInMethod::Email,
        email: &user.email,
    });
    info!("Registered {}", user.uid);
    Ok(user)
}

pub async fn login(
    auth: &dyn AuthProvider,
    profiles: &dyn ProfileStore,
    req: &SignInRequest,
) -> Result<UserHandle, AuthError> {
    let user = auth.sign_in(req.email.trim(), &req.password).await?;
    ensure_profile(profiles, &user, None).await;
    analytics::track(AnalyticsEvent::Login {
        method: SignInMethod::Email,
        email: &user.email,
    });
    Ok(user)
}

pub async fn federated(
    auth: &dyn AuthProvider,
    profiles: &dyn ProfileStore,
    request: FederatedSignIn,
) -> Result<FederatedOutcome, AuthError> {
    let outcome = auth.federated_sign_in(request).await?;
    if let FederatedOutcome::SignedIn { user } = &outcome {
        google_signed_in(profiles, user).await;
    }
    Ok(outcome)
}

pub async fn complete_redirect(
    auth: &dyn AuthProvider,
    profiles: &dyn ProfileStore,
    req: &CompleteRedirectRequest,
) -> Result<UserHandle, AuthError> {
    let user = auth
        .complete_redirect(&req.request_uri, &req.session_id)
        .await?;
    google_signed_in(profiles, &user).await;
    Ok(user)
}

pub async fn logout(auth: &dyn AuthProvider) -> Result<(), AuthError> {
    auth.sign_out().await
}

pub async fn reset_password(auth: &dyn AuthProvider, email: &str) -> Result<(), AuthError> {
    auth.reset_password(email.trim()).await?;
    info!("Password reset requested");
    Ok(())
}

async fn google_signed_in(profiles: &dyn ProfileStore, user: &UserHandle) {
    ensure_profile(profiles, user, None).await;
    analytics::track(AnalyticsEvent::Login {
        method: SignInMethod::Google,
        email: &user.email,
    });
}

async fn ensure_profile(profiles: &dyn ProfileStore, user: &UserHandle, name: Option<&str>) {
    let profile = UserProfile::initial(user, name);
    if let Err(e) = profiles.ensure(&profile).await {
        warn!("Creating profile for {} failed: {e}", user.uid);
    }
}
