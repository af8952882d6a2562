use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::provider::UserHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(format!("unknown subscription tier '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// The signed-in user as the rest of the app sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub subscription: SubscriptionTier,
    pub role: Role,
    pub provider: String,
    pub photo_url: Option<String>,
}

impl Identity {
    /// Built from what the auth handle carries without a network round trip.
    pub fn provisional(handle: &UserHandle) -> Self {
        Self {
            uid: handle.uid.clone(),
            email: handle.email.clone(),
            name: handle
                .display_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "User".to_string()),
            subscription: SubscriptionTier::Free,
            role: Role::User,
            provider: handle.provider_id.clone(),
            photo_url: handle.photo_url.clone(),
        }
    }

    /// Whether the stored profile carries anything the provisional identity
    /// got wrong.
    pub fn differs_from(&self, profile: &UserProfile) -> bool {
        self.subscription != profile.subscription
            || self.name != profile.name
            || self.role != profile.role
    }

    pub fn merged_with(&self, profile: &UserProfile) -> Self {
        Self {
            uid: self.uid.clone(),
            email: if profile.email.is_empty() {
                self.email.clone()
            } else {
                profile.email.clone()
            },
            name: profile.name.clone(),
            subscription: profile.subscription,
            role: profile.role,
            provider: self.provider.clone(),
            photo_url: profile.photo_url.clone().or_else(|| self.photo_url.clone()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Extended profile record kept in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub subscription: SubscriptionTier,
    pub role: Role,
    pub provider: String,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// The record written the first time a user shows up.
    pub fn initial(handle: &UserHandle, name: Option<&str>) -> Self {
        let identity = Identity::provisional(handle);
        Self {
            uid: identity.uid,
            email: identity.email,
            name: name.map(str::to_string).unwrap_or(identity.name),
            subscription: SubscriptionTier::Free,
            role: Role::User,
            provider: identity.provider,
            photo_url: identity.photo_url,
            created_at: Utc::now(),
        }
    }
}

/// Fields a signed-in user may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub photo_url: Option<String>,
    #[serde(skip)]
    pub subscription: Option<SubscriptionTier>,
}

impl ProfilePatch {
    pub fn subscription(tier: SubscriptionTier) -> Self {
        Self {
            subscription: Some(tier),
            ..Default::default()
        }
    }

    pub fn apply(&self, identity: &mut Identity) {
        if let Some(name) = &self.name {
            identity.name = name.clone();
        }
        if let Some(photo_url) = &self.photo_url {
            identity.photo_url = Some(photo_url.clone());
        }
        if let Some(tier) = self.subscription {
            identity.subscription = tier;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.photo_url.is_none() && self.subscription.is_none()
    }
}
