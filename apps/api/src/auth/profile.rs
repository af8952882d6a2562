use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;

use crate::auth::identity::{ProfilePatch, UserProfile};
use crate::models::user::UserProfileRow;
use crate::persistence::StoreError;

/// Extended user profiles, keyed by uid.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, uid: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Writes `profile` unless a record for the uid already exists.
    async fn ensure(&self, profile: &UserProfile) -> Result<(), StoreError>;

    /// Merges `patch` into the stored record. A missing record is not an error.
    async fn update(&self, uid: &str, patch: &ProfilePatch) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<UserProfileRow> for UserProfile {
    fn from(row: UserProfileRow) -> Self {
        // Unrecognised values degrade to the least-privileged defaults.
        let subscription = row.subscription.parse().unwrap_or_else(|e| {
            warn!("Profile {}: {e}", row.uid);
            Default::default()
        });
        let role = row.role.parse().unwrap_or_else(|e| {
            warn!("Profile {}: {e}", row.uid);
            Default::default()
        });
        Self {
            uid: row.uid,
            email: row.email,
            name: row.name,
            subscription,
            role,
            provider: row.provider,
            photo_url: row.photo_url,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn fetch(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, UserProfileRow>(
            r#"
            SELECT uid, email, name, subscription, role, provider, photo_url, created_at
            FROM user_profiles
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserProfile::from))
    }

    async fn ensure(&self, profile: &UserProfile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles
                (uid, email, name, subscription, role, provider, photo_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (uid) DO NOTHING
            "#,
        )
        .bind(&profile.uid)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(profile.subscription.as_str())
        .bind(profile.role.as_str())
        .bind(&profile.provider)
        .bind(profile.photo_url.as_deref())
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, uid: &str, patch: &ProfilePatch) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE user_profiles
            SET name = COALESCE($2, name),
                photo_url = COALESCE($3, photo_url),
                subscription = COALESCE($4, subscription)
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .bind(patch.name.as_deref())
        .bind(patch.photo_url.as_deref())
        .bind(patch.subscription.map(|tier| tier.as_str()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
