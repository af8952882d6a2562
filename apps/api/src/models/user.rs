use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfileRow {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub subscription: String,
    pub role: String,
    pub provider: String,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
