use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CvDocumentRow {
    pub user_id: String,
    pub data: Value,
    pub selected_template: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CvRequestRow {
    pub id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub template_id: Option<String>,
    pub template_name: Option<String>,
    pub subscription: String,
    pub status: String,
    pub cv_data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
