use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::models::cv::CvRequestRow;
use crate::persistence::StoreError;
use crate::requests::{CvRequest, NewCvRequest, RequestStatus};

#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Stores a new request as pending.
    async fn create(&self, request: NewCvRequest) -> Result<CvRequest, StoreError>;

    /// Every request, newest first.
    async fn list(&self) -> Result<Vec<CvRequest>, StoreError>;

    /// One user's requests, newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CvRequest>, StoreError>;

    /// Sets the status and bumps `updated_at`. `None` when no such request.
    async fn update_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<CvRequest>, StoreError>;
}

#[derive(Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl TryFrom<CvRequestRow> for CvRequest {
    type Error = StoreError;

    fn try_from(row: CvRequestRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().unwrap_or_else(|e| {
            warn!("Request {}: {e}", row.id);
            RequestStatus::Pending
        });
        let subscription = row.subscription.parse().unwrap_or_else(|e| {
            warn!("Request {}: {e}", row.id);
            Default::default()
        });
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            template_id: row.template_id,
            template_name: row.template_name,
            subscription,
            status,
            cv_data: serde_json::from_value(row.cv_data)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const REQUEST_COLUMNS: &str = "id, user_id, user_name, user_email, template_id, template_name, \
     subscription, status, cv_data, created_at, updated_at";

fn convert_all(rows: Vec<CvRequestRow>) -> Result<Vec<CvRequest>, StoreError> {
    rows.into_iter().map(CvRequest::try_from).collect()
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn create(&self, request: NewCvRequest) -> Result<CvRequest, StoreError> {
        let cv_data = serde_json::to_value(&request.cv_data)?;
        let row = sqlx::query_as::<_, CvRequestRow>(&format!(
            r#"
            INSERT INTO cv_requests
                (id, user_id, user_name, user_email, template_id, template_name,
                 subscription, status, cv_data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&request.user_id)
        .bind(&request.user_name)
        .bind(&request.user_email)
        .bind(request.template_id.as_deref())
        .bind(request.template_name.as_deref())
        .bind(request.subscription.as_str())
        .bind(RequestStatus::Pending.as_str())
        .bind(cv_data)
        .fetch_one(&self.pool)
        .await?;
        CvRequest::try_from(row)
    }

    async fn list(&self) -> Result<Vec<CvRequest>, StoreError> {
        let rows = sqlx::query_as::<_, CvRequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM cv_requests ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CvRequest>, StoreError> {
        let rows = sqlx::query_as::<_, CvRequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM cv_requests WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<CvRequest>, StoreError> {
        let row = sqlx::query_as::<_, CvRequestRow>(&format!(
            r#"
            UPDATE cv_requests
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CvRequest::try_from).transpose()
    }
}
