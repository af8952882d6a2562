use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::cv::CvDocumentRow;
use crate::persistence::{CvSnapshot, StoreError};

/// Remote key-value document store, one CV per user id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<CvSnapshot>, StoreError>;

    /// Replaces the stored document. No version check: the last write to
    /// complete wins.
    async fn put(&self, user_id: &str, snapshot: &CvSnapshot) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, user_id: &str) -> Result<Option<CvSnapshot>, StoreError> {
        let row = sqlx::query_as::<_, CvDocumentRow>(
            "SELECT user_id, data, selected_template, updated_at FROM cv_documents WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<CvSnapshot, StoreError> {
            Ok(CvSnapshot {
                document: serde_json::from_value(row.data)?,
                selected_template: row.selected_template,
            })
        })
        .transpose()
    }

    async fn put(&self, user_id: &str, snapshot: &CvSnapshot) -> Result<(), StoreError> {
        let data = serde_json::to_value(&snapshot.document)?;
        sqlx::query(
            r#"
            INSERT INTO cv_documents (user_id, data, selected_template, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET data = EXCLUDED.data,
                selected_template = EXCLUDED.selected_template,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(data)
        .bind(snapshot.selected_template.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
