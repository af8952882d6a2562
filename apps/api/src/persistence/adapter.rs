use std::sync::Arc;

use tracing::{debug, warn};

use crate::cv::document::CvDocument;
use crate::persistence::cache::{LocalCache, CV_DATA_KEY, TEMPLATE_KEY};
use crate::persistence::store::DocumentStore;
use crate::persistence::{CvSnapshot, SaveOutcome, StoreError};

/// Persists one CV per user in the remote store, falling back to the local
/// cache when the remote store is unreachable.
///
/// There is no retry and no replay: once connectivity returns, the next
/// successful save simply overwrites the remote copy. Independent concurrent
/// calls are not ordered, so the last call to complete decides the remote
/// state. Use [`crate::persistence::queue::SaveQueue`] to serialize saves.
pub struct DocumentStoreAdapter {
    remote: Arc<dyn DocumentStore>,
    cache: Arc<dyn LocalCache>,
}

impl DocumentStoreAdapter {
    pub fn new(remote: Arc<dyn DocumentStore>, cache: Arc<dyn LocalCache>) -> Self {
        Self { remote, cache }
    }

    /// Never fails: any error ends in `None` with a warning.
    pub async fn load(&self, user_id: &str) -> Option<CvSnapshot> {
        match self.remote.get(user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_connectivity() => {
                warn!("Remote load for {user_id} failed ({e}); reading local cache");
                self.read_cache().await
            }
            Err(e) => {
                warn!("Remote load for {user_id} failed: {e}");
                None
            }
        }
    }

    pub async fn save(
        &self,
        user_id: &str,
        snapshot: &CvSnapshot,
    ) -> Result<SaveOutcome, StoreError> {
        match self.remote.put(user_id, snapshot).await {
            Ok(()) => {
                if let Err(e) = self.write_cache(snapshot).await {
                    warn!("Mirroring CV for {user_id} to local cache failed: {e}");
                }
                debug!("Saved CV for {user_id} to remote store");
                Ok(SaveOutcome::Remote)
            }
            Err(e) if e.is_connectivity() => {
                warn!("Remote save for {user_id} failed ({e}); writing local cache");
                self.write_cache(snapshot).await?;
                Ok(SaveOutcome::Offline)
            }
            Err(e) => Err(e),
        }
    }

    /// Saves without an owner: only the local cache is written.
    pub async fn save_local(&self, snapshot: &CvSnapshot) -> Result<SaveOutcome, StoreError> {
        self.write_cache(snapshot).await?;
        Ok(SaveOutcome::Local)
    }

    async fn write_cache(&self, snapshot: &CvSnapshot) -> Result<(), StoreError> {
        let document = serde_json::to_string(&snapshot.document)?;
        let template = serde_json::to_string(&snapshot.selected_template)?;
        self.cache.put(CV_DATA_KEY, &document).await?;
        self.cache.put(TEMPLATE_KEY, &template).await?;
        Ok(())
    }

    async fn read_cache(&self) -> Option<CvSnapshot> {
        let document = match self.cache.get(CV_DATA_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<CvDocument>(&raw) {
                Ok(document) => document,
                Err(e) => {
                    warn!("Cached CV is unreadable: {e}");
                    return None;
                }
            },
            Ok(None) => return None,
            Err(e) => {
                warn!("Reading cached CV failed: {e}");
                return None;
            }
        };

        let selected_template = match self.cache.get(TEMPLATE_KEY).await {
            Ok(Some(raw)) => serde_json::from_str::<Option<String>>(&raw).unwrap_or_else(|e| {
                warn!("Cached template selection is unreadable: {e}");
                None
            }),
            Ok(None) => None,
            Err(e) => {
                warn!("Reading cached template selection failed: {e}");
                None
            }
        };

        Some(CvSnapshot {
            document,
            selected_template,
        })
    }
}
