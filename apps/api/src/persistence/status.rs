use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::persistence::{SaveOutcome, StoreError};

/// How long the "just saved" flag stays up after a save.
pub const JUST_SAVED_TTL: Duration = Duration::from_secs(3);

/// Cosmetic save indicator shown by the UI. Not a durability signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveStatus {
    pub just_saved: bool,
    pub last_saved: Option<DateTime<Utc>>,
    /// Human label for `last_saved`, suffixed with " (Offline)" when the save
    /// only reached the local cache because the remote store was unreachable.
    pub last_saved_label: Option<String>,
    pub offline: bool,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct IndicatorState {
    status: SaveStatus,
    stamp: u64,
}

#[derive(Clone, Default)]
pub struct SaveIndicator {
    inner: Arc<Mutex<IndicatorState>>,
}

impl SaveIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SaveStatus {
        self.lock().status.clone()
    }

    /// Records a completed save and schedules the "just saved" flag to clear.
    /// A newer save pushes the deadline out.
    pub fn record(&self, outcome: SaveOutcome) {
        let now = Utc::now();
        let offline = outcome == SaveOutcome::Offline;
        let stamp = {
            let mut state = self.lock();
            state.stamp += 1;
            let mut label = now.format("%Y-%m-%d %H:%M:%S UTC").to_string();
            if offline {
                label.push_str(" (Offline)");
            }
            state.status = SaveStatus {
                just_saved: true,
                last_saved: Some(now),
                last_saved_label: Some(label),
                offline,
                last_error: None,
            };
            state.stamp
        };

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(JUST_SAVED_TTL).await;
            let mut state = inner.lock().unwrap_or_else(|p| p.into_inner());
            if state.stamp == stamp {
                state.status.just_saved = false;
            }
        });
    }

    pub fn record_failure(&self, error: &StoreError) {
        self.lock().status.last_error = Some(error.to_string());
    }

    /// Back to the never-saved state, used when the owner signs out.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.stamp += 1;
        state.status = SaveStatus::default();
    }

    fn lock(&self) -> MutexGuard<'_, IndicatorState> {
        // A poisoned indicator is still a valid indicator.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}
