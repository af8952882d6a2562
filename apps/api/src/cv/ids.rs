use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::cv::document::CvDocument;

/// Ids at or above this (around the year 33000 in milliseconds) are not
/// clock-derived and are left out of [`EntryIdGenerator::observe`].
const MAX_OBSERVED_ID: u64 = 1_000_000_000_000_000;

/// Hands out entry identifiers derived from the wall clock in milliseconds.
///
/// Identifiers strictly increase within a process, even when several entries are
/// created inside the same millisecond or the clock steps backwards.
#[derive(Debug, Default)]
pub struct EntryIdGenerator {
    last: AtomicU64,
}

impl EntryIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now.max(prev.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Moves the counter past every numeric id already present in `document`,
    /// so documents loaded from storage or imported from a file never collide
    /// with freshly generated ids.
    pub fn observe(&self, document: &CvDocument) {
        let highest = document
            .all_entry_ids()
            .filter_map(|id| id.parse::<u64>().ok())
            .filter(|id| *id < MAX_OBSERVED_ID)
            .max();
        if let Some(highest) = highest {
            self.last.fetch_max(highest, Ordering::AcqRel);
        }
    }
}
