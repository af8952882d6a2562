//! The CV editor: sole owner of the in-memory document for this process.
//!
//! Every mutation is applied under the lock and a save of the resulting
//! snapshot is queued before the lock is released, so the save queue sees
//! snapshots in mutation order. Callers never wait on storage.
//!
//! While a user's stored document is being fetched, mutations are applied to
//! the skeleton but not saved; they are kept and replayed onto the document
//! once it arrives, so a half-loaded skeleton is never written over it.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::identity::SubscriptionTier;
use crate::auth::session::SessionState;
use crate::cv::document::{DocumentError, PersonalInfo, PersonalInfoPatch, Section};
use crate::cv::export::{parse_import, CvExport};
use crate::cv::ids::EntryIdGenerator;
use crate::cv::templates::{find_template, TemplateDescriptor};
use crate::persistence::adapter::DocumentStoreAdapter;
use crate::persistence::queue::SaveQueue;
use crate::persistence::status::{SaveIndicator, SaveStatus};
use crate::persistence::CvSnapshot;

type Replay = Box<dyn Fn(&mut CvSnapshot) -> Result<(), DocumentError> + Send>;

#[derive(Default)]
struct EditorState {
    owner: Option<String>,
    snapshot: CvSnapshot,
    /// `Some` while the owner's document is loading; holds the edits made
    /// meanwhile.
    replay: Option<Vec<Replay>>,
}

pub struct CvEditor {
    state: Mutex<EditorState>,
    /// Bumped whenever the owner changes; a load only lands under the epoch
    /// it started in.
    epoch: AtomicU64,
    loading: watch::Sender<bool>,
    ids: EntryIdGenerator,
    adapter: Arc<DocumentStoreAdapter>,
    indicator: SaveIndicator,
    queue: SaveQueue,
}

impl CvEditor {
    /// Must be called inside a tokio runtime; spawns the save worker.
    pub fn new(adapter: Arc<DocumentStoreAdapter>) -> Self {
        let indicator = SaveIndicator::new();
        let queue = SaveQueue::spawn(adapter.clone(), indicator.clone());
        Self {
            state: Mutex::new(EditorState::default()),
            epoch: AtomicU64::new(0),
            loading: watch::channel(false).0,
            ids: EntryIdGenerator::new(),
            adapter,
            indicator,
            queue,
        }
    }

    pub fn snapshot(&self) -> CvSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn owner(&self) -> Option<String> {
        self.lock().owner.clone()
    }

    pub fn status(&self) -> SaveStatus {
        self.indicator.status()
    }

    pub fn update_personal_info(&self, patch: PersonalInfoPatch) -> PersonalInfo {
        self.mutate(move |snapshot| -> Result<_, DocumentError> {
            patch.clone().apply(&mut snapshot.document.personal_info);
            Ok(snapshot.document.personal_info.clone())
        })
        .unwrap_or_default()
    }

    /// Appends a new entry and returns its freshly assigned id.
    pub fn add_entry(&self, section: Section, fields: Value) -> Result<String, DocumentError> {
        let id = self.ids.next_id();
        self.mutate(move |snapshot| {
            snapshot
                .document
                .add_entry(section, id.clone(), fields.clone())
                .map(|_| id.clone())
        })
    }

    pub fn update_entry(
        &self,
        section: Section,
        id: &str,
        patch: Value,
    ) -> Result<(), DocumentError> {
        let id = id.to_string();
        self.mutate(move |snapshot| snapshot.document.update_entry(section, &id, patch.clone()))
    }

    pub fn remove_entry(&self, section: Section, id: &str) -> Result<(), DocumentError> {
        let id = id.to_string();
        self.mutate(move |snapshot| snapshot.document.remove_entry(section, &id))
    }

    /// Selects a catalog template. Premium templates are refused below the
    /// premium tier.
    pub fn select_template(
        &self,
        template_id: &str,
        tier: SubscriptionTier,
    ) -> Result<&'static TemplateDescriptor, DocumentError> {
        let template = find_template(template_id)
            .ok_or_else(|| DocumentError::UnknownTemplate(template_id.to_string()))?;
        if template.is_locked_for(tier) {
            return Err(DocumentError::TemplateLocked(template_id.to_string()));
        }
        self.mutate(move |snapshot| {
            snapshot.selected_template = Some(template.id.to_string());
            Ok(template)
        })
    }

    /// Clears the document and template selection, and saves the result.
    pub fn reset(&self) {
        let _ = self.mutate(|snapshot| -> Result<(), DocumentError> {
            *snapshot = CvSnapshot::default();
            Ok(())
        });
    }

    /// Queues a save of the current snapshot and waits for it to land. If the
    /// owner's document is still loading, waits for the load first.
    pub async fn save_now(&self) -> SaveStatus {
        let generation = loop {
            let mut loading = {
                let state = self.lock();
                if state.replay.is_none() {
                    break self
                        .queue
                        .enqueue(state.owner.clone(), state.snapshot.clone());
                }
                self.loading.subscribe()
            };
            let _ = loading.wait_for(|loading| !*loading).await;
        };
        self.queue.flush(generation).await;
        self.indicator.status()
    }

    pub fn export(&self) -> CvExport {
        CvExport::from_snapshot(&self.snapshot(), Utc::now())
    }

    /// Replaces the document with an imported file and saves it. A premium
    /// template the caller's tier cannot use is dropped from the selection.
    pub fn import(&self, raw: Value, tier: SubscriptionTier) -> Result<CvSnapshot, DocumentError> {
        let mut imported = parse_import(raw)?;
        let locked = imported
            .selected_template
            .as_deref()
            .and_then(find_template)
            .is_some_and(|template| template.is_locked_for(tier));
        if locked {
            info!(
                "Imported template {:?} is locked for the {} tier; selection cleared",
                imported.selected_template,
                tier.as_str()
            );
            imported.selected_template = None;
        }
        self.ids.observe(&imported.document);
        self.mutate(move |snapshot| {
            *snapshot = imported.clone();
            Ok(snapshot.clone())
        })
    }

    /// Takes ownership for `uid` and loads their stored document. Switching
    /// from another user starts from the skeleton; a missing document leaves
    /// the skeleton in place.
    pub async fn load_for(&self, uid: &str) {
        let epoch = {
            let mut state = self.lock();
            if state.owner.as_deref() == Some(uid) {
                return;
            }
            state.owner = Some(uid.to_string());
            state.snapshot = CvSnapshot::default();
            state.replay = Some(Vec::new());
            self.loading.send_replace(true);
            self.indicator.clear();
            self.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };

        let loaded = self.adapter.load(uid).await;

        let mut state = self.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Discarded CV load for {uid}: owner changed");
            return;
        }
        let replay = state.replay.take().unwrap_or_default();
        self.loading.send_replace(false);

        match loaded {
            Some(loaded) => {
                self.ids.observe(&loaded.document);
                state.snapshot = loaded;
                for edit in &replay {
                    if let Err(e) = edit(&mut state.snapshot) {
                        warn!("Dropped an edit made while the CV for {uid} was loading: {e}");
                    }
                }
                info!("Loaded CV for {uid}");
            }
            None => debug!("No stored CV for {uid}; starting from an empty document"),
        }

        if !replay.is_empty() {
            self.queue
                .enqueue(state.owner.clone(), state.snapshot.clone());
        }
    }

    /// Drops the owner and resets to the skeleton. Nothing new is saved;
    /// saves already queued for the previous owner still land.
    pub fn sign_out(&self) {
        let mut state = self.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        state.replay = None;
        self.loading.send_replace(false);
        if let Some(owner) = state.owner.take() {
            info!("Cleared CV for {owner}");
        }
        state.snapshot = CvSnapshot::default();
        self.indicator.clear();
    }

    /// Keeps the editor in step with the session: load on sign-in, reset on
    /// sign-out.
    pub fn follow_session(
        self: Arc<Self>,
        mut session: watch::Receiver<SessionState>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let current = session.borrow_and_update().clone();
                match current {
                    SessionState::SignedIn { identity, .. } => self.load_for(&identity.uid).await,
                    SessionState::SignedOut => self.sign_out(),
                    SessionState::Loading => {}
                }
                if session.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    fn mutate<T, F>(&self, apply: F) -> Result<T, DocumentError>
    where
        T: 'static,
        F: Fn(&mut CvSnapshot) -> Result<T, DocumentError> + Send + 'static,
    {
        let mut state = self.lock();
        let result = apply(&mut state.snapshot)?;
        let EditorState {
            owner,
            snapshot,
            replay,
        } = &mut *state;
        match replay {
            Some(replay) => replay.push(Box::new(move |snapshot: &mut CvSnapshot| {
                apply(snapshot).map(|_| ())
            })),
            None => {
                self.queue.enqueue(owner.clone(), snapshot.clone());
            }
        }
        Ok(result)
    }

    fn lock(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}
