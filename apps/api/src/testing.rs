//! In-memory fakes for the capability traits, shared by unit tests.
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::identity::{ProfilePatch, UserProfile};
use crate::auth::profile::ProfileStore;
use crate::auth::provider::{
    AuthError, AuthEvent, AuthProvider, FederatedOutcome, FederatedSignIn, UserHandle,
};
use crate::auth::session::{SessionManager, SessionState};
use crate::billing::gateway::DemoPaymentGateway;
use crate::cv::editor::CvEditor;
use crate::notifications::DemoNotifier;
use crate::persistence::adapter::DocumentStoreAdapter;
use crate::persistence::cache::LocalCache;
use crate::persistence::store::DocumentStore;
use crate::persistence::{CvSnapshot, StoreError};
use crate::requests::store::RequestStore;
use crate::requests::{CvRequest, NewCvRequest, RequestStatus};
use crate::state::AppState;

pub fn handle(uid: &str) -> UserHandle {
    UserHandle {
        uid: uid.to_string(),
        email: format!("{uid}@example.com"),
        display_name: None,
        photo_url: None,
        provider_id: "password".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteMode {
    #[default]
    Available,
    /// Every call fails with a connectivity error.
    Unreachable,
    /// Every call fails with a non-connectivity error.
    Rejecting,
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, CvSnapshot>>,
    mode: Mutex<RemoteMode>,
    delays: Mutex<HashMap<String, Duration>>,
    read_delay: Mutex<Option<Duration>>,
    puts: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn set_mode(&self, mode: RemoteMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn delay_reads(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    /// Delays writes of documents whose full name is `full_name`.
    pub fn delay_for(&self, full_name: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(full_name.to_string(), delay);
    }

    pub fn stored(&self, user_id: &str) -> Option<CvSnapshot> {
        self.documents.lock().unwrap().get(user_id).cloned()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check_mode(&self) -> Result<(), StoreError> {
        match *self.mode.lock().unwrap() {
            RemoteMode::Available => Ok(()),
            RemoteMode::Unreachable => Err(StoreError::Connectivity("network down".into())),
            RemoteMode::Rejecting => Err(StoreError::Backend("permission denied".into())),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, user_id: &str) -> Result<Option<CvSnapshot>, StoreError> {
        self.check_mode()?;
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.stored(user_id))
    }

    async fn put(&self, user_id: &str, snapshot: &CvSnapshot) -> Result<(), StoreError> {
        self.check_mode()?;
        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(&snapshot.document.personal_info.full_name)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .insert(user_id.to_string(), snapshot.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.raw(key))
    }

    async fn put(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct FakeAuthProvider {
    accounts: Mutex<HashMap<String, (String, UserHandle)>>,
    current: Mutex<Option<UserHandle>>,
    federated_user: Mutex<Option<UserHandle>>,
    events: broadcast::Sender<AuthEvent>,
    next_uid: AtomicU64,
}

impl Default for FakeAuthProvider {
    fn default() -> Self {
        Self {
            accounts: Mutex::default(),
            current: Mutex::default(),
            federated_user: Mutex::default(),
            events: broadcast::channel(16).0,
            next_uid: AtomicU64::new(1),
        }
    }
}

impl FakeAuthProvider {
    pub fn emit_sign_in(&self, user: UserHandle) {
        *self.current.lock().unwrap() = Some(user.clone());
        let _ = self.events.send(AuthEvent::SignedIn(user));
    }

    pub fn emit_sign_out(&self) {
        *self.current.lock().unwrap() = None;
        let _ = self.events.send(AuthEvent::SignedOut);
    }

    /// Sets the current user without broadcasting.
    pub fn set_current(&self, user: Option<UserHandle>) {
        *self.current.lock().unwrap() = user;
    }

    /// The account a Google popup or redirect will resolve to.
    pub fn set_federated_user(&self, user: UserHandle) {
        *self.federated_user.lock().unwrap() = Some(user);
    }

    fn federated(&self) -> Result<UserHandle, AuthError> {
        let user = self
            .federated_user
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::Rejected("Sign-in popup was closed".into()))?;
        self.emit_sign_in(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<UserHandle, AuthError> {
        let user = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(AuthError::Rejected(
                    "An account with this email already exists".into(),
                ));
            }
            let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst));
            let user = UserHandle {
                uid,
                email: email.to_string(),
                display_name: Some(display_name.to_string()),
                photo_url: None,
                provider_id: "password".to_string(),
            };
            accounts.insert(email.to_string(), (password.to_string(), user.clone()));
            user
        };
        self.emit_sign_in(user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserHandle, AuthError> {
        let user = match self.accounts.lock().unwrap().get(email) {
            Some((expected, user)) if expected == password => user.clone(),
            _ => return Err(AuthError::Rejected("Invalid email or password".into())),
        };
        self.emit_sign_in(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.emit_sign_out();
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        if self.accounts.lock().unwrap().contains_key(email) {
            Ok(())
        } else {
            Err(AuthError::Rejected("Invalid email or password".into()))
        }
    }

    async fn federated_sign_in(
        &self,
        request: FederatedSignIn,
    ) -> Result<FederatedOutcome, AuthError> {
        match request {
            FederatedSignIn::Popup { .. } => Ok(FederatedOutcome::SignedIn {
                user: self.federated()?,
            }),
            FederatedSignIn::Redirect { continue_uri } => Ok(FederatedOutcome::Redirect {
                auth_uri: format!("https://accounts.example.com/auth?continue={continue_uri}"),
                session_id: "fake-session".into(),
            }),
        }
    }

    async fn complete_redirect(
        &self,
        _request_uri: &str,
        _session_id: &str,
    ) -> Result<UserHandle, AuthError> {
        self.federated()
    }

    fn current_user(&self) -> Option<UserHandle> {
        self.current.lock().unwrap().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, UserProfile>>,
    failing: AtomicBool,
    delay: Mutex<Duration>,
}

impl MemoryProfileStore {
    pub fn insert(&self, profile: UserProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.uid.clone(), profile);
    }

    pub fn get(&self, uid: &str) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(uid).cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every fetch.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Connectivity("profile store offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn fetch(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        Ok(self.get(uid))
    }

    async fn ensure(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.check()?;
        self.profiles
            .lock()
            .unwrap()
            .entry(profile.uid.clone())
            .or_insert_with(|| profile.clone());
        Ok(())
    }

    async fn update(&self, uid: &str, patch: &ProfilePatch) -> Result<(), StoreError> {
        self.check()?;
        if let Some(profile) = self.profiles.lock().unwrap().get_mut(uid) {
            if let Some(name) = &patch.name {
                profile.name = name.clone();
            }
            if let Some(photo_url) = &patch.photo_url {
                profile.photo_url = Some(photo_url.clone());
            }
            if let Some(tier) = patch.subscription {
                profile.subscription = tier;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRequestStore {
    requests: Mutex<Vec<CvRequest>>,
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn create(&self, request: NewCvRequest) -> Result<CvRequest, StoreError> {
        let now = Utc::now();
        let stored = CvRequest {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            user_name: request.user_name,
            user_email: request.user_email,
            template_id: request.template_id,
            template_name: request.template_name,
            subscription: request.subscription,
            status: RequestStatus::Pending,
            cv_data: request.cv_data,
            created_at: now,
            updated_at: now,
        };
        self.requests.lock().unwrap().insert(0, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<CvRequest>, StoreError> {
        Ok(self.requests.lock().unwrap().clone())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<CvRequest>, StoreError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<Option<CvRequest>, StoreError> {
        let mut requests = self.requests.lock().unwrap();
        Ok(requests.iter_mut().find(|r| r.id == id).map(|r| {
            r.status = status;
            r.updated_at = Utc::now();
            r.clone()
        }))
    }
}

/// A fully wired `AppState` over in-memory fakes, with the fakes exposed.
pub struct TestApp {
    pub state: AppState,
    pub auth: Arc<FakeAuthProvider>,
    pub profiles: Arc<MemoryProfileStore>,
    pub remote: Arc<MemoryDocumentStore>,
    pub requests: Arc<MemoryRequestStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let auth = Arc::new(FakeAuthProvider::default());
        let profiles = Arc::new(MemoryProfileStore::default());
        let remote = Arc::new(MemoryDocumentStore::default());
        let requests = Arc::new(MemoryRequestStore::default());

        let adapter = Arc::new(DocumentStoreAdapter::new(
            remote.clone(),
            Arc::new(MemoryCache::default()),
        ));
        let editor = Arc::new(CvEditor::new(adapter));
        let session = Arc::new(SessionManager::start(auth.clone(), profiles.clone()));
        editor.clone().follow_session(session.subscribe());

        let state = AppState {
            auth: auth.clone(),
            profiles: profiles.clone(),
            session,
            editor,
            requests: requests.clone(),
            notifier: Arc::new(DemoNotifier::new(
                "admin@cvbuilder.com".into(),
                "CV Builder Pro".into(),
            )),
            payments: Arc::new(DemoPaymentGateway::new()),
        };
        Self {
            state,
            auth,
            profiles,
            remote,
            requests,
        }
    }

    /// Signs `profile`'s user in and waits until both the session and the
    /// editor have caught up.
    pub async fn sign_in(&self, profile: UserProfile) {
        let uid = profile.uid.clone();
        let mut user = handle(&uid);
        user.email = profile.email.clone();
        self.profiles.insert(profile);

        let mut rx = self.state.session.subscribe();
        self.auth.emit_sign_in(user);
        rx.wait_for(|s| match s {
            SessionState::SignedIn {
                identity,
                reconciled,
            } => *reconciled && identity.uid == uid,
            _ => false,
        })
        .await
        .unwrap();
        while self.state.editor.owner().as_deref() != Some(uid.as_str()) {
            tokio::task::yield_now().await;
        }
    }
}
