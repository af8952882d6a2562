//! Session manager: tracks who is signed in and publishes it.
//!
//! A sign-in is published twice. The provisional identity goes out as soon as
//! the auth provider reports the user; the stored profile is then fetched in
//! the background and merged in. Every sign-in or sign-out bumps an epoch, and a
//! reconciliation only lands if the epoch it started under is still current.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::identity::{Identity, ProfilePatch};
use crate::auth::profile::ProfileStore;
use crate::auth::provider::{AuthEvent, AuthProvider, UserHandle};
use crate::persistence::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// The auth provider has not reported yet.
    Loading,
    SignedOut,
    SignedIn {
        identity: Identity,
        /// Set once the stored profile has been merged in.
        reconciled: bool,
    },
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::SignedIn { identity, .. } => Some(identity),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no user logged in")]
    NotSignedIn,

    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Shared {
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
    profiles: Arc<dyn ProfileStore>,
}

pub struct SessionManager {
    shared: Arc<Shared>,
    listener: JoinHandle<()>,
}

impl SessionManager {
    /// Subscribes to `auth` and starts tracking its state. Must be called
    /// inside a tokio runtime.
    pub fn start(auth: Arc<dyn AuthProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        let shared = Arc::new(Shared {
            state: watch::channel(SessionState::Loading).0,
            epoch: AtomicU64::new(0),
            profiles,
        });

        // Subscribe before reading the current user so no transition is missed.
        let mut events = auth.subscribe();
        let tracker = shared.clone();
        let listener = tokio::spawn(async move {
            tracker.resync(auth.current_user());
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SignedIn(handle)) => tracker.signed_in(handle),
                    Ok(AuthEvent::SignedOut) => tracker.signed_out(),
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Session listener missed {missed} auth events; resyncing");
                        tracker.resync(auth.current_user());
                    }
                    Err(RecvError::Closed) => {
                        info!("Auth provider closed its event stream");
                        break;
                    }
                }
            }
        });

        Self { shared, listener }
    }

    pub fn current(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.shared.state.borrow().identity().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Writes `patch` to the stored profile, then applies it to the published
    /// identity.
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Identity, SessionError> {
        let uid = self.identity().ok_or(SessionError::NotSignedIn)?.uid;
        self.shared.profiles.update(&uid, &patch).await?;

        let mut updated = None;
        self.shared.state.send_if_modified(|state| match state {
            SessionState::SignedIn { identity, .. } if identity.uid == uid => {
                patch.apply(identity);
                updated = Some(identity.clone());
                true
            }
            _ => false,
        });
        // The user may have signed out while the write was in flight.
        updated.ok_or(SessionError::NotSignedIn)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl Shared {
    fn resync(self: &Arc<Self>, current: Option<UserHandle>) {
        match current {
            Some(handle) => self.signed_in(handle),
            None => self.signed_out(),
        }
    }

    fn signed_in(self: &Arc<Self>, handle: UserHandle) {
        if let SessionState::SignedIn { identity, .. } = &*self.state.borrow() {
            if identity.uid == handle.uid {
                debug!("User {} already signed in", handle.uid);
                return;
            }
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let provisional = Identity::provisional(&handle);
        info!("Session started for {}", provisional.uid);
        self.state.send_replace(SessionState::SignedIn {
            identity: provisional,
            reconciled: false,
        });

        let shared = self.clone();
        tokio::spawn(async move { shared.reconcile(epoch, handle.uid).await });
    }

    fn signed_out(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let previous = self.state.send_replace(SessionState::SignedOut);
        if let Some(identity) = previous.identity() {
            info!("Session ended for {}", identity.uid);
        }
    }

    async fn reconcile(&self, epoch: u64, uid: String) {
        let profile = match self.profiles.fetch(&uid).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Fetching profile for {uid} failed: {e}");
                return;
            }
        };

        let landed = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            let SessionState::SignedIn {
                identity,
                reconciled,
            } = state
            else {
                return false;
            };
            if identity.uid != uid {
                return false;
            }
            if let Some(profile) = &profile {
                if identity.differs_from(profile) {
                    *identity = identity.merged_with(profile);
                }
            }
            *reconciled = true;
            true
        });

        if landed {
            debug!("Profile for {uid} reconciled");
        } else {
            debug!("Discarded stale profile for {uid}");
        }
    }
}
