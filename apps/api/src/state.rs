use std::sync::Arc;

use crate::auth::profile::ProfileStore;
use crate::auth::provider::AuthProvider;
use crate::auth::session::SessionManager;
use crate::billing::gateway::PaymentGateway;
use crate::cv::editor::CvEditor;
use crate::notifications::Notifier;
use crate::requests::store::RequestStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub session: Arc<SessionManager>,
    /// The in-memory CV being edited; follows the session's signed-in user.
    pub editor: Arc<CvEditor>,
    pub requests: Arc<dyn RequestStore>,
    pub notifier: Arc<dyn Notifier>,
    pub payments: Arc<dyn PaymentGateway>,
}
