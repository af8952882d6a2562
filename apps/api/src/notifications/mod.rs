//! Outgoing email notifications.
//!
//! Only a demo implementation ships: it logs what would be sent and reports
//! success with `demo: true`.
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::cv::document::CvDocument;

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationRequest {
    /// The user's CV, rendered with the named template.
    CvEmail {
        to: String,
        user_name: String,
        cv_data: CvDocument,
        template_name: Option<String>,
    },
    PasswordReset {
        to: String,
    },
    /// Tells the admin inbox about a CV request.
    AdminNotification {
        request_id: String,
        user_email: String,
        status: String,
    },
    SubscriptionConfirmation {
        to: String,
        user_name: String,
        plan_id: String,
    },
}

impl NotificationRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationRequest::CvEmail { .. } => "cv_email",
            NotificationRequest::PasswordReset { .. } => "password_reset",
            NotificationRequest::AdminNotification { .. } => "admin_notification",
            NotificationRequest::SubscriptionConfirmation { .. } => "subscription_confirmation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationOutcome {
    pub success: bool,
    pub message: String,
    pub demo: bool,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, request: NotificationRequest) -> NotificationOutcome;
}

pub struct DemoNotifier {
    admin_email: String,
    app_name: String,
}

impl DemoNotifier {
    pub fn new(admin_email: String, app_name: String) -> Self {
        Self {
            admin_email,
            app_name,
        }
    }
}

#[async_trait]
impl Notifier for DemoNotifier {
    async fn send(&self, request: NotificationRequest) -> NotificationOutcome {
        debug!("Sending {} notification (demo)", request.kind());
        let app = self.app_name.as_str();
        let message = match &request {
            NotificationRequest::CvEmail {
                to,
                user_name,
                cv_data,
                template_name,
            } => {
                info!(
                    "[{app}] would email CV for {user_name} to {to} (template {}, {} entries)",
                    template_name.as_deref().unwrap_or("none"),
                    cv_data.total_entries()
                );
                "CV sent successfully! (Demo Mode)"
            }
            NotificationRequest::PasswordReset { to } => {
                info!("[{app}] would send password reset email to {to}");
                "Password reset email sent! (Demo Mode)"
            }
            NotificationRequest::AdminNotification {
                request_id,
                user_email,
                status,
            } => {
                info!(
                    "[{app}] would notify {} that request {request_id} from {user_email} is {status}",
                    self.admin_email
                );
                "Admin notified successfully! (Demo Mode)"
            }
            NotificationRequest::SubscriptionConfirmation {
                to,
                user_name,
                plan_id,
            } => {
                info!("[{app}] would confirm {plan_id} subscription to {user_name} <{to}>");
                "Subscription confirmation sent! (Demo Mode)"
            }
        };

        NotificationOutcome {
            success: true,
            message: message.to_string(),
            demo: true,
        }
    }
}
