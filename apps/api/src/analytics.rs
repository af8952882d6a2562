//! Product analytics.
//!
//! Events are structured `tracing` records on the `analytics` target, so any
//! subscriber layer can route them. Tracking cannot fail.
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInMethod {
    Email,
    Google,
}

impl SignInMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignInMethod::Email => "email",
            SignInMethod::Google => "google",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent<'a> {
    Registration {
        method: SignInMethod,
        email: &'a str,
    },
    Login {
        method: SignInMethod,
        email: &'a str,
    },
    TemplateSelected {
        template_id: &'a str,
        email: Option<&'a str>,
        subscription: &'a str,
    },
    CvExported {
        template_id: Option<&'a str>,
        email: Option<&'a str>,
    },
    CvEmailed {
        template_id: Option<&'a str>,
        email: &'a str,
        sections_completed: usize,
    },
    SubscriptionUpgraded {
        from_plan: &'a str,
        to_plan: &'a str,
        email: &'a str,
    },
    AdminAction {
        action: &'a str,
        admin_email: &'a str,
        target: &'a str,
    },
    Error {
        kind: &'a str,
        message: &'a str,
    },
}

impl AnalyticsEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::Registration { .. } => "user_registration",
            AnalyticsEvent::Login { .. } => "user_login",
            AnalyticsEvent::TemplateSelected { .. } => "template_selected",
            AnalyticsEvent::CvExported { .. } => "cv_exported",
            AnalyticsEvent::CvEmailed { .. } => "cv_completed",
            AnalyticsEvent::SubscriptionUpgraded { .. } => "subscription_upgraded",
            AnalyticsEvent::AdminAction { .. } => "admin_action",
            AnalyticsEvent::Error { .. } => "error_occurred",
        }
    }
}

pub fn track(event: AnalyticsEvent<'_>) {
    let name = event.name();
    match event {
        AnalyticsEvent::Registration { method, email }
        | AnalyticsEvent::Login { method, email } => {
            info!(target: "analytics", event = name, method = method.as_str(), user_email = email);
        }
        AnalyticsEvent::TemplateSelected {
            template_id,
            email,
            subscription,
        } => {
            info!(target: "analytics", event = name, template_id, user_email = email, subscription_type = subscription);
        }
        AnalyticsEvent::CvExported { template_id, email } => {
            info!(target: "analytics", event = name, template_id, user_email = email);
        }
        AnalyticsEvent::CvEmailed {
            template_id,
            email,
            sections_completed,
        } => {
            info!(target: "analytics", event = name, template_id, user_email = email, sections_completed);
        }
        AnalyticsEvent::SubscriptionUpgraded {
            from_plan,
            to_plan,
            email,
        } => {
            info!(target: "analytics", event = name, from_plan, to_plan, user_email = email);
        }
        AnalyticsEvent::AdminAction {
            action,
            admin_email,
            target,
        } => {
            info!(target: "analytics", event = name, action, admin_email, target_user = target);
        }
        AnalyticsEvent::Error { kind, message } => {
            info!(target: "analytics", event = name, error_type = kind, error_message = message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(
            AnalyticsEvent::Login {
                method: SignInMethod::Google,
                email: "a@b.c"
            }
            .name(),
            "user_login"
        );
        assert_eq!(
            AnalyticsEvent::Error {
                kind: "save",
                message: "offline"
            }
            .name(),
            "error_occurred"
        );
    }

    #[test]
    fn test_track_without_subscriber_is_a_no_op() {
        track(AnalyticsEvent::CvExported {
            template_id: None,
            email: None,
        });
    }
}
