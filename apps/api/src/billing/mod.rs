//! Subscription plans and the (demo) payment flow.
pub mod gateway;
pub mod handlers;
pub mod plans;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analytics::{self, AnalyticsEvent};
use crate::auth::identity::{Identity, ProfilePatch, SubscriptionTier};
use crate::auth::session::SessionManager;
use crate::billing::gateway::{Cancellation, GatewayStatus, PaymentGateway, PaymentReceipt};
use crate::billing::plans::{find_plan, tier_features, Feature};
use crate::errors::AppError;
use crate::notifications::{NotificationOutcome, NotificationRequest, Notifier};

#[derive(Debug, Serialize)]
pub struct UpgradeOutcome {
    pub receipt: PaymentReceipt,
    pub identity: Identity,
    pub confirmation: NotificationOutcome,
}

#[derive(Debug, Serialize)]
pub struct CancelOutcome {
    pub cancellation: Option<Cancellation>,
    pub identity: Identity,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionOverview {
    pub tier: SubscriptionTier,
    pub features: &'static [Feature],
    #[serde(flatten)]
    pub gateway: GatewayStatus,
}

/// Charges the plan, moves the profile to the plan's tier and sends the
/// confirmation email.
pub async fn upgrade(
    session: &SessionManager,
    payments: &dyn PaymentGateway,
    notifier: &dyn Notifier,
    plan_id: &str,
) -> Result<UpgradeOutcome, AppError> {
    let current = session.identity().ok_or(AppError::Unauthorized)?;
    let plan = find_plan(plan_id)
        .ok_or_else(|| AppError::Validation(format!("Invalid plan selected: {plan_id}")))?;
    if plan.tier == SubscriptionTier::Free {
        return Err(AppError::Validation(
            "the free plan needs no payment".to_string(),
        ));
    }

    let intent = payments
        .create_payment_intent(plan.id, &current.email)
        .await?;
    debug!("Payment intent {} created", intent.client_secret);
    let receipt = payments
        .process_subscription(plan.id, &current.email, &current.uid)
        .await?;
    let identity = session
        .update_profile(ProfilePatch::subscription(plan.tier))
        .await?;

    let confirmation = notifier
        .send(NotificationRequest::SubscriptionConfirmation {
            to: identity.email.clone(),
            user_name: identity.name.clone(),
            plan_id: plan.id.to_string(),
        })
        .await;
    if !confirmation.success {
        warn!(
            "Subscription confirmation for {} failed: {}",
            identity.uid, confirmation.message
        );
    }

    analytics::track(AnalyticsEvent::SubscriptionUpgraded {
        from_plan: current.subscription.as_str(),
        to_plan: plan.id,
        email: &identity.email,
    });
    info!("{} upgraded to {}", identity.uid, plan.id);

    Ok(UpgradeOutcome {
        receipt,
        identity,
        confirmation,
    })
}

/// Cancels the active subscription, if the gateway knows of one, and drops
/// the profile back to the free tier.
pub async fn cancel(
    session: &SessionManager,
    payments: &dyn PaymentGateway,
) -> Result<CancelOutcome, AppError> {
    let current = session.identity().ok_or(AppError::Unauthorized)?;
    let status = payments.status(&current.uid).await?;
    let cancellation = match status.subscription_id {
        Some(subscription_id) => Some(payments.cancel(&subscription_id, &current.uid).await?),
        None => {
            debug!("No gateway subscription for {}", current.uid);
            None
        }
    };
    let identity = session
        .update_profile(ProfilePatch::subscription(SubscriptionTier::Free))
        .await?;
    info!("{} cancelled their subscription", identity.uid);
    Ok(CancelOutcome {
        cancellation,
        identity,
    })
}

pub async fn overview(
    session: &SessionManager,
    payments: &dyn PaymentGateway,
) -> Result<SubscriptionOverview, AppError> {
    let identity = session.identity().ok_or(AppError::Unauthorized)?;
    let gateway = payments.status(&identity.uid).await?;
    Ok(SubscriptionOverview {
        tier: identity.subscription,
        features: tier_features(identity.subscription),
        gateway,
    })
}
