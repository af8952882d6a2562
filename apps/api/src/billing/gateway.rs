use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::billing::plans::{find_plan, SubscriptionPlan};

#[derive(Debug, Error, PartialEq)]
pub enum PaymentError {
    #[error("Invalid plan selected: {0}")]
    UnknownPlan(String),

    #[error("no active subscription '{0}'")]
    UnknownSubscription(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub amount: f64,
    pub demo: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub subscription_id: String,
    pub plan_id: String,
    pub amount: f64,
    pub message: String,
    pub demo: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cancellation {
    pub subscription_id: String,
    pub message: String,
    pub demo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayStatus {
    pub plan: String,
    pub subscription_id: Option<String>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        plan_id: &str,
        user_email: &str,
    ) -> Result<PaymentIntent, PaymentError>;

    async fn process_subscription(
        &self,
        plan_id: &str,
        user_email: &str,
        user_id: &str,
    ) -> Result<PaymentReceipt, PaymentError>;

    async fn cancel(
        &self,
        subscription_id: &str,
        user_id: &str,
    ) -> Result<Cancellation, PaymentError>;

    async fn status(&self, user_id: &str) -> Result<GatewayStatus, PaymentError>;
}

fn plan(plan_id: &str) -> Result<&'static SubscriptionPlan, PaymentError> {
    find_plan(plan_id).ok_or_else(|| PaymentError::UnknownPlan(plan_id.to_string()))
}

/// Accepts every payment and issues `demo_` identifiers. Subscriptions live in
/// memory only.
#[derive(Default)]
pub struct DemoPaymentGateway {
    subscriptions: Mutex<HashMap<String, (String, &'static str)>>,
}

impl DemoPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for DemoPaymentGateway {
    async fn create_payment_intent(
        &self,
        plan_id: &str,
        user_email: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let plan = plan(plan_id)?;
        info!("Demo payment intent for {user_email} on {}", plan.id);
        Ok(PaymentIntent {
            client_secret: format!("demo_client_secret_{}", Utc::now().timestamp_millis()),
            amount: plan.price,
            demo: true,
        })
    }

    async fn process_subscription(
        &self,
        plan_id: &str,
        user_email: &str,
        user_id: &str,
    ) -> Result<PaymentReceipt, PaymentError> {
        let plan = plan(plan_id)?;
        let subscription_id = format!("demo_sub_{}", Utc::now().timestamp_millis());
        self.subscriptions
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(user_id.to_string(), (subscription_id.clone(), plan.id));
        info!(
            "Demo payment of {:.2} for {} by {user_email}",
            plan.price, plan.id
        );
        Ok(PaymentReceipt {
            subscription_id,
            plan_id: plan.id.to_string(),
            amount: plan.price,
            message: "Payment successful! Your subscription is now active. (Demo Mode)"
                .to_string(),
            demo: true,
        })
    }

    async fn cancel(
        &self,
        subscription_id: &str,
        user_id: &str,
    ) -> Result<Cancellation, PaymentError> {
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|p| p.into_inner());
        let is_active = subscriptions
            .get(user_id)
            .is_some_and(|(active, _)| active == subscription_id);
        if !is_active {
            return Err(PaymentError::UnknownSubscription(
                subscription_id.to_string(),
            ));
        }
        subscriptions.remove(user_id);
        info!("Demo subscription {subscription_id} cancelled for {user_id}");
        Ok(Cancellation {
            subscription_id: subscription_id.to_string(),
            message: "Subscription cancelled successfully. (Demo Mode)".to_string(),
            demo: true,
        })
    }

    async fn status(&self, user_id: &str) -> Result<GatewayStatus, PaymentError> {
        let subscriptions = self.subscriptions.lock().unwrap_or_else(|p| p.into_inner());
        Ok(match subscriptions.get(user_id) {
            Some((subscription_id, plan_id)) => GatewayStatus {
                plan: plan_id.to_string(),
                subscription_id: Some(subscription_id.clone()),
                active: true,
                expires_at: None,
            },
            None => GatewayStatus {
                plan: "free".to_string(),
                subscription_id: None,
                active: true,
                expires_at: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_plan_is_rejected() {
        let gateway = DemoPaymentGateway::new();
        assert_eq!(
            gateway
                .process_subscription("gold", "a@b.co", "u1")
                .await
                .unwrap_err(),
            PaymentError::UnknownPlan("gold".into())
        );
        assert!(gateway.create_payment_intent("gold", "a@b.co").await.is_err());
    }

    #[tokio::test]
    async fn test_demo_subscription_lifecycle() {
        let gateway = DemoPaymentGateway::new();
        assert_eq!(gateway.status("u1").await.unwrap().plan, "free");

        let receipt = gateway
            .process_subscription("premium_monthly", "a@b.co", "u1")
            .await
            .unwrap();
        assert!(receipt.demo);
        assert!(receipt.subscription_id.starts_with("demo_sub_"));
        assert_eq!(receipt.amount, 9.99);

        let status = gateway.status("u1").await.unwrap();
        assert_eq!(status.plan, "premium_monthly");
        assert_eq!(status.subscription_id.as_deref(), Some(receipt.subscription_id.as_str()));

        let cancellation = gateway.cancel(&receipt.subscription_id, "u1").await.unwrap();
        assert!(cancellation.demo);
        assert_eq!(gateway.status("u1").await.unwrap().plan, "free");
    }

    #[tokio::test]
    async fn test_cancel_unknown_subscription_fails() {
        let gateway = DemoPaymentGateway::new();
        assert!(matches!(
            gateway.cancel("demo_sub_1", "u1").await,
            Err(PaymentError::UnknownSubscription(_))
        ));
    }

    #[tokio::test]
    async fn test_payment_intent_carries_plan_price() {
        let intent = DemoPaymentGateway::new()
            .create_payment_intent("premium_yearly", "a@b.co")
            .await
            .unwrap();
        assert_eq!(intent.amount, 99.99);
        assert!(intent.client_secret.starts_with("demo_client_secret_"));
    }
}
