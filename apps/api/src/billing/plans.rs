use serde::Serialize;

use crate::auth::identity::SubscriptionTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanInterval {
    Forever,
    Month,
    Year,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub price: f64,
    pub interval: PlanInterval,
    pub tier: SubscriptionTier,
    pub features: &'static [&'static str],
}

const PREMIUM_FEATURES: &[&str] = &[
    "All 20+ Premium Templates",
    "Advanced CV Builder",
    "PDF Download",
    "Priority Email Support",
    "Custom Branding",
    "Multiple CV Formats",
    "ATS Optimization",
    "Cover Letter Builder",
    "LinkedIn Integration",
    "Unlimited Downloads",
];

pub const PLANS: &[SubscriptionPlan] = &[
    SubscriptionPlan {
        id: "free",
        name: "Free Plan",
        price: 0.0,
        interval: PlanInterval::Forever,
        tier: SubscriptionTier::Free,
        features: &[
            "2 Free CV Templates",
            "Basic CV Builder",
            "Email CV Delivery",
            "Community Support",
        ],
    },
    SubscriptionPlan {
        id: "premium_monthly",
        name: "Premium Plan (Monthly)",
        price: 9.99,
        interval: PlanInterval::Month,
        tier: SubscriptionTier::Premium,
        features: PREMIUM_FEATURES,
    },
    SubscriptionPlan {
        id: "premium_yearly",
        name: "Premium Plan (Yearly)",
        price: 99.99,
        interval: PlanInterval::Year,
        tier: SubscriptionTier::Premium,
        features: &[
            "All 20+ Premium Templates",
            "Advanced CV Builder",
            "PDF Download",
            "Priority Email Support",
            "Custom Branding",
            "Multiple CV Formats",
            "ATS Optimization",
            "Cover Letter Builder",
            "LinkedIn Integration",
            "Unlimited Downloads",
            "2 Months Free (Save $20)",
        ],
    },
];

pub fn find_plan(id: &str) -> Option<&'static SubscriptionPlan> {
    PLANS.iter().find(|p| p.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    BasicTemplates,
    EmailDelivery,
    AllTemplates,
    PdfDownload,
    AdvancedFeatures,
    PrioritySupport,
}

/// Features unlocked by a tier. Tiers do not inherit from one another.
pub fn tier_features(tier: SubscriptionTier) -> &'static [Feature] {
    match tier {
        SubscriptionTier::Free => &[Feature::BasicTemplates, Feature::EmailDelivery],
        SubscriptionTier::Premium => &[
            Feature::AllTemplates,
            Feature::PdfDownload,
            Feature::AdvancedFeatures,
            Feature::PrioritySupport,
        ],
    }
}

pub fn has_access(tier: SubscriptionTier, feature: Feature) -> bool {
    tier_features(tier).contains(&feature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_lookup() {
        let plan = find_plan("premium_yearly").unwrap();
        assert_eq!(plan.price, 99.99);
        assert_eq!(plan.interval, PlanInterval::Year);
        assert_eq!(plan.tier, SubscriptionTier::Premium);
        assert!(find_plan("enterprise").is_none());
    }

    #[test]
    fn test_feature_access() {
        assert!(has_access(SubscriptionTier::Free, Feature::EmailDelivery));
        assert!(!has_access(SubscriptionTier::Free, Feature::PdfDownload));
        assert!(has_access(SubscriptionTier::Premium, Feature::PdfDownload));
        // Premium does not list the free-tier features.
        assert!(!has_access(SubscriptionTier::Premium, Feature::BasicTemplates));
    }
}
