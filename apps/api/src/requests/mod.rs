//! CV review requests submitted by users and triaged by admins.
pub mod handlers;
pub mod store;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::identity::{Identity, SubscriptionTier};
use crate::cv::document::CvDocument;
use crate::cv::templates::find_template;
use crate::persistence::CvSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "in_progress" => Ok(RequestStatus::InProgress),
            "completed" => Ok(RequestStatus::Completed),
            other => Err(format!("unknown request status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CvRequest {
    pub id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub template_id: Option<String>,
    pub template_name: Option<String>,
    pub subscription: SubscriptionTier,
    pub status: RequestStatus,
    pub cv_data: CvDocument,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A request as submitted; the store assigns id, status and timestamps.
#[derive(Debug, Clone)]
pub struct NewCvRequest {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub template_id: Option<String>,
    pub template_name: Option<String>,
    pub subscription: SubscriptionTier,
    pub cv_data: CvDocument,
}

impl NewCvRequest {
    pub fn from_session(identity: &Identity, snapshot: &CvSnapshot) -> Self {
        let template_id = snapshot.selected_template.clone();
        let template_name = template_id
            .as_deref()
            .and_then(find_template)
            .map(|t| t.name.to_string());
        Self {
            user_id: identity.uid.clone(),
            user_name: identity.name.clone(),
            user_email: identity.email.clone(),
            template_id,
            template_name,
            subscription: identity.subscription,
            cv_data: snapshot.document.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

pub fn status_counts(requests: &[CvRequest]) -> StatusCounts {
    requests
        .iter()
        .fold(StatusCounts::default(), |mut counts, request| {
            counts.all += 1;
            match request.status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::InProgress => counts.in_progress += 1,
                RequestStatus::Completed => counts.completed += 1,
            }
            counts
        })
}

/// Keeps requests matching `status` (all when `None`) whose requester name,
/// email or template name contains `query`, ignoring case.
pub fn filter_requests(
    requests: &[CvRequest],
    status: Option<RequestStatus>,
    query: &str,
) -> Vec<CvRequest> {
    let needle = query.trim().to_lowercase();
    requests
        .iter()
        .filter(|r| status.map_or(true, |s| r.status == s))
        .filter(|r| {
            needle.is_empty()
                || r.user_name.to_lowercase().contains(&needle)
                || r.user_email.to_lowercase().contains(&needle)
                || r
                    .template_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, template: Option<&str>, status: RequestStatus) -> CvRequest {
        let now = Utc::now();
        CvRequest {
            id: Uuid::new_v4(),
            user_id: name.to_lowercase(),
            user_name: name.into(),
            user_email: email.into(),
            template_id: None,
            template_name: template.map(str::to_string),
            subscription: SubscriptionTier::Free,
            status,
            cv_data: CvDocument::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Vec<CvRequest> {
        vec![
            request("John Doe", "john.doe@email.com", Some("Modern Professional"), RequestStatus::Pending),
            request("Jane Smith", "jane.smith@email.com", Some("Classic Executive"), RequestStatus::Completed),
            request("Mike Johnson", "mike@email.com", Some("Creative Portfolio"), RequestStatus::InProgress),
        ]
    }

    #[test]
    fn test_counts_per_status() {
        assert_eq!(
            status_counts(&sample()),
            StatusCounts {
                all: 3,
                pending: 1,
                in_progress: 1,
                completed: 1
            }
        );
    }

    #[test]
    fn test_filter_by_status() {
        let filtered = filter_requests(&sample(), Some(RequestStatus::Completed), "");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].user_name, "Jane Smith");
    }

    #[test]
    fn test_search_is_case_insensitive_over_name_email_and_template() {
        let requests = sample();
        assert_eq!(filter_requests(&requests, None, "JOHN").len(), 2);
        assert_eq!(filter_requests(&requests, None, "jane.smith@").len(), 1);
        assert_eq!(filter_requests(&requests, None, "portfolio").len(), 1);
        assert_eq!(filter_requests(&requests, None, "  ").len(), 3);
    }

    #[test]
    fn test_search_and_status_combine() {
        let filtered = filter_requests(&sample(), Some(RequestStatus::Pending), "jane");
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("in_progress".parse(), Ok(RequestStatus::InProgress));
        assert!("done".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_new_request_takes_template_name_from_catalog() {
        let identity = Identity::provisional(&crate::testing::handle("u1"));
        let snapshot = CvSnapshot {
            document: CvDocument::default(),
            selected_template: Some("classic".into()),
        };
        let new = NewCvRequest::from_session(&identity, &snapshot);
        assert_eq!(new.template_name.as_deref(), Some("Classic Executive"));
        assert_eq!(new.user_email, "u1@example.com");
    }
}
