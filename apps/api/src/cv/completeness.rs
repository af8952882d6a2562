use serde::{Deserialize, Serialize};

use crate::cv::document::{CvDocument, Section};
use crate::cv::templates::find_template;

const SUMMARY_MIN_CHARS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Missing,
    Optional,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Excellent,
    Good,
    KeepGoing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessItem {
    pub check: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub items: Vec<CompletenessItem>,
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub verdict: Verdict,
    pub message: String,
}

/// Scores a CV against the six required checks. Optional sections are listed
/// for information but never change the score.
pub fn compute_completeness_report(
    doc: &CvDocument,
    selected_template: Option<&str>,
) -> CompletenessReport {
    let mut items = Vec::new();
    let info = &doc.personal_info;

    let mut required = |check: &str, passed: bool, ok: String, missing: &str| {
        items.push(CompletenessItem {
            check: check.to_string(),
            status: if passed {
                CheckStatus::Passed
            } else {
                CheckStatus::Missing
            },
            message: if passed { ok } else { missing.to_string() },
        });
    };

    required(
        "personal_info",
        !info.full_name.is_empty() && !info.email.is_empty(),
        "Personal information complete".to_string(),
        "Personal information incomplete - add name and email",
    );
    required(
        "summary",
        info.summary.chars().count() > SUMMARY_MIN_CHARS,
        "Professional summary added".to_string(),
        "Add a professional summary (50+ characters)",
    );
    required(
        "experience",
        !doc.experience.is_empty(),
        format!("{} work experience(s) added", doc.experience.len()),
        "Add at least one work experience",
    );
    required(
        "education",
        !doc.education.is_empty(),
        format!("{} education entry(ies) added", doc.education.len()),
        "Add at least one education entry",
    );
    required(
        "skills",
        !doc.skills.is_empty(),
        format!("{} skill(s) added", doc.skills.len()),
        "Add relevant skills",
    );
    let template_name = selected_template.map(|id| find_template(id).map_or(id, |t| t.name));
    required(
        "template",
        template_name.is_some(),
        format!("Template \"{}\" selected", template_name.unwrap_or_default()),
        "Select a CV template",
    );

    let total = items.len();
    let score = items
        .iter()
        .filter(|i| i.status == CheckStatus::Passed)
        .count();

    for section in [Section::Languages, Section::Certifications, Section::Projects] {
        let count = doc.entry_count(section);
        if count > 0 {
            items.push(CompletenessItem {
                check: section.as_str().to_string(),
                status: CheckStatus::Optional,
                message: format!("{count} {} added (optional)", section.as_str()),
            });
        }
    }

    let percentage = ((score as f64 / total as f64) * 100.0).round() as u32;
    let (verdict, message) = match percentage {
        p if p >= 80 => (Verdict::Excellent, "Excellent! Your CV is well-structured"),
        p if p >= 60 => (Verdict::Good, "Good progress! Add a few more details"),
        _ => (
            Verdict::KeepGoing,
            "Keep going! Add more information to strengthen your CV",
        ),
    };

    CompletenessReport {
        items,
        score,
        total,
        percentage,
        verdict,
        message: message.to_string(),
    }
}
