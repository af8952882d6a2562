use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cv::document::{CvDocument, DocumentError};
use crate::cv::templates::find_template;
use crate::persistence::CvSnapshot;

pub const EXPORT_VERSION: &str = "1.0";

/// File format written by "export" and accepted by "import".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvExport {
    pub cv_data: CvDocument,
    pub selected_template: Option<String>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

impl CvExport {
    pub fn from_snapshot(snapshot: &CvSnapshot, exported_at: DateTime<Utc>) -> Self {
        Self {
            cv_data: snapshot.document.clone(),
            selected_template: snapshot.selected_template.clone(),
            exported_at,
            version: EXPORT_VERSION.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("cv-data-{}.json", self.exported_at.format("%Y-%m-%d"))
    }
}

/// Parses an imported file. Accepts the export envelope as well as a bare
/// document (files saved before the envelope existed). A template may be given
/// by id or as a full descriptor object carrying an `id`.
pub fn parse_import(raw: Value) -> Result<CvSnapshot, DocumentError> {
    let Value::Object(mut map) = raw else {
        return Err(DocumentError::MalformedImport(
            "expected a JSON object".to_string(),
        ));
    };

    let template = map.remove("selectedTemplate");
    let document = match map.remove("cvData") {
        Some(cv_data) => cv_data,
        None => Value::Object(map),
    };
    let document: CvDocument = serde_json::from_value(document)
        .map_err(|e| DocumentError::MalformedImport(e.to_string()))?;

    let selected_template = match template {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id),
        Some(Value::Object(descriptor)) => match descriptor.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            _ => {
                return Err(DocumentError::MalformedImport(
                    "template descriptor has no id".to_string(),
                ))
            }
        },
        Some(other) => {
            return Err(DocumentError::MalformedImport(format!(
                "unexpected template value {other}"
            )))
        }
    };

    if let Some(id) = &selected_template {
        if find_template(id).is_none() {
            return Err(DocumentError::UnknownTemplate(id.clone()));
        }
    }

    Ok(CvSnapshot {
        document,
        selected_template,
    })
}
