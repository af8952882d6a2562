use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by document mutations. These are caller mistakes and are
/// surfaced as-is; they never trigger the storage fallback.
#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("{section} fields must be a JSON object")]
    NotAnObject { section: &'static str },

    #[error("unknown field '{field}' for {section}")]
    UnknownField { section: &'static str, field: String },

    #[error("invalid {section} fields: {reason}")]
    InvalidFields { section: &'static str, reason: String },

    #[error("{section} entry '{id}' not found")]
    EntryNotFound { section: &'static str, id: String },

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template '{0}' requires a premium subscription")]
    TemplateLocked(String),

    #[error("malformed CV file: {0}")]
    MalformedImport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Experience,
    Education,
    Skills,
    Languages,
    Certifications,
    Projects,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Experience,
        Section::Education,
        Section::Skills,
        Section::Languages,
        Section::Certifications,
        Section::Projects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Skills => "skills",
            Section::Languages => "languages",
            Section::Certifications => "certifications",
            Section::Projects => "projects",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub linkedin: String,
    pub website: String,
    pub summary: String,
}

/// Partial update for [`PersonalInfo`]; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PersonalInfoPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
    pub summary: Option<String>,
}

impl PersonalInfoPatch {
    pub fn apply(self, info: &mut PersonalInfo) {
        let PersonalInfoPatch {
            full_name,
            email,
            phone,
            address,
            linkedin,
            website,
            summary,
        } = self;
        let targets = [
            (full_name, &mut info.full_name),
            (email, &mut info.email),
            (phone, &mut info.phone),
            (address, &mut info.address),
            (linkedin, &mut info.linkedin),
            (website, &mut info.website),
            (summary, &mut info.summary),
        ];
        for (value, slot) in targets {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceEntry {
    pub id: String,
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub start_date: String,
    pub end_date: String,
    pub gpa: String,
    pub current: bool,
}

/// Shared shape of skills and languages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeveledEntry {
    pub id: String,
    pub name: String,
    pub level: String,
}

impl Default for LeveledEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            level: "Intermediate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificationEntry {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub date: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub technologies: String,
    pub start_date: String,
    pub end_date: String,
    pub link: String,
}

/// An entry living in one of the ordered CV lists.
pub trait SectionEntry: Serialize + DeserializeOwned {
    /// Wire names a caller may set. `id` is assigned by the editor and never
    /// accepted from input.
    const FIELDS: &'static [&'static str];

    fn id(&self) -> &str;
}

impl SectionEntry for ExperienceEntry {
    const FIELDS: &'static [&'static str] = &[
        "company",
        "position",
        "startDate",
        "endDate",
        "current",
        "description",
    ];

    fn id(&self) -> &str {
        &self.id
    }
}

impl SectionEntry for EducationEntry {
    const FIELDS: &'static [&'static str] = &[
        "institution",
        "degree",
        "field",
        "startDate",
        "endDate",
        "gpa",
        "current",
    ];

    fn id(&self) -> &str {
        &self.id
    }
}

impl SectionEntry for LeveledEntry {
    const FIELDS: &'static [&'static str] = &["name", "level"];

    fn id(&self) -> &str {
        &self.id
    }
}

impl SectionEntry for CertificationEntry {
    const FIELDS: &'static [&'static str] = &["name", "issuer", "date", "link"];

    fn id(&self) -> &str {
        &self.id
    }
}

impl SectionEntry for ProjectEntry {
    const FIELDS: &'static [&'static str] = &[
        "name",
        "description",
        "technologies",
        "startDate",
        "endDate",
        "link",
    ];

    fn id(&self) -> &str {
        &self.id
    }
}

/// The complete résumé of one user.
///
/// Every top-level key is always present: missing keys in stored or imported
/// JSON deserialize to their empty defaults, and `CvDocument::default()` is the
/// all-empty skeleton used on logout and fresh load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvDocument {
    pub personal_info: PersonalInfo,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<LeveledEntry>,
    pub languages: Vec<LeveledEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub projects: Vec<ProjectEntry>,
}

macro_rules! on_section {
    ($doc:expr, $section:expr, $list:ident => $body:expr) => {
        match $section {
            Section::Experience => {
                let $list = &mut $doc.experience;
                $body
            }
            Section::Education => {
                let $list = &mut $doc.education;
                $body
            }
            Section::Skills => {
                let $list = &mut $doc.skills;
                $body
            }
            Section::Languages => {
                let $list = &mut $doc.languages;
                $body
            }
            Section::Certifications => {
                let $list = &mut $doc.certifications;
                $body
            }
            Section::Projects => {
                let $list = &mut $doc.projects;
                $body
            }
        }
    };
}

impl CvDocument {
    pub fn add_entry(
        &mut self,
        section: Section,
        id: String,
        fields: Value,
    ) -> Result<(), DocumentError> {
        on_section!(self, section, list => push_entry(list, section, id, fields))
    }

    pub fn update_entry(
        &mut self,
        section: Section,
        id: &str,
        patch: Value,
    ) -> Result<(), DocumentError> {
        on_section!(self, section, list => patch_entry(list, section, id, patch))
    }

    pub fn remove_entry(&mut self, section: Section, id: &str) -> Result<(), DocumentError> {
        on_section!(self, section, list => drop_entry(list, section, id))
    }

    pub fn entry_count(&self, section: Section) -> usize {
        match section {
            Section::Experience => self.experience.len(),
            Section::Education => self.education.len(),
            Section::Skills => self.skills.len(),
            Section::Languages => self.languages.len(),
            Section::Certifications => self.certifications.len(),
            Section::Projects => self.projects.len(),
        }
    }

    pub fn total_entries(&self) -> usize {
        Section::ALL.iter().map(|s| self.entry_count(*s)).sum()
    }

    pub fn entry_ids(&self, section: Section) -> Vec<&str> {
        match section {
            Section::Experience => ids_of(&self.experience),
            Section::Education => ids_of(&self.education),
            Section::Skills => ids_of(&self.skills),
            Section::Languages => ids_of(&self.languages),
            Section::Certifications => ids_of(&self.certifications),
            Section::Projects => ids_of(&self.projects),
        }
    }

    pub fn all_entry_ids(&self) -> impl Iterator<Item = &str> {
        Section::ALL
            .into_iter()
            .flat_map(move |section| self.entry_ids(section))
    }
}

fn ids_of<T: SectionEntry>(list: &[T]) -> Vec<&str> {
    list.iter().map(SectionEntry::id).collect()
}

fn checked_fields<T: SectionEntry>(
    section: Section,
    fields: Value,
) -> Result<Map<String, Value>, DocumentError> {
    let Value::Object(map) = fields else {
        return Err(DocumentError::NotAnObject {
            section: section.as_str(),
        });
    };
    if let Some(unknown) = map.keys().find(|k| !T::FIELDS.contains(&k.as_str())) {
        return Err(DocumentError::UnknownField {
            section: section.as_str(),
            field: unknown.clone(),
        });
    }
    Ok(map)
}

fn decode_entry<T: SectionEntry>(
    section: Section,
    map: Map<String, Value>,
) -> Result<T, DocumentError> {
    serde_json::from_value(Value::Object(map)).map_err(|e| DocumentError::InvalidFields {
        section: section.as_str(),
        reason: e.to_string(),
    })
}

fn push_entry<T: SectionEntry>(
    list: &mut Vec<T>,
    section: Section,
    id: String,
    fields: Value,
) -> Result<(), DocumentError> {
    let mut map = checked_fields::<T>(section, fields)?;
    map.insert("id".to_string(), Value::String(id));
    list.push(decode_entry(section, map)?);
    Ok(())
}

fn patch_entry<T: SectionEntry>(
    list: &mut [T],
    section: Section,
    id: &str,
    patch: Value,
) -> Result<(), DocumentError> {
    let changes = checked_fields::<T>(section, patch)?;
    let slot = list
        .iter_mut()
        .find(|e| e.id() == id)
        .ok_or_else(|| DocumentError::EntryNotFound {
            section: section.as_str(),
            id: id.to_string(),
        })?;

    let mut merged = match serde_json::to_value(&*slot) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            return Err(DocumentError::InvalidFields {
                section: section.as_str(),
                reason: "stored entry is not an object".to_string(),
            })
        }
    };
    merged.extend(changes);
    *slot = decode_entry(section, merged)?;
    Ok(())
}

fn drop_entry<T: SectionEntry>(
    list: &mut Vec<T>,
    section: Section,
    id: &str,
) -> Result<(), DocumentError> {
    let before = list.len();
    list.retain(|e| e.id() != id);
    if list.len() == before {
        return Err(DocumentError::EntryNotFound {
            section: section.as_str(),
            id: id.to_string(),
        });
    }
    Ok(())
}
