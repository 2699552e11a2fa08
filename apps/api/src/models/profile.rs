use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// An education or experience line. Profiles in the wild carry either free text
/// ("BSc Computer Science, 2021") or objects with arbitrary keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileEntry {
    Text(String),
    Detailed(Map<String, Value>),
}

/// Keys rendered first, in this order, when summarising a detailed entry.
const SUMMARY_KEYS: &[&str] = &[
    "title",
    "role",
    "position",
    "degree",
    "field",
    "company",
    "institution",
    "school",
    "organization",
    "duration",
    "dates",
    "year",
    "description",
];

impl ProfileEntry {
    /// One-line human rendering used in resumes and prompts.
    pub fn summary(&self) -> String {
        match self {
            ProfileEntry::Text(text) => text.trim().to_string(),
            ProfileEntry::Detailed(fields) => {
                let mut parts: Vec<String> = SUMMARY_KEYS
                    .iter()
                    .filter_map(|key| fields.get(*key).and_then(scalar_text))
                    .collect();
                if parts.is_empty() {
                    parts = fields.values().filter_map(scalar_text).collect();
                }
                parts.join(", ")
            }
        }
    }

    /// Lowercased text of every value, for keyword and year matching.
    pub fn search_text(&self) -> String {
        match self {
            ProfileEntry::Text(text) => text.to_lowercase(),
            ProfileEntry::Detailed(fields) => fields
                .values()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Stored record of a person's education, experience and skills.
/// Loaded read-only from `<profiles_dir>/<user_id>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateProfile {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(deserialize_with = "deserialize_entries")]
    pub education: Vec<ProfileEntry>,
    #[serde(deserialize_with = "deserialize_entries")]
    pub experience: Vec<ProfileEntry>,
    /// Unique case-insensitively, in file order.
    #[serde(deserialize_with = "deserialize_skills")]
    pub skills: Vec<String>,
}

impl CandidateProfile {
    /// `name`, or the user id turned into a title (`jane_doe` → `Jane Doe`).
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .user_id
                .split('_')
                .filter(|w| !w.is_empty())
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn email_or_empty(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }

    /// Returns a list of problems; an empty list means the profile is usable as-is.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.user_id.trim().is_empty() {
            errors.push("Missing required field: user_id".to_string());
        }
        if self.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            errors.push("Missing required field: name".to_string());
        }
        match self.email.as_deref().map(str::trim) {
            None | Some("") => errors.push("Missing required field: email".to_string()),
            Some(email) if !email.contains('@') => errors.push("Invalid email format".to_string()),
            Some(_) => {}
        }
        errors
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn deserialize_entries<'de, D>(deserializer: D) -> Result<Vec<ProfileEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if s.trim().is_empty() => None,
                Value::String(s) => Some(ProfileEntry::Text(s)),
                Value::Object(map) => Some(ProfileEntry::Detailed(map)),
                Value::Null => None,
                other => Some(ProfileEntry::Text(other.to_string())),
            })
            .collect(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::String(s)) => vec![ProfileEntry::Text(s)],
        Some(Value::Object(map)) => vec![ProfileEntry::Detailed(map)],
        Some(other) => vec![ProfileEntry::Text(other.to_string())],
    })
}

fn deserialize_skills<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let raw: Vec<String> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Object(map) => map.get("name").and_then(scalar_text),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
    };
    Ok(normalize_skills(raw))
}

/// Trims, drops empties and removes case-insensitive duplicates, keeping first spelling.
pub fn normalize_skills<I, S>(skills: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}
