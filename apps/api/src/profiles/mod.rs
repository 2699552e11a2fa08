//! Profile Store — candidate profiles as flat JSON files, `<profiles_dir>/<user_id>.json`.
//!
//! The store is read-only. Profiles are re-read on every call, so editing a file on
//! disk takes effect without restarting the dashboard.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::profile::CandidateProfile;

pub mod handlers;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile '{0}' not found")]
    NotFound(String),

    #[error("Invalid user id '{0}'")]
    InvalidId(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed profile {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillCount {
    pub skill: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileStats {
    pub total_profiles: usize,
    /// Profiles that pass `CandidateProfile::validate`.
    pub complete_profiles: usize,
    pub profiles_with_email: usize,
    pub unique_skills: usize,
    pub average_skills: f64,
    pub top_skills: Vec<SkillCount>,
}

const TOP_SKILLS: usize = 10;

#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, ProfileError> {
        if !is_valid_id(user_id) {
            return Err(ProfileError::InvalidId(user_id.to_string()));
        }
        Ok(self.dir.join(format!("{user_id}.json")))
    }

    pub async fn load(&self, user_id: &str) -> Result<CandidateProfile, ProfileError> {
        let path = self.path_for(user_id)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProfileError::NotFound(user_id.to_string()));
            }
            Err(source) => {
                return Err(ProfileError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let profile = parse_profile(&text, user_id, &path)?;
        debug!(
            "Loaded profile {user_id}: {} skills, {} experience entries",
            profile.skills.len(),
            profile.experience.len()
        );
        Ok(profile)
    }

    /// Every readable profile, sorted by user id. Malformed files are skipped.
    pub async fn list_all(&self) -> Result<Vec<CandidateProfile>, ProfileError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Profiles directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(ProfileError::Io {
                    path: self.dir.display().to_string(),
                    source,
                })
            }
        };

        let mut profiles = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|source| ProfileError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;
            let Some(entry) = entry else { break };

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_valid_id(stem) {
                continue;
            }
            match self.load(stem).await {
                Ok(profile) => profiles.push(profile),
                Err(e) => warn!("Skipping profile {}: {e}", path.display()),
            }
        }

        profiles.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(profiles)
    }

    pub async fn stats(&self) -> Result<ProfileStats, ProfileError> {
        Ok(compute_stats(&self.list_all().await?))
    }

    /// Case-insensitive substring search over id, name, email and skills.
    pub async fn search(&self, query: &str) -> Result<Vec<CandidateProfile>, ProfileError> {
        let needle = query.trim().to_lowercase();
        let profiles = self.list_all().await?;
        if needle.is_empty() {
            return Ok(profiles);
        }
        Ok(profiles
            .into_iter()
            .filter(|p| matches_query(p, &needle))
            .collect())
    }
}

/// Ids become file names, so only `[A-Za-z0-9_.-]` without path components.
pub(crate) fn is_valid_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && !user_id.starts_with('.')
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn parse_profile(text: &str, user_id: &str, path: &Path) -> Result<CandidateProfile, ProfileError> {
    let mut profile: CandidateProfile =
        serde_json::from_str(text).map_err(|source| ProfileError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    // The file name is the id every route loads by.
    if profile.user_id != user_id {
        if !profile.user_id.trim().is_empty() {
            warn!(
                "Profile {} declares user_id '{}'; using '{user_id}'",
                path.display(),
                profile.user_id
            );
        }
        profile.user_id = user_id.to_string();
    }
    Ok(profile)
}

fn matches_query(profile: &CandidateProfile, needle: &str) -> bool {
    profile.user_id.to_lowercase().contains(needle)
        || profile
            .name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(needle))
        || profile
            .email
            .as_deref()
            .is_some_and(|e| e.to_lowercase().contains(needle))
        || profile
            .skills
            .iter()
            .any(|s| s.to_lowercase().contains(needle))
}

fn compute_stats(profiles: &[CandidateProfile]) -> ProfileStats {
    // lowercase key -> (first spelling, count)
    let mut counts: HashMap<String, (String, usize)> = HashMap::new();
    for profile in profiles {
        for skill in &profile.skills {
            counts
                .entry(skill.to_lowercase())
                .or_insert_with(|| (skill.clone(), 0))
                .1 += 1;
        }
    }

    let mut top: Vec<SkillCount> = counts
        .values()
        .map(|(skill, count)| SkillCount {
            skill: skill.clone(),
            count: *count,
        })
        .collect();
    top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.skill.cmp(&b.skill)));
    top.truncate(TOP_SKILLS);

    let total_skills: usize = profiles.iter().map(|p| p.skills.len()).sum();
    let average_skills = if profiles.is_empty() {
        0.0
    } else {
        ((total_skills as f64 / profiles.len() as f64) * 10.0).round() / 10.0
    };

    ProfileStats {
        total_profiles: profiles.len(),
        complete_profiles: profiles.iter().filter(|p| p.validate().is_empty()).count(),
        profiles_with_email: profiles
            .iter()
            .filter(|p| p.email.as_deref().is_some_and(|e| !e.trim().is_empty()))
            .count(),
        unique_skills: counts.len(),
        average_skills,
        top_skills: top,
    }
}
