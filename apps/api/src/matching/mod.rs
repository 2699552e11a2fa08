//! Candidate Matcher — pluggable, trait-based scoring of profiles against a `JobRequest`.
//!
//! Default: `WeightedScorer` (skills, experience and education blended 0.6 / 0.3 / 0.1).
//! Alternative: `OverlapScorer` (plain skill-set overlap).
//!
//! `AppState` holds an `Arc<dyn CandidateScorer>`, picked at startup from `MATCH_STRATEGY`.

use std::cmp::Ordering;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;

use crate::models::job::JobRequest;
use crate::models::profile::{normalize_skills, CandidateProfile, ProfileEntry};

pub mod handlers;

// ────────────────────────────────────────────────────────────────────────────
// Output data models (shared across all scorer backends)
// ────────────────────────────────────────────────────────────────────────────

/// Per-dimension scores, each 0.0 – 1.0. Dimensions a scorer does not use are absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub skills: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<f64>,
    /// Job skills the profile covers, in job order.
    pub matched_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// One ranked profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Implement this to swap scoring without touching handlers or the pipeline.
#[async_trait]
pub trait CandidateScorer: Send + Sync {
    async fn score(&self, job: &JobRequest, profile: &CandidateProfile) -> CandidateScore;

    /// "weighted" | "overlap", reported by the API.
    fn name(&self) -> &'static str;
}

/// Scores every profile and sorts by score descending, ties broken by user id ascending.
pub async fn rank_candidates(
    scorer: &dyn CandidateScorer,
    job: &JobRequest,
    profiles: &[CandidateProfile],
) -> Vec<MatchResult> {
    let mut results = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let CandidateScore { score, breakdown } = scorer.score(job, profile).await;
        results.push(MatchResult {
            user_id: profile.user_id.clone(),
            name: profile.display_name(),
            email: profile.email.clone(),
            score,
            breakdown,
        });
    }
    results.sort_by(compare_results);
    results
}

fn compare_results(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.user_id.cmp(&b.user_id))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn lower_skills<'a, I>(skills: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    normalize_skills(skills)
        .into_iter()
        .map(|s| s.to_lowercase())
        .collect()
}

/// Job skills (original spelling) found in the profile; substring match either way.
pub fn matched_skills(job: &JobRequest, profile: &CandidateProfile) -> Vec<String> {
    let candidate = lower_skills(&profile.skills);
    normalize_skills(&job.skills)
        .into_iter()
        .filter(|skill| {
            let needle = skill.to_lowercase();
            candidate
                .iter()
                .any(|c| c.contains(&needle) || needle.contains(c.as_str()))
        })
        .collect()
}

fn job_skill_count(job: &JobRequest) -> usize {
    normalize_skills(&job.skills).len()
}

// ────────────────────────────────────────────────────────────────────────────
// WeightedScorer — default
// ────────────────────────────────────────────────────────────────────────────

const SKILLS_WEIGHT: f64 = 0.6;
const EXPERIENCE_WEIGHT: f64 = 0.3;
const EDUCATION_WEIGHT: f64 = 0.1;

/// Level assumed when the email states none.
const DEFAULT_LEVEL: &str = "entry";

const HIGHER_EDUCATION_KEYWORDS: &[&str] = &[
    "bachelor",
    "master",
    "phd",
    "doctorate",
    "engineering",
    "computer science",
    "technology",
];

static YEARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:year|yr)").expect("valid regex"));

/// Accepted years-of-experience band per level, inclusive.
fn level_band(level: &str) -> Option<(f64, f64)> {
    match level {
        "entry" | "junior" => Some((0.0, 2.0)),
        "mid" | "intermediate" => Some((2.0, 5.0)),
        "senior" => Some((5.0, 10.0)),
        "lead" => Some((5.0, 15.0)),
        "expert" => Some((10.0, 20.0)),
        _ => None,
    }
}

/// Weighted blend of skills, experience and education.
///
/// - skills: share of job skills found in the profile
/// - experience: years stated in entries (else entry count) against the level band
/// - education: 0.5 base, +0.1 per job keyword found, +0.1 for a degree keyword
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedScorer;

impl WeightedScorer {
    pub fn skills_score(job: &JobRequest, matched: usize) -> f64 {
        let total = job_skill_count(job);
        if total == 0 {
            return 0.0;
        }
        round2(matched as f64 / total as f64)
    }

    pub fn experience_score(level: Option<&str>, experience: &[ProfileEntry]) -> f64 {
        let level = level
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

        if experience.is_empty() {
            return if level == "entry" { 0.1 } else { 0.0 };
        }

        let stated_years: u32 = experience
            .iter()
            .flat_map(|entry| {
                let text = entry.search_text();
                YEARS_RE
                    .captures_iter(&text)
                    .filter_map(|c| c[1].parse::<u32>().ok())
                    .collect::<Vec<_>>()
            })
            .sum();
        let years = if stated_years > 0 {
            stated_years as f64
        } else {
            experience.len() as f64
        };

        if let Some((min, max)) = level_band(&level) {
            return if years >= min && years <= max {
                1.0
            } else if years > max {
                0.8
            } else {
                round2((years / min.max(1.0) * 0.6).max(0.2))
            };
        }

        match years {
            y if y >= 5.0 => 0.9,
            y if y >= 2.0 => 0.7,
            y if y >= 1.0 => 0.5,
            _ => 0.3,
        }
    }

    pub fn education_score(job: &JobRequest, education: &[ProfileEntry]) -> f64 {
        if education.is_empty() {
            return 0.3;
        }
        let text = education
            .iter()
            .map(ProfileEntry::search_text)
            .collect::<Vec<_>>()
            .join(" ");

        let mut keywords: Vec<String> = Vec::new();
        if !job.job_title.trim().is_empty() {
            keywords.push(job.job_title.trim().to_lowercase());
        }
        if let Some(company) = job.company.as_deref().filter(|c| !c.trim().is_empty()) {
            keywords.push(company.trim().to_lowercase());
        }
        keywords.extend(lower_skills(&job.skills));

        let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
        let mut score = if hits > 0 {
            (0.5 + hits as f64 * 0.1).min(1.0)
        } else {
            0.5
        };
        if HIGHER_EDUCATION_KEYWORDS.iter().any(|k| text.contains(k)) {
            score = (score + 0.1).min(1.0);
        }
        round2(score)
    }
}

#[async_trait]
impl CandidateScorer for WeightedScorer {
    async fn score(&self, job: &JobRequest, profile: &CandidateProfile) -> CandidateScore {
        let matched = matched_skills(job, profile);
        let skills = Self::skills_score(job, matched.len());
        let experience =
            Self::experience_score(job.experience_level.as_deref(), &profile.experience);
        let education = Self::education_score(job, &profile.education);

        CandidateScore {
            score: round2(
                skills * SKILLS_WEIGHT + experience * EXPERIENCE_WEIGHT + education * EDUCATION_WEIGHT,
            ),
            breakdown: ScoreBreakdown {
                skills,
                experience: Some(experience),
                education: Some(education),
                matched_skills: matched,
            },
        }
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OverlapScorer
// ────────────────────────────────────────────────────────────────────────────

/// |job skills ∩ profile skills| / |job skills|, compared case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapScorer;

#[async_trait]
impl CandidateScorer for OverlapScorer {
    async fn score(&self, job: &JobRequest, profile: &CandidateProfile) -> CandidateScore {
        let candidate = lower_skills(&profile.skills);
        let matched: Vec<String> = normalize_skills(&job.skills)
            .into_iter()
            .filter(|s| candidate.contains(&s.to_lowercase()))
            .collect();
        let total = job_skill_count(job);
        let skills = if total == 0 {
            0.0
        } else {
            round2(matched.len() as f64 / total as f64)
        };

        CandidateScore {
            score: skills,
            breakdown: ScoreBreakdown {
                skills,
                experience: None,
                education: None,
                matched_skills: matched,
            },
        }
    }

    fn name(&self) -> &'static str {
        "overlap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, skills: &[&str]) -> JobRequest {
        JobRequest {
            job_title: title.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn profile(user_id: &str, skills: &[&str]) -> CandidateProfile {
        CandidateProfile {
            user_id: user_id.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn text_entries(items: &[&str]) -> Vec<ProfileEntry> {
        items
            .iter()
            .map(|s| ProfileEntry::Text(s.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_backend_job_ranks_python_sql_profile_first() {
        let job = job("Backend Engineer", &["Python", "SQL"]);
        let profiles = vec![
            profile("java_dev", &["Java"]),
            profile("py_dev", &["Python", "SQL", "Go"]),
        ];

        for scorer in [&WeightedScorer as &dyn CandidateScorer, &OverlapScorer] {
            let ranked = rank_candidates(scorer, &job, &profiles).await;
            assert_eq!(ranked[0].user_id, "py_dev", "scorer {}", scorer.name());
            assert!(ranked[0].score > ranked[1].score);
        }
    }

    #[tokio::test]
    async fn test_ties_break_on_user_id_ascending() {
        let job = job("Analyst", &["Excel"]);
        let profiles = vec![
            profile("zoe", &["Excel"]),
            profile("adam", &["Excel"]),
            profile("mia", &[]),
        ];
        let ranked = rank_candidates(&OverlapScorer, &job, &profiles).await;
        let ids: Vec<&str> = ranked.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["adam", "zoe", "mia"]);
    }

    #[tokio::test]
    async fn test_ranking_is_sorted_descending() {
        let job = job("Data Engineer", &["Python", "Spark", "SQL", "Kafka"]);
        let profiles = vec![
            profile("a", &["Python"]),
            profile("b", &["Python", "Spark", "SQL"]),
            profile("c", &[]),
            profile("d", &["Kafka", "SQL"]),
        ];
        let ranked = rank_candidates(&WeightedScorer, &job, &profiles).await;
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(ranked[0].user_id, "b");
    }

    #[tokio::test]
    async fn test_weighted_breakdown_values() {
        let job = job("Backend Engineer", &["Python", "SQL"]);
        let mut p = profile("p", &["python"]);
        p.education = text_entries(&["BSc Computer Science"]);
        p.experience = text_entries(&["Intern at Acme"]);

        let scored = WeightedScorer.score(&job, &p).await;
        assert_eq!(scored.breakdown.skills, 0.5);
        assert_eq!(scored.breakdown.experience, Some(1.0));
        assert_eq!(scored.breakdown.education, Some(0.6));
        assert_eq!(scored.breakdown.matched_skills, vec!["Python"]);
        // 0.5*0.6 + 1.0*0.3 + 0.6*0.1
        assert_eq!(scored.score, 0.66);
    }

    #[test]
    fn test_experience_score_uses_stated_years() {
        let entries = text_entries(&["Backend developer, 3 years", "Tech lead for 4 yrs"]);
        assert_eq!(WeightedScorer::experience_score(Some("senior"), &entries), 1.0);
        assert_eq!(WeightedScorer::experience_score(Some("junior"), &entries), 0.8);
        assert_eq!(WeightedScorer::experience_score(Some("expert"), &entries), 0.42);
    }

    #[test]
    fn test_experience_score_without_entries() {
        assert_eq!(WeightedScorer::experience_score(None, &[]), 0.1);
        assert_eq!(WeightedScorer::experience_score(Some("senior"), &[]), 0.0);
    }

    #[test]
    fn test_experience_score_unknown_level_uses_amount() {
        let entries = text_entries(&["Worked 6 years in retail"]);
        assert_eq!(WeightedScorer::experience_score(Some("staff"), &entries), 0.9);
    }

    #[test]
    fn test_education_score_defaults_and_cap() {
        let job = job("Engineer", &["Python", "SQL", "Go", "Rust", "Java"]);
        assert_eq!(WeightedScorer::education_score(&job, &[]), 0.3);

        let entries = text_entries(&[
            "Master of Engineering: python, sql, go, rust, java coursework",
        ]);
        assert_eq!(WeightedScorer::education_score(&job, &entries), 1.0);
    }

    #[tokio::test]
    async fn test_no_job_skills_scores_zero_skills() {
        let scored = OverlapScorer
            .score(&JobRequest::default(), &profile("x", &["Python"]))
            .await;
        assert_eq!(scored.score, 0.0);
    }
}
