use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// What the sender of an HR email is asking for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    ResumeOnly,
    #[default]
    ResumeAndCoverLetter,
    InfoRequest,
}

impl RequestType {
    pub fn wants_resume(self) -> bool {
        matches!(self, RequestType::ResumeOnly | RequestType::ResumeAndCoverLetter)
    }

    pub fn wants_cover_letter(self) -> bool {
        self == RequestType::ResumeAndCoverLetter
    }
}

/// Structured extraction of an email's job-related intent.
///
/// Every field is optional or empty-able: interpreters leave what they could not
/// find empty, and downstream stages work with whatever is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRequest {
    pub job_title: String,
    pub skills: BTreeSet<String>,
    pub request_type: RequestType,
    pub company: Option<String>,
    pub deadline: Option<String>,
    pub action_needed: Option<String>,
    /// entry / junior / mid / senior / lead / expert
    pub experience_level: Option<String>,
    /// Profile explicitly named by the email, if any.
    pub user_id: Option<String>,
    /// The sender wants us to pick the strongest profile.
    pub find_best_candidate: bool,
}

impl JobRequest {
    /// Title for prose, with a neutral stand-in when extraction found none.
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.job_title.trim().is_empty() {
            fallback
        } else {
            self.job_title.trim()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_request_json_round_trip() {
        let job = JobRequest {
            job_title: "Backend Engineer".to_string(),
            skills: ["Python", "SQL"].iter().map(|s| s.to_string()).collect(),
            request_type: RequestType::ResumeOnly,
            company: Some("TechCorp".to_string()),
            deadline: Some("Friday".to_string()),
            action_needed: Some("send resume".to_string()),
            experience_level: Some("senior".to_string()),
            user_id: None,
            find_best_candidate: true,
        };

        let json = serde_json::to_string(&job).unwrap();
        let recovered: JobRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, job);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let job: JobRequest = serde_json::from_str(r#"{"job_title": "Data Analyst"}"#).unwrap();
        assert_eq!(job.job_title, "Data Analyst");
        assert!(job.skills.is_empty());
        assert_eq!(job.request_type, RequestType::ResumeAndCoverLetter);
        assert!(!job.find_best_candidate);
    }

    #[test]
    fn test_request_type_serde_names() {
        let json = serde_json::to_string(&RequestType::InfoRequest).unwrap();
        assert_eq!(json, r#""info_request""#);
        let parsed: RequestType = serde_json::from_str(r#""resume_and_cover_letter""#).unwrap();
        assert_eq!(parsed, RequestType::ResumeAndCoverLetter);
    }

    #[test]
    fn test_request_type_document_needs() {
        assert!(RequestType::ResumeOnly.wants_resume());
        assert!(!RequestType::ResumeOnly.wants_cover_letter());
        assert!(RequestType::ResumeAndCoverLetter.wants_cover_letter());
        assert!(!RequestType::InfoRequest.wants_resume());
    }

    #[test]
    fn test_title_or_fallback() {
        let job = JobRequest::default();
        assert_eq!(job.title_or("position"), "position");
    }
}
