// Prompts for email interpretation.

/// Extraction prompt. Replace `{email_text}` before sending.
pub const INTERPRET_PROMPT_TEMPLATE: &str = r#"You are reading a job-related email sent by a recruiter or HR staff member.
Extract the job request it contains.

Return a JSON object with this EXACT schema (use null or [] when the email does not say):
{
  "job_title": "Backend Engineer",
  "company": "TechCorp",
  "skills": ["Python", "SQL"],
  "deadline": "Friday",
  "action_needed": "send resume and cover letter",
  "request_type": "resume_and_cover_letter",
  "experience_level": "mid",
  "user_id": null,
  "find_best_candidate": false
}

Rules:
- request_type is one of "resume_only", "resume_and_cover_letter", "info_request".
  Use "resume_only" when only a resume/CV is requested, "info_request" when the sender
  asks questions but wants no documents, otherwise "resume_and_cover_letter".
- experience_level is one of "entry", "junior", "mid", "senior", "lead", "expert" or null.
- skills lists required and preferred skills, each as a short noun phrase.
- find_best_candidate is true only if the sender asks us to pick the most suitable person.
- user_id is set only if the email names a profile id explicitly.

EMAIL:
{email_text}"#;
