//! HTML templates for the resume and cover letter, filled by `{{key}}` substitution.
//!
//! Templates are compiled into the binary. Every value is escaped before substitution
//! except the section fragments built here from escaped parts.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::matching::matched_skills;
use crate::models::job::JobRequest;
use crate::models::profile::{CandidateProfile, ProfileEntry};

pub const RESUME_TEMPLATE: &str = include_str!("../../templates/resume.html");
pub const COVER_LETTER_TEMPLATE: &str = include_str!("../../templates/cover_letter.html");

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid regex"));

/// Single pass over the template, so substituted values are never re-expanded.
/// Unknown placeholders become empty.
pub fn process_template(template: &str, variables: &HashMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            variables.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn list_section(heading: &str, items: &[String], item_class: Option<&str>) -> String {
    if items.is_empty() {
        return String::new();
    }
    let class = item_class
        .map(|c| format!(" class=\"{c}\""))
        .unwrap_or_default();
    let lis: String = items
        .iter()
        .map(|item| format!("            <li{class}>{}</li>\n", escape_html(item)))
        .collect();
    format!(
        "    <div class=\"section\">\n        <h2>{}</h2>\n        <ul>\n{lis}        </ul>\n    </div>\n",
        escape_html(heading)
    )
}

fn summaries(entries: &[ProfileEntry]) -> Vec<String> {
    entries
        .iter()
        .map(ProfileEntry::summary)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Job skills the profile covers, in job order.
pub fn relevant_skills(profile: &CandidateProfile, job: &JobRequest) -> Vec<String> {
    matched_skills(job, profile)
}

pub fn render_resume(profile: &CandidateProfile, job: &JobRequest) -> String {
    let name = profile.display_name();
    let title = job.job_title.trim();

    let mut contact = format!(
        "        <strong>Email:</strong> {}<br>\n",
        escape_html(profile.email_or_empty())
    );
    if let Some(phone) = profile.phone.as_deref().filter(|p| !p.trim().is_empty()) {
        contact.push_str(&format!(
            "        <strong>Phone:</strong> {}<br>\n",
            escape_html(phone)
        ));
    }
    if !title.is_empty() {
        contact.push_str(&format!(
            "        <strong>Position Applied:</strong> <span class=\"highlight\">{}</span>\n",
            escape_html(title)
        ));
    }

    let mut sections = String::new();
    sections.push_str(&list_section("Education", &summaries(&profile.education), None));
    sections.push_str(&list_section("Experience", &summaries(&profile.experience), None));
    sections.push_str(&list_section("Skills", &profile.skills, None));
    if !title.is_empty() {
        sections.push_str(&list_section(
            &format!("Relevant Skills for {title}"),
            &relevant_skills(profile, job),
            Some("highlight"),
        ));
    }

    let variables = HashMap::from([
        ("name", escape_html(&name)),
        ("contact", contact.trim_end().to_string()),
        ("sections", sections.trim_end().to_string()),
    ]);
    process_template(RESUME_TEMPLATE, &variables)
}

/// `paragraphs` are plain text; each becomes one escaped `<p>`.
pub fn render_cover_letter(
    profile: &CandidateProfile,
    job: &JobRequest,
    paragraphs: &[String],
    date: &str,
) -> String {
    let mut contact = String::new();
    for line in [profile.email.as_deref(), profile.phone.as_deref()]
        .into_iter()
        .flatten()
        .filter(|l| !l.trim().is_empty())
    {
        contact.push_str(&format!("        {}<br>\n", escape_html(line)));
    }

    let recipient = match job.company.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(company) => format!(
            "    <div class=\"recipient\">\n        <strong>{}</strong><br>\n        Hiring Team<br>\n    </div>\n",
            escape_html(company)
        ),
        None => String::new(),
    };

    let body: String = paragraphs
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("        <p>{}</p>\n", escape_html(p.trim())))
        .collect();

    let variables = HashMap::from([
        ("name", escape_html(&profile.display_name())),
        ("contact", contact.trim_end().to_string()),
        ("date", escape_html(date)),
        ("recipient", recipient),
        ("job_title", escape_html(job.title_or("Position"))),
        ("body", body.trim_end().to_string()),
    ]);
    process_template(COVER_LETTER_TEMPLATE, &variables)
}

/// Built-in cover letter paragraphs used without an LLM, or when it fails.
pub fn fallback_cover_letter(profile: &CandidateProfile, job: &JobRequest) -> Vec<String> {
    let company = job
        .company
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or("your company");
    let education = summaries(&profile.education);
    let background = if education.is_empty() {
        "a relevant field".to_string()
    } else {
        education.join(", ")
    };

    let mut paragraphs = vec![
        "Dear Hiring Manager,".to_string(),
        format!(
            "I am writing to express my strong interest in the {} role at {company}.",
            job.title_or("position")
        ),
        format!(
            "With my background in {background}, I believe I would be a valuable addition to your team."
        ),
    ];
    let relevant = relevant_skills(profile, job);
    if !relevant.is_empty() {
        paragraphs.push(format!(
            "My experience with {} aligns closely with what this role requires.",
            relevant.join(", ")
        ));
    }
    paragraphs.push(
        "I look forward to discussing how my skills and experience can contribute to your organization's success."
            .to_string(),
    );
    paragraphs
}
