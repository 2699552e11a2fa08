//! Rule-based interpretation: a skill vocabulary plus a handful of regexes for title,
//! company, deadline and intent. Always available, never fails.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::interpreter::EmailInterpreter;
use crate::models::job::{JobRequest, RequestType};

/// Known skills with their canonical spelling. `true` marks terms that are also common
/// English words and must match case-sensitively.
const SKILL_VOCABULARY: &[(&str, bool)] = &[
    ("Python", false),
    ("Java", false),
    ("JavaScript", false),
    ("TypeScript", false),
    ("Go", true),
    ("Golang", false),
    ("Rust", false),
    ("C++", false),
    ("C#", false),
    ("Ruby", false),
    ("PHP", false),
    ("Swift", false),
    ("Kotlin", false),
    ("Scala", false),
    ("SQL", false),
    ("PostgreSQL", false),
    ("MySQL", false),
    ("MongoDB", false),
    ("Redis", false),
    ("React", true),
    ("Angular", false),
    ("Vue", false),
    ("Node.js", false),
    ("Django", false),
    ("Flask", false),
    ("Spring Boot", false),
    ("AWS", false),
    ("Azure", false),
    ("GCP", false),
    ("Docker", false),
    ("Kubernetes", false),
    ("Terraform", false),
    ("Git", false),
    ("Linux", false),
    ("Machine Learning", false),
    ("Deep Learning", false),
    ("Data Analysis", false),
    ("Statistics", false),
    ("TensorFlow", false),
    ("PyTorch", false),
    ("Pandas", false),
    ("Excel", true),
    ("Tableau", false),
    ("Power BI", false),
    ("Spark", true),
    ("Kafka", false),
    ("GraphQL", false),
    ("REST", true),
    ("HTML", false),
    ("CSS", false),
    ("Figma", false),
    ("Agile", false),
    ("Scrum", false),
];

struct VocabularyTerm {
    canonical: &'static str,
    pattern: Regex,
}

static VOCABULARY: LazyLock<Vec<VocabularyTerm>> = LazyLock::new(|| {
    SKILL_VOCABULARY
        .iter()
        .map(|(term, case_sensitive)| {
            let flags = if *case_sensitive { "" } else { "(?i)" };
            // regex has no lookaround, so the neighbours are matched explicitly
            let pattern = format!(
                r"{flags}(?:^|[^A-Za-z0-9+#.])(?:{})(?:$|[^A-Za-z0-9+#])",
                regex::escape(term)
            );
            VocabularyTerm {
                canonical: term,
                pattern: Regex::new(&pattern).expect("valid regex"),
            }
        })
        .collect()
});

static SKILL_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:experience (?:with|in)|skills? (?:in|with)|knowledge of|proficien(?:t|cy) (?:in|with)|familiar(?:ity)? with|expertise in|background in)\s+([^.;:!?\n]+)",
    )
    .expect("valid regex")
});

static PHRASE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),|/|\band\b|\bor\b|&").expect("valid regex"));

static TITLE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:job title|position|role)\s*:\s*(.+?)\s*$").expect("valid regex")
});

static TITLE_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:for|about|regarding|as)\s+(?:the|our|a|an)\s+([A-Za-z][A-Za-z0-9+#/ .-]{1,60}?)\s+(?:position|role|opening|opportunity|vacancy)\b",
    )
    .expect("valid regex")
});

static TITLE_NOUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b((?:[A-Z][A-Za-z+#.]*\s+){0,3}(?:Engineer|Developer|Intern|Analyst|Scientist|Designer|Manager|Architect|Consultant|Administrator|Specialist))\b",
    )
    .expect("valid regex")
});

static COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:at|with|from)\s+([A-Z][A-Za-z0-9&-]*(?:\s+[A-Z][A-Za-z0-9&-]*){0,3})")
        .expect("valid regex")
});

static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:by|before|until|no later than|deadline(?:\s+is)?:?)\s+((?:(?:next|this)\s+)?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday|tomorrow|today|end of (?:the )?(?:day|week|month)|eod|eow|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?(?:,?\s+\d{4})?|\d{1,2}[/-]\d{1,2}(?:[/-]\d{2,4})?))",
    )
    .expect("valid regex")
});

static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // lead/principal/staff only count next to a role noun ("HR staff", "lead to" do not)
    Regex::new(
        r"(?i)\b(internship|intern|entry[- ]level|graduate|junior|mid[- ]level|intermediate|senior|tech lead|team lead|(?:lead|principal|staff) (?:engineer|developer|scientist|analyst|designer|architect)|expert)\b",
    )
    .expect("valid regex")
});

static YEARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\+?\s*(?:years?|yrs?)\b").expect("valid regex")
});

static USER_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\buser[ _-]?id\s*[:=]?\s*([A-Za-z0-9_.-]+)").expect("valid regex")
});

static CV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bcv\b").expect("valid regex"));

/// Companies never start with these; they are sentence words after "at"/"with"/"from".
const COMPANY_STOPWORDS: &[&str] = &[
    "The", "This", "That", "Our", "Your", "My", "We", "I", "You", "Best", "Regards",
];

const INFO_PHRASES: &[&str] = &[
    "more information",
    "more details",
    "tell us more",
    "tell me more",
    "your availability",
    "available for",
    "salary expectation",
    "notice period",
    "questions about",
    "a few questions",
    "learn more about you",
];

const BEST_CANDIDATE_PHRASES: &[&str] = &[
    "best candidate",
    "best fit",
    "best match",
    "most suitable",
    "strongest candidate",
    "top candidate",
    "ideal candidate",
    "suitable candidate",
];

const MAX_PHRASE_WORDS: usize = 3;
const MAX_PHRASE_LEN: usize = 30;

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordInterpreter;

#[async_trait]
impl EmailInterpreter for KeywordInterpreter {
    async fn interpret(&self, email_text: &str) -> JobRequest {
        interpret_text(email_text)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

pub fn interpret_text(text: &str) -> JobRequest {
    let lower = text.to_lowercase();
    let request_type = detect_request_type(&lower);

    JobRequest {
        job_title: extract_title(text).unwrap_or_default(),
        skills: extract_skills(text),
        request_type,
        company: extract_company(text),
        deadline: DEADLINE_RE
            .captures(text)
            .map(|c| c[1].trim().to_string()),
        action_needed: Some(action_for(request_type).to_string()),
        experience_level: extract_level(text),
        user_id: USER_ID_RE
            .captures(text)
            .map(|c| c[1].trim_end_matches('.').to_string())
            .filter(|id| !id.is_empty()),
        find_best_candidate: BEST_CANDIDATE_PHRASES.iter().any(|p| lower.contains(p)),
    }
}

pub fn action_for(request_type: RequestType) -> &'static str {
    match request_type {
        RequestType::ResumeOnly => "send resume",
        RequestType::ResumeAndCoverLetter => "send resume and cover letter",
        RequestType::InfoRequest => "provide information",
    }
}

fn detect_request_type(lower: &str) -> RequestType {
    let wants_cover = lower.contains("cover letter");
    let wants_resume = lower.contains("resume") || lower.contains("résumé") || CV_RE.is_match(lower);

    if wants_cover {
        RequestType::ResumeAndCoverLetter
    } else if wants_resume {
        RequestType::ResumeOnly
    } else if INFO_PHRASES.iter().any(|p| lower.contains(p)) {
        RequestType::InfoRequest
    } else {
        RequestType::default()
    }
}

/// Vocabulary hits first, in canonical spelling, then free phrases after cue words.
/// Duplicates are dropped case-insensitively.
pub fn extract_skills(text: &str) -> BTreeSet<String> {
    let mut seen = HashSet::new();
    let mut skills = BTreeSet::new();

    for term in VOCABULARY.iter() {
        if term.pattern.is_match(text) && seen.insert(term.canonical.to_lowercase()) {
            skills.insert(term.canonical.to_string());
        }
    }

    for caps in SKILL_PHRASE_RE.captures_iter(text) {
        for piece in PHRASE_SPLIT_RE.split(&caps[1]) {
            let Some(phrase) = clean_phrase(piece) else {
                continue;
            };
            if seen.insert(phrase.to_lowercase()) {
                skills.insert(phrase);
            }
        }
    }

    skills
}

fn clean_phrase(piece: &str) -> Option<String> {
    let mut phrase = piece
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .to_string();
    for prefix in ["the ", "a ", "an ", "strong ", "solid ", "good ", "some "] {
        if phrase.to_lowercase().starts_with(prefix) {
            if let Some(rest) = phrase.get(prefix.len()..) {
                phrase = rest.trim().to_string();
            }
        }
    }

    let words = phrase.split_whitespace().count();
    let lower = phrase.to_lowercase();
    let usable = words > 0
        && words <= MAX_PHRASE_WORDS
        && phrase.len() <= MAX_PHRASE_LEN
        && !lower.contains("year")
        && !lower.starts_with(|c: char| c.is_ascii_digit());
    if !usable {
        return None;
    }

    // Prefer the vocabulary spelling when the phrase is a known skill.
    let canonical = VOCABULARY
        .iter()
        .find(|t| t.canonical.eq_ignore_ascii_case(&phrase))
        .map(|t| t.canonical.to_string());
    Some(canonical.unwrap_or(phrase))
}

pub fn extract_title(text: &str) -> Option<String> {
    let found = TITLE_LABEL_RE
        .captures(text)
        .or_else(|| TITLE_PHRASE_RE.captures(text))
        .or_else(|| TITLE_NOUN_RE.captures(text))
        .map(|c| c[1].to_string())?;

    let title = found
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | '!' | ':'))
        .trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn extract_company(text: &str) -> Option<String> {
    COMPANY_RE.captures_iter(text).find_map(|caps| {
        let name = caps[1].trim().trim_end_matches('.').trim();
        let first = name.split_whitespace().next()?;
        if COMPANY_STOPWORDS.contains(&first) || TITLE_NOUN_RE.is_match(name) {
            return None;
        }
        Some(name.to_string())
    })
}

fn extract_level(text: &str) -> Option<String> {
    if let Some(caps) = LEVEL_RE.captures(text) {
        let word = caps[1].to_lowercase().replace(' ', "-");
        let level = match word.as_str() {
            "intern" | "internship" | "entry-level" | "graduate" => "entry",
            "junior" => "junior",
            "mid-level" | "intermediate" => "mid",
            "senior" => "senior",
            "expert" => "expert",
            _ => "lead",
        };
        return Some(level.to_string());
    }

    let years: u32 = YEARS_RE.captures(text)?[1].parse().ok()?;
    let level = match years {
        0..=1 => "entry",
        2..=4 => "mid",
        5..=9 => "senior",
        _ => "expert",
    };
    Some(level.to_string())
}
