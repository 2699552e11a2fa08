// Prompts for cover letter writing.

pub const COVER_LETTER_SYSTEM: &str = "You are an expert cover letter writer. \
    Write professional, engaging cover letters that highlight the candidate's strengths.";

/// Replace: {profile_only}, {name}, {education}, {experience}, {skills},
///          {job_title}, {company}, {job_skills}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write the body of a cover letter for this job application.

{profile_only}

CANDIDATE:
- Name: {name}
- Education: {education}
- Experience: {experience}
- Skills: {skills}

JOB:
- Position: {job_title}
- Company: {company}
- Required skills: {job_skills}

Requirements:
1. Start with "Dear Hiring Manager," as its own paragraph, then write 3-4 paragraphs.
2. Be professional and enthusiastic.
3. Match the candidate's background to the job requirements.
4. Plain text only. Separate paragraphs with one blank line. No HTML, no markdown.
5. Do not include a closing or signature."#;
