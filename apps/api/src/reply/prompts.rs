// Prompts for reply drafting.

pub const REPLY_SYSTEM: &str = "You are an expert at writing professional business emails. \
    Keep responses concise and professional.";

/// Replace: {profile_only}, {name}, {job_title}, {company}, {action_needed},
///          {recipient}, {attachments}
pub const REPLY_PROMPT_TEMPLATE: &str = r#"Write the body of a reply to a recruiter's email.

{profile_only}

You are replying on behalf of a candidate profile store, not as the candidate. For example:
"Dear <recipient>, please find the requested files attached."

DETAILS:
- Candidate: {name}
- Position: {job_title}
- Company: {company}
- Action requested: {action_needed}
- Recipient: {recipient}
- Attached: {attachments}

Requirements:
1. Professional and concise, 2-3 short paragraphs.
2. Thank them for reaching out.
3. Mention the attached documents if any are listed.
4. Plain text only. No subject line, no signature, no attachment list."#;
