use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fetched Gmail message, reduced to what the pipeline needs.
/// Never mutated after the reader builds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    pub id: String,
    pub thread_id: Option<String>,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Raw `Date` header, kept for display when `internalDate` is missing.
    pub date: Option<String>,
    /// RFC 5322 `Message-ID`, used for `In-Reply-To` on the reply.
    pub message_id_header: Option<String>,
}

impl EmailRecord {
    /// Bare address from the `From` header: `"Jane <jane@corp.com>"` → `jane@corp.com`.
    pub fn sender_address(&self) -> &str {
        match (self.sender.rfind('<'), self.sender.rfind('>')) {
            (Some(start), Some(end)) if start < end => self.sender[start + 1..end].trim(),
            _ => self.sender.trim(),
        }
    }

    /// Display name from the `From` header, if there is one.
    pub fn sender_name(&self) -> Option<&str> {
        let start = self.sender.find('<')?;
        let name = self.sender[..start].trim().trim_matches('"').trim();
        (!name.is_empty()).then_some(name)
    }

    /// Subject and body joined so interpreters see title hints in the subject line.
    pub fn interpretable_text(&self) -> String {
        format!("Subject: {}\n\n{}", self.subject, self.body)
    }
}
