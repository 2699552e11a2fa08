//! Gmail REST message resources and their conversion into `EmailRecord`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use crate::models::email::EmailRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub result_size_estimate: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    pub thread_id: Option<String>,
    /// Milliseconds since the epoch, sent as a string.
    pub internal_date: Option<String>,
    #[serde(default)]
    pub snippet: String,
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub id: String,
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub email_address: String,
}

impl MessagePart {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// First `text/plain` body found depth-first.
    fn plain_text(&self) -> Option<String> {
        if self.mime_type.eq_ignore_ascii_case("text/plain") {
            if let Some(text) = self
                .body
                .as_ref()
                .and_then(|b| b.data.as_deref())
                .and_then(decode_body)
            {
                return Some(text);
            }
        }
        self.parts.iter().find_map(MessagePart::plain_text)
    }
}

/// Decodes Gmail's URL-safe base64. Padding is optional in practice.
pub fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

impl GmailMessage {
    pub fn into_record(self) -> EmailRecord {
        let payload = self.payload.unwrap_or_default();

        let subject = payload
            .header("Subject")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("No Subject")
            .to_string();
        let sender = payload.header("From").unwrap_or("Unknown").to_string();
        let date = payload.header("Date").map(str::to_string);
        let message_id_header = payload.header("Message-ID").map(str::to_string);

        let body = match payload.plain_text() {
            Some(text) => text,
            None => {
                debug!("Message {} has no text/plain part, using snippet", self.id);
                self.snippet.clone()
            }
        };

        let timestamp = self
            .internal_date
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);

        EmailRecord {
            id: self.id,
            thread_id: self.thread_id,
            sender,
            subject,
            body,
            timestamp,
            date,
            message_id_header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text)
    }

    #[test]
    fn test_multipart_message_prefers_plain_text() {
        let json = serde_json::json!({
            "id": "18f",
            "threadId": "t1",
            "internalDate": "1714564800000",
            "snippet": "We are hiring",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    {"name": "subject", "value": "Backend Engineer role"},
                    {"name": "From", "value": "HR <hr@corp.com>"},
                    {"name": "Message-ID", "value": "<abc@mail.corp.com>"}
                ],
                "parts": [
                    {"mimeType": "text/html", "body": {"data": encode("<p>html</p>")}},
                    {"mimeType": "text/plain", "body": {"data": encode("Please send your resume.")}}
                ]
            }
        });
        let message: GmailMessage = serde_json::from_value(json).unwrap();
        let record = message.into_record();

        assert_eq!(record.subject, "Backend Engineer role");
        assert_eq!(record.sender_address(), "hr@corp.com");
        assert_eq!(record.body, "Please send your resume.");
        assert_eq!(record.message_id_header.as_deref(), Some("<abc@mail.corp.com>"));
        assert_eq!(record.timestamp.unwrap().timestamp(), 1_714_564_800);
    }

    #[test]
    fn test_missing_headers_use_defaults_and_snippet() {
        let json = serde_json::json!({
            "id": "x",
            "snippet": "short preview",
            "payload": {"mimeType": "text/html", "headers": []}
        });
        let record = serde_json::from_value::<GmailMessage>(json)
            .unwrap()
            .into_record();

        assert_eq!(record.subject, "No Subject");
        assert_eq!(record.sender, "Unknown");
        assert_eq!(record.body, "short preview");
        assert!(record.timestamp.is_none());
    }

    #[test]
    fn test_decode_body_accepts_padding() {
        assert_eq!(decode_body("aGk=").as_deref(), Some("hi"));
        assert_eq!(decode_body("aGk").as_deref(), Some("hi"));
    }

    #[test]
    fn test_nested_parts_are_searched() {
        let json = serde_json::json!({
            "id": "n",
            "payload": {
                "mimeType": "multipart/mixed",
                "parts": [{
                    "mimeType": "multipart/alternative",
                    "parts": [{"mimeType": "text/plain", "body": {"data": encode("deep")}}]
                }]
            }
        });
        let record = serde_json::from_value::<GmailMessage>(json)
            .unwrap()
            .into_record();
        assert_eq!(record.body, "deep");
    }

    #[test]
    fn test_empty_list_response() {
        let list: MessageList = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
        assert!(list.messages.is_empty());
    }
}
