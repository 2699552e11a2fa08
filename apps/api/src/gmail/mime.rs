//! RFC 5322 / MIME assembly for outgoing replies.

use std::fmt::Write;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use bytes::Bytes;

const LINE_WIDTH: usize = 76;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// A reply ready to hand to Gmail.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// `Message-ID` of the email being answered.
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
    pub thread_id: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl OutgoingMessage {
    /// Serializes the message. A plain body is sent as a single `text/plain` part;
    /// attachments switch the message to `multipart/mixed`.
    pub fn to_rfc5322(&self, boundary: &str) -> String {
        let mut message = String::new();

        let _ = writeln!(message, "To: {}\r", single_line(&self.to));
        let _ = writeln!(message, "Subject: {}\r", encode_header(&self.subject));
        if let Some(id) = &self.in_reply_to {
            let _ = writeln!(message, "In-Reply-To: {}\r", single_line(id));
            let references = self.references.as_deref().unwrap_or(id);
            let _ = writeln!(message, "References: {}\r", single_line(references));
        }
        message.push_str("MIME-Version: 1.0\r\n");

        if self.attachments.is_empty() {
            push_text_part(&mut message, &self.body);
            return message;
        }

        let _ = writeln!(
            message,
            "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r"
        );
        message.push_str("\r\n");

        let _ = writeln!(message, "--{boundary}\r");
        push_text_part(&mut message, &self.body);
        message.push_str("\r\n");

        for attachment in &self.attachments {
            let file_name = single_line(&attachment.file_name).replace('"', "'");
            let _ = writeln!(message, "--{boundary}\r");
            let _ = writeln!(
                message,
                "Content-Type: {}; name=\"{file_name}\"\r",
                single_line(&attachment.content_type)
            );
            message.push_str("Content-Transfer-Encoding: base64\r\n");
            let _ = writeln!(
                message,
                "Content-Disposition: attachment; filename=\"{file_name}\"\r"
            );
            message.push_str("\r\n");
            push_wrapped_base64(&mut message, &attachment.data);
        }
        let _ = writeln!(message, "--{boundary}--\r");

        message
    }

    /// URL-safe base64 of the whole message, as the `raw` field of `messages.send`.
    pub fn encode_raw(&self) -> String {
        let boundary = format!("responder_{}", uuid::Uuid::new_v4().simple());
        URL_SAFE.encode(self.to_rfc5322(&boundary))
    }
}

fn push_text_part(message: &mut String, body: &str) {
    message.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n");
    message.push_str("Content-Transfer-Encoding: base64\r\n");
    message.push_str("\r\n");
    push_wrapped_base64(message, body.as_bytes());
}

fn push_wrapped_base64(message: &mut String, data: &[u8]) {
    let encoded = STANDARD.encode(data);
    // base64 output is ASCII, so byte chunks are valid str boundaries
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        message.push_str(&String::from_utf8_lossy(chunk));
        message.push_str("\r\n");
    }
}

/// RFC 2047 encoded-word for header values that are not plain one-line ASCII.
fn encode_header(value: &str) -> String {
    if value.is_ascii() && !value.chars().any(breaks_header) {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

fn breaks_header(c: char) -> bool {
    c.is_control() && c != '\t'
}

/// Drops CR, LF and other control characters; tabs stay.
fn single_line(value: &str) -> String {
    value.chars().filter(|&c| !breaks_header(c)).collect()
}
