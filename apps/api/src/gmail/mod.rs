//! Gmail Reader and Sender — OAuth2 token handling plus the three REST calls the
//! responder needs (list, get, send).
//!
//! Handlers and the pipeline only see `Arc<dyn MailProvider>`, so tests swap in a
//! fake mailbox without touching the network.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::email::EmailRecord;

pub mod auth;
pub mod client;
pub mod handlers;
pub mod message;
pub mod mime;

pub use client::GmailClient;
pub use mime::{Attachment, OutgoingMessage};

#[derive(Debug, Error)]
pub enum GmailError {
    #[error("Gmail is not authorized: {0}")]
    NotAuthorized(String),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gmail API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Message {0} not found")]
    MessageNotFound(String),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credential file {path}: {source}")]
    Credentials {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot store token: {0}")]
    TokenStore(String),
}

impl GmailError {
    /// True when the fix is re-authorizing rather than retrying.
    pub fn is_auth(&self) -> bool {
        match self {
            GmailError::NotAuthorized(_)
            | GmailError::TokenRefresh(_)
            | GmailError::Credentials { .. } => true,
            GmailError::Api { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentMessage {
    pub id: String,
    pub thread_id: Option<String>,
}

/// The mailbox operations the responder uses. Implemented by `GmailClient`.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Address of the authorized account.
    async fn account_address(&self) -> Result<String, GmailError>;

    /// Most recent messages matching a Gmail search query, newest first.
    async fn list_recent(&self, query: &str, max_results: u32)
        -> Result<Vec<EmailRecord>, GmailError>;

    async fn get_message(&self, id: &str) -> Result<EmailRecord, GmailError>;

    async fn send(&self, message: &OutgoingMessage) -> Result<SentMessage, GmailError>;
}
