use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::gmail::auth::TokenManager;
use crate::gmail::message::{GmailMessage, MessageList, ProfileResponse, SendResponse};
use crate::gmail::{GmailError, MailProvider, OutgoingMessage, SentMessage};
use crate::models::email::EmailRecord;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Gmail REST client for the single authorized account.
pub struct GmailClient {
    http: Client,
    tokens: TokenManager,
    base_url: String,
}

impl GmailClient {
    pub fn new(token_path: PathBuf) -> Result<Self, GmailError> {
        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            tokens: TokenManager::new(token_path, http.clone()),
            http,
            base_url: GMAIL_API_BASE.to_string(),
        })
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<Response, GmailError> {
        let token = self.tokens.access_token().await?;
        Ok(request.bearer_auth(token).send().await?)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GmailError> {
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        Ok(response.json().await?)
    }
}

async fn api_error(status: StatusCode, response: Response) -> GmailError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    warn!("Gmail API returned {status}: {message}");
    GmailError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn account_address(&self) -> Result<String, GmailError> {
        let response = self
            .authorized(self.http.get(format!("{}/profile", self.base_url)))
            .await?;
        let profile: ProfileResponse = Self::read_json(response).await?;
        Ok(profile.email_address)
    }

    async fn list_recent(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<EmailRecord>, GmailError> {
        let max = max_results.to_string();
        let request = self
            .http
            .get(format!("{}/messages", self.base_url))
            .query(&[("q", query), ("maxResults", max.as_str())]);
        let list: MessageList = Self::read_json(self.authorized(request).await?).await?;
        debug!(
            "Gmail list returned {} ids (estimate {:?})",
            list.messages.len(),
            list.result_size_estimate
        );

        let mut records = Vec::with_capacity(list.messages.len());
        for reference in list.messages {
            records.push(self.get_message(&reference.id).await?);
        }
        info!("Fetched {} messages for query '{query}'", records.len());
        Ok(records)
    }

    async fn get_message(&self, id: &str) -> Result<EmailRecord, GmailError> {
        let request = self
            .http
            .get(format!("{}/messages/{id}", self.base_url))
            .query(&[("format", "full")]);
        let response = self.authorized(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GmailError::MessageNotFound(id.to_string()));
        }
        let message: GmailMessage = Self::read_json(response).await?;
        Ok(message.into_record())
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<SentMessage, GmailError> {
        let mut body = json!({ "raw": message.encode_raw() });
        if let Some(thread_id) = &message.thread_id {
            body["threadId"] = json!(thread_id);
        }

        let request = self
            .http
            .post(format!("{}/messages/send", self.base_url))
            .json(&body);
        let sent: SendResponse = Self::read_json(self.authorized(request).await?).await?;

        info!(
            "Sent reply to {} ({} attachments), id={}",
            message.to,
            message.attachments.len(),
            sent.id
        );
        Ok(SentMessage {
            id: sent.id,
            thread_id: sent.thread_id,
        })
    }
}
