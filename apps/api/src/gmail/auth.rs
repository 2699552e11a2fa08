//! OAuth2 for Gmail: Google's client-secret and authorized-user token files, access
//! token refresh, and the one-time installed-app authorization flow.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use axum::{extract::Query, extract::State, response::Html, routing::get, Router};
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::files::write_atomic;
use crate::gmail::GmailError;

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.readonly",
];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Refresh this long before the recorded expiry.
const EXPIRY_SKEW_SECS: i64 = 60;
const AUTHORIZATION_TIMEOUT: Duration = Duration::from_secs(300);

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Client secrets (credentials.json)
// ────────────────────────────────────────────────────────────────────────────

/// The OAuth client downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    #[serde(alias = "web")]
    installed: OAuthClientConfig,
}

impl OAuthClientConfig {
    pub async fn load(path: &Path) -> Result<Self, GmailError> {
        let text = read_file(path).await?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, GmailError> {
        serde_json::from_str::<ClientSecretsFile>(text)
            .map(|f| f.installed)
            .map_err(|source| GmailError::Credentials {
                path: path.display().to_string(),
                source,
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Authorized-user token (token.json)
// ────────────────────────────────────────────────────────────────────────────

/// Google's authorized-user JSON. Unknown keys are carried through untouched so the
/// file stays usable by other Google tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of the token endpoint for both code exchange and refresh.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

impl StoredToken {
    /// An access token without a recorded expiry is trusted until Gmail rejects it.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => true,
            (Some(_), Some(expiry)) => expiry - chrono::Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            (Some(_), None) => false,
        }
    }

    fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.token = Some(response.access_token);
        self.expiry = response
            .expires_in
            .map(|secs| now + chrono::Duration::seconds(secs));
        if let Some(refresh) = response.refresh_token {
            self.refresh_token = Some(refresh);
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

/// Owns the token file. Every read-refresh-write happens under one async mutex,
/// so concurrent requests never refresh twice or interleave writes.
pub struct TokenManager {
    path: PathBuf,
    http: Client,
    cached: Mutex<Option<StoredToken>>,
}

impl TokenManager {
    pub fn new(path: PathBuf, http: Client) -> Self {
        Self {
            path,
            http,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid access token, refreshing and persisting it first if needed.
    pub async fn access_token(&self) -> Result<String, GmailError> {
        let mut guard = self.cached.lock().await;

        if guard.is_none() {
            *guard = Some(load_token(&self.path).await?);
        }
        let Some(token) = guard.as_mut() else {
            return Err(GmailError::NotAuthorized("token unavailable".to_string()));
        };

        if token.needs_refresh(Utc::now()) {
            debug!("Access token expired or missing, refreshing");
            refresh(&self.http, token).await?;
            save_token(&self.path, token).await?;
            info!("Gmail access token refreshed");
        }

        token
            .token
            .clone()
            .ok_or_else(|| GmailError::NotAuthorized("token file has no access token".to_string()))
    }
}

async fn read_file(path: &Path) -> Result<String, GmailError> {
    tokio::fs::read_to_string(path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            GmailError::NotAuthorized(format!(
                "{} not found; run `responder authorize` first",
                path.display()
            ))
        } else {
            GmailError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    })
}

async fn load_token(path: &Path) -> Result<StoredToken, GmailError> {
    let text = read_file(path).await?;
    serde_json::from_str(&text).map_err(|source| GmailError::Credentials {
        path: path.display().to_string(),
        source,
    })
}

async fn save_token(path: &Path, token: &StoredToken) -> Result<(), GmailError> {
    let bytes =
        serde_json::to_vec_pretty(token).map_err(|e| GmailError::TokenStore(e.to_string()))?;
    write_atomic(path, bytes)
        .await
        .map_err(|e| GmailError::TokenStore(format!("{e:#}")))
}

async fn refresh(http: &Client, token: &mut StoredToken) -> Result<(), GmailError> {
    let Some(refresh_token) = token.refresh_token.clone() else {
        return Err(GmailError::NotAuthorized(
            "token expired and no refresh_token is stored; run `responder authorize`".to_string(),
        ));
    };

    let response = http
        .post(&token.token_uri)
        .form(&[
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Token refresh rejected ({status}): {body}");
        return Err(GmailError::TokenRefresh(format!("{status}: {body}")));
    }

    let parsed: TokenResponse = response.json().await?;
    token.apply(parsed, Utc::now());
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Installed-app authorization flow (`responder authorize`)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// Builds the consent URL the user opens in a browser.
pub fn authorization_url(
    client: &OAuthClientConfig,
    redirect_uri: &str,
    state: &str,
) -> anyhow::Result<Url> {
    let scope = SCOPES.join(" ");
    Url::parse_with_params(
        &client.auth_uri,
        &[
            ("client_id", client.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state),
        ],
    )
    .with_context(|| format!("Invalid auth_uri '{}'", client.auth_uri))
}

/// Runs the loopback authorization flow once and writes the token file.
pub async fn run_authorization(credentials_path: &Path, token_path: &Path) -> anyhow::Result<()> {
    let client = OAuthClientConfig::load(credentials_path).await?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());
    let state = uuid::Uuid::new_v4().simple().to_string();
    let url = authorization_url(&client, &redirect_uri, &state)?;

    info!("Open this URL in a browser to authorize Gmail access:\n\n{url}\n");

    let (tx, rx) = oneshot::channel();
    let sender: CallbackSender = Arc::new(Mutex::new(Some(tx)));
    let app = Router::new()
        .route("/", get(handle_callback))
        .with_state(sender);
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let params = tokio::time::timeout(AUTHORIZATION_TIMEOUT, rx).await;
    server.abort();
    let params = params
        .context("Timed out waiting for the authorization redirect")?
        .context("Authorization callback channel closed")?;

    if let Some(error) = params.error {
        bail!("Authorization was denied: {error}");
    }
    if params.state.as_deref() != Some(state.as_str()) {
        bail!("Authorization state mismatch; aborting");
    }
    let code = params.code.context("Redirect carried no authorization code")?;

    let http = Client::new();
    let response = http
        .post(&client.token_uri)
        .form(&[
            ("code", code.as_str()),
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Code exchange failed ({status}): {body}");
    }
    let parsed: TokenResponse = response.json().await?;

    let mut token = StoredToken {
        token: None,
        refresh_token: None,
        token_uri: client.token_uri.clone(),
        client_id: client.client_id.clone(),
        client_secret: client.client_secret.clone(),
        scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        expiry: None,
        extra: Map::new(),
    };
    token.apply(parsed, Utc::now());
    save_token(token_path, &token).await?;

    info!("Token written to {}", token_path.display());
    Ok(())
}

async fn handle_callback(
    State(sender): State<CallbackSender>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(params);
    }
    Html("<p>Authorization received. You can close this tab.</p>")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN_JSON: &str = r#"{
        "token": "ya29.old",
        "refresh_token": "1//refresh",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "cid.apps.googleusercontent.com",
        "client_secret": "secret",
        "scopes": ["https://www.googleapis.com/auth/gmail.send"],
        "universe_domain": "googleapis.com",
        "expiry": "2024-05-01T12:00:00.123456Z"
    }"#;

    #[test]
    fn test_token_file_parses_google_format_and_keeps_extra_keys() {
        let token: StoredToken = serde_json::from_str(TOKEN_JSON).unwrap();
        assert_eq!(token.token.as_deref(), Some("ya29.old"));
        assert_eq!(token.extra["universe_domain"], "googleapis.com");

        let written = serde_json::to_value(&token).unwrap();
        assert_eq!(written["universe_domain"], "googleapis.com");
        assert_eq!(written["refresh_token"], "1//refresh");
    }

    #[test]
    fn test_needs_refresh_respects_skew() {
        let token: StoredToken = serde_json::from_str(TOKEN_JSON).unwrap();
        let expiry = token.expiry.unwrap();

        assert!(!token.needs_refresh(expiry - chrono::Duration::seconds(120)));
        assert!(token.needs_refresh(expiry - chrono::Duration::seconds(30)));
        assert!(token.needs_refresh(expiry + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_missing_access_token_needs_refresh() {
        let mut token: StoredToken = serde_json::from_str(TOKEN_JSON).unwrap();
        token.token = None;
        token.expiry = None;
        assert!(token.needs_refresh(Utc::now()));
    }

    #[test]
    fn test_apply_refresh_keeps_refresh_token_when_not_rotated() {
        let mut token: StoredToken = serde_json::from_str(TOKEN_JSON).unwrap();
        let now = Utc::now();
        token.apply(
            TokenResponse {
                access_token: "ya29.new".to_string(),
                expires_in: Some(3599),
                refresh_token: None,
                scope: None,
            },
            now,
        );
        assert_eq!(token.token.as_deref(), Some("ya29.new"));
        assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(token.expiry, Some(now + chrono::Duration::seconds(3599)));
    }

    #[test]
    fn test_client_secrets_accept_installed_and_web() {
        let installed = r#"{"installed": {"client_id": "a", "client_secret": "b"}}"#;
        let web = r#"{"web": {"client_id": "c", "client_secret": "d",
            "token_uri": "https://example.test/token"}}"#;

        let a = OAuthClientConfig::parse(installed, Path::new("credentials.json")).unwrap();
        assert_eq!(a.token_uri, DEFAULT_TOKEN_URI);
        let b = OAuthClientConfig::parse(web, Path::new("credentials.json")).unwrap();
        assert_eq!(b.client_id, "c");
        assert_eq!(b.token_uri, "https://example.test/token");
    }

    #[test]
    fn test_authorization_url_carries_scopes_and_state() {
        let client = OAuthClientConfig {
            client_id: "cid".to_string(),
            client_secret: "s".to_string(),
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        };
        let url = authorization_url(&client, "http://127.0.0.1:5555", "xyz").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("state".to_string(), "xyz".to_string())));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
        let scope = pairs.iter().find(|(k, _)| k == "scope").unwrap();
        assert!(scope.1.contains("gmail.readonly"));
        assert!(scope.1.contains("gmail.send"));
    }

    #[tokio::test]
    async fn test_missing_token_file_is_not_authorized() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TokenManager::new(dir.path().join("token.json"), Client::new());

        let err = manager.access_token().await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_valid_token_is_served_from_file_without_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let mut token: StoredToken = serde_json::from_str(TOKEN_JSON).unwrap();
        token.expiry = Some(Utc::now() + chrono::Duration::hours(1));
        std::fs::write(&path, serde_json::to_string(&token).unwrap()).unwrap();

        let manager = TokenManager::new(path, Client::new());
        assert_eq!(manager.access_token().await.unwrap(), "ya29.old");
    }
}
