use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Gmail search used when the dashboard lists recent HR mail.
pub const DEFAULT_GMAIL_QUERY: &str = "from:hr OR from:recruiter OR from:hiring \
    OR subject:job OR subject:interview OR subject:position";

/// Which candidate scorer backs `/api/v1/match` and the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Weighted,
    Overlap,
}

/// Which PDF backend the document builder uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfBackend {
    Wkhtmltopdf(PathBuf),
    Disabled,
}

/// Application configuration loaded from environment variables.
/// Everything has a default so the dashboard can start before Gmail is authorized.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub gmail_query: String,
    pub gmail_max_results: u32,
    pub profiles_dir: PathBuf,
    pub output_dir: PathBuf,
    pub default_user_id: String,
    pub anthropic_api_key: Option<String>,
    pub match_strategy: MatchStrategy,
    pub pdf_backend: PdfBackend,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let match_strategy = match env_or("MATCH_STRATEGY", "weighted").as_str() {
            "weighted" => MatchStrategy::Weighted,
            "overlap" => MatchStrategy::Overlap,
            other => bail!("MATCH_STRATEGY must be 'weighted' or 'overlap', got '{other}'"),
        };

        let pdf_backend = match env_or("PDF_RENDERER", "wkhtmltopdf").as_str() {
            "wkhtmltopdf" => {
                PdfBackend::Wkhtmltopdf(PathBuf::from(env_or("WKHTMLTOPDF_PATH", "wkhtmltopdf")))
            }
            "disabled" | "none" => PdfBackend::Disabled,
            other => bail!("PDF_RENDERER must be 'wkhtmltopdf' or 'disabled', got '{other}'"),
        };

        Ok(Config {
            port: env_or("PORT", "8000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            credentials_path: PathBuf::from(env_or("GMAIL_CREDENTIALS_PATH", "credentials.json")),
            token_path: PathBuf::from(env_or("GMAIL_TOKEN_PATH", "token.json")),
            gmail_query: env_or("GMAIL_QUERY", DEFAULT_GMAIL_QUERY),
            gmail_max_results: env_or("GMAIL_MAX_RESULTS", "5")
                .parse::<u32>()
                .context("GMAIL_MAX_RESULTS must be a positive integer")?,
            profiles_dir: PathBuf::from(env_or("PROFILES_DIR", "profiles")),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "outputs")),
            default_user_id: env_or("DEFAULT_USER_ID", "default_user"),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            match_strategy,
            pdf_backend,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
