mod config;
mod documents;
mod errors;
mod files;
mod gmail;
mod interpreter;
mod llm_client;
mod matching;
mod models;
mod pipeline;
mod profiles;
mod reply;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, MatchStrategy, PdfBackend};
use crate::documents::pdf::PdfRenderer;
use crate::documents::{DisabledRenderer, DocumentBuilder, WkhtmltopdfRenderer};
use crate::gmail::GmailClient;
use crate::interpreter::{EmailInterpreter, KeywordInterpreter, LlmInterpreter};
use crate::llm_client::LlmClient;
use crate::matching::{CandidateScorer, OverlapScorer, WeightedScorer};
use crate::profiles::ProfileStore;
use crate::reply::ReplyComposer;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // `responder authorize` runs the one-time Gmail consent flow and exits.
    if std::env::args().nth(1).as_deref() == Some("authorize") {
        return gmail::auth::run_authorization(&config.credentials_path, &config.token_path).await;
    }

    info!("Starting HR email responder v{}", env!("CARGO_PKG_VERSION"));

    // LLM client is optional; every LLM stage has a non-LLM fallback
    let llm = match &config.anthropic_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(client)
        }
        None => {
            info!("ANTHROPIC_API_KEY not set, using keyword interpretation and built-in text");
            None
        }
    };

    let interpreter: Arc<dyn EmailInterpreter> = match &llm {
        Some(client) => Arc::new(LlmInterpreter::new(client.clone())),
        None => Arc::new(KeywordInterpreter),
    };

    let scorer: Arc<dyn CandidateScorer> = match config.match_strategy {
        MatchStrategy::Weighted => Arc::new(WeightedScorer),
        MatchStrategy::Overlap => Arc::new(OverlapScorer),
    };

    let renderer: Arc<dyn PdfRenderer> = match &config.pdf_backend {
        PdfBackend::Wkhtmltopdf(program) => Arc::new(WkhtmltopdfRenderer::new(program.clone())),
        PdfBackend::Disabled => Arc::new(DisabledRenderer),
    };

    if !config.token_path.exists() {
        warn!(
            "No Gmail token at {}; run `responder authorize` before reading mail",
            config.token_path.display()
        );
    }
    let mail = Arc::new(GmailClient::new(config.token_path.clone())?);

    info!(
        "Strategies: interpreter={}, scorer={}, pdf={}",
        interpreter.name(),
        scorer.name(),
        renderer.name()
    );
    info!(
        "Profiles from {}, documents to {}",
        config.profiles_dir.display(),
        config.output_dir.display()
    );

    let state = AppState {
        config: config.clone(),
        mail,
        interpreter,
        profiles: ProfileStore::new(config.profiles_dir.clone()),
        scorer,
        documents: DocumentBuilder::new(config.output_dir.clone(), renderer, llm.clone()),
        composer: ReplyComposer::new(llm),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
