use std::sync::Arc;

use crate::config::Config;
use crate::documents::DocumentBuilder;
use crate::gmail::MailProvider;
use crate::interpreter::EmailInterpreter;
use crate::matching::CandidateScorer;
use crate::profiles::ProfileStore;
use crate::reply::ReplyComposer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Gmail in production, a fake mailbox in tests.
    pub mail: Arc<dyn MailProvider>,
    /// LLM extraction when `ANTHROPIC_API_KEY` is set, keyword rules otherwise.
    pub interpreter: Arc<dyn EmailInterpreter>,
    pub profiles: ProfileStore,
    /// Chosen by `MATCH_STRATEGY`.
    pub scorer: Arc<dyn CandidateScorer>,
    pub documents: DocumentBuilder,
    pub composer: ReplyComposer,
}
