use crate::application::{
    CastVote, GetVoteStatus, ListBugs, ManageAnswer, ManageBug, PostAnswer, SubmitBug, ViewBug,
};
use crate::config::AppConfig;
use crate::infrastructure::auth::TokenVerifier;
use crate::infrastructure::db;
use crate::infrastructure::security::RateLimiter;
use crate::infrastructure::store::{DocumentStore, MemoryStore, PostgresStore};
use brosolve_errors::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub cast_vote: Arc<CastVote>,
    pub vote_status: Arc<GetVoteStatus>,
    pub submit_bug: Arc<SubmitBug>,
    pub post_answer: Arc<PostAnswer>,
    pub view_bug: Arc<ViewBug>,
    pub list_bugs: Arc<ListBugs>,
    pub manage_bug: Arc<ManageBug>,
    pub manage_answer: Arc<ManageAnswer>,
    pub store: DocumentStore,
}

impl AppContext {
    pub fn new(store: DocumentStore, verifier: TokenVerifier, rate_limiter: RateLimiter) -> Self {
        let verifier = Arc::new(verifier);
        Self {
            cast_vote: Arc::new(CastVote::new(store.clone(), verifier.clone(), rate_limiter)),
            vote_status: Arc::new(GetVoteStatus::new(store.clone(), verifier.clone())),
            submit_bug: Arc::new(SubmitBug::new(store.clone(), verifier.clone())),
            post_answer: Arc::new(PostAnswer::new(store.clone(), verifier.clone())),
            view_bug: Arc::new(ViewBug::new(store.clone())),
            list_bugs: Arc::new(ListBugs::new(store.clone())),
            manage_bug: Arc::new(ManageBug::new(store.clone(), verifier.clone())),
            manage_answer: Arc::new(ManageAnswer::new(store.clone(), verifier)),
            store,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let store: DocumentStore = match &config.database_url {
            Some(url) => {
                let conn = db::create_connection(url)
                    .await
                    .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;
                db::run_migrations(&conn)
                    .await
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                tracing::info!("Using Postgres document store");
                PostgresStore::new(conn)
                    .with_max_attempts(config.max_transaction_attempts)
                    .into()
            }
            None => {
                tracing::warn!("DATABASE_URL not set, votes are kept in memory only");
                MemoryStore::new()
                    .with_max_attempts(config.max_transaction_attempts)
                    .into()
            }
        };

        let verifier = TokenVerifier::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.issuer.as_deref(),
            config.auth.audience.as_deref(),
        );

        Ok(Self::new(store, verifier, RateLimiter::new(config.rate_limit)))
    }
}
