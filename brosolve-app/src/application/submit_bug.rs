use crate::domain::{Bug, SubmitBugRequest};
use crate::infrastructure::auth::TokenVerifier;
use crate::infrastructure::store::DocumentStore;
use brosolve_errors::AppError;
use std::sync::Arc;

pub struct SubmitBug {
    store: DocumentStore,
    verifier: Arc<TokenVerifier>,
}

impl SubmitBug {
    pub fn new(store: DocumentStore, verifier: Arc<TokenVerifier>) -> Self {
        Self { store, verifier }
    }

    pub async fn execute(
        &self,
        credential: Option<&str>,
        request: SubmitBugRequest,
    ) -> Result<Bug, AppError> {
        let author_id = self.verifier.require(credential)?;

        let missing = || {
            AppError::InvalidRequest(
                "Missing required fields (title, description, or tags)".to_string(),
            )
        };
        let title = non_blank(request.title).ok_or_else(missing)?;
        let description = non_blank(request.description).ok_or_else(missing)?;
        let tags = request.tags.ok_or_else(missing)?.into_tags();
        if tags.is_empty() {
            return Err(missing());
        }

        let bug = Bug::new(title, description, tags, author_id);
        self.store.insert_bug(&bug).await?;

        tracing::info!("Bug {} submitted by {}", bug.id, bug.created_by);
        Ok(bug)
    }
}

pub(super) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
