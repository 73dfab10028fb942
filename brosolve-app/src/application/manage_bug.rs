use super::submit_bug::non_blank;
use crate::domain::{Bug, UpdateBugRequest};
use crate::infrastructure::auth::TokenVerifier;
use crate::infrastructure::store::DocumentStore;
use brosolve_errors::AppError;
use std::sync::Arc;

/// Author-only edit and delete of a bug. Deleting also drops its answers and
/// every vote cast on the bug or its answers.
pub struct ManageBug {
    store: DocumentStore,
    verifier: Arc<TokenVerifier>,
}

impl ManageBug {
    pub fn new(store: DocumentStore, verifier: Arc<TokenVerifier>) -> Self {
        Self { store, verifier }
    }

    pub async fn update(
        &self,
        credential: Option<&str>,
        bug_id: &str,
        request: UpdateBugRequest,
    ) -> Result<Bug, AppError> {
        let caller = self.verifier.require(credential)?;

        let missing =
            || AppError::InvalidRequest("Title and description are required".to_string());
        let title = non_blank(request.title).ok_or_else(missing)?;
        let description = non_blank(request.description).ok_or_else(missing)?;
        let tags = request.tags.map(|t| t.into_tags()).unwrap_or_default();

        let mut bug = self.owned_bug(&caller, bug_id).await?;
        bug.title = title;
        bug.description = description;
        bug.tags = tags;
        bug.updated_at = Some(chrono::Utc::now());

        let bug = self.store.update_bug(&bug).await?;
        tracing::info!("Bug {} edited by {}", bug.id, caller);
        Ok(bug)
    }

    pub async fn delete(&self, credential: Option<&str>, bug_id: &str) -> Result<(), AppError> {
        let caller = self.verifier.require(credential)?;
        self.owned_bug(&caller, bug_id).await?;
        self.store.delete_bug(bug_id).await?;
        tracing::info!("Bug {} deleted by {}", bug_id, caller);
        Ok(())
    }

    async fn owned_bug(&self, caller: &str, bug_id: &str) -> Result<Bug, AppError> {
        let bug = self
            .store
            .find_bug(bug_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Bug".to_string()))?;
        if bug.created_by != caller {
            tracing::warn!("{} tried to modify bug {} owned by {}", caller, bug_id, bug.created_by);
            return Err(AppError::Forbidden(
                "Only the author can modify this bug".to_string(),
            ));
        }
        Ok(bug)
    }
}
