use super::submit_bug::non_blank;
use crate::domain::{Answer, PostAnswerRequest};
use crate::infrastructure::auth::TokenVerifier;
use crate::infrastructure::store::DocumentStore;
use brosolve_errors::AppError;
use std::sync::Arc;

/// Author-only edit and delete of an answer, addressed under its bug.
pub struct ManageAnswer {
    store: DocumentStore,
    verifier: Arc<TokenVerifier>,
}

impl ManageAnswer {
    pub fn new(store: DocumentStore, verifier: Arc<TokenVerifier>) -> Self {
        Self { store, verifier }
    }

    pub async fn update(
        &self,
        credential: Option<&str>,
        bug_id: &str,
        answer_id: &str,
        request: PostAnswerRequest,
    ) -> Result<Answer, AppError> {
        let caller = self.verifier.require(credential)?;
        let content = non_blank(request.content)
            .ok_or_else(|| AppError::InvalidRequest("Answer content is required".to_string()))?;

        let mut answer = self.owned_answer(&caller, bug_id, answer_id).await?;
        answer.content = content;
        answer.updated_at = Some(chrono::Utc::now());

        let answer = self.store.update_answer(&answer).await?;
        tracing::info!("Answer {} on bug {} edited by {}", answer.id, bug_id, caller);
        Ok(answer)
    }

    pub async fn delete(
        &self,
        credential: Option<&str>,
        bug_id: &str,
        answer_id: &str,
    ) -> Result<(), AppError> {
        let caller = self.verifier.require(credential)?;
        self.owned_answer(&caller, bug_id, answer_id).await?;
        self.store.delete_answer(bug_id, answer_id).await?;
        tracing::info!("Answer {} on bug {} deleted by {}", answer_id, bug_id, caller);
        Ok(())
    }

    async fn owned_answer(
        &self,
        caller: &str,
        bug_id: &str,
        answer_id: &str,
    ) -> Result<Answer, AppError> {
        let answer = self
            .store
            .find_answer(bug_id, answer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Answer".to_string()))?;
        if answer.author_id != caller {
            return Err(AppError::Forbidden(
                "Only the author can modify this answer".to_string(),
            ));
        }
        Ok(answer)
    }
}
