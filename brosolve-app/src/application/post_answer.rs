use super::submit_bug::non_blank;
use crate::domain::{Answer, PostAnswerRequest};
use crate::infrastructure::auth::TokenVerifier;
use crate::infrastructure::store::DocumentStore;
use brosolve_errors::AppError;
use std::sync::Arc;

pub struct PostAnswer {
    store: DocumentStore,
    verifier: Arc<TokenVerifier>,
}

impl PostAnswer {
    pub fn new(store: DocumentStore, verifier: Arc<TokenVerifier>) -> Self {
        Self { store, verifier }
    }

    pub async fn execute(
        &self,
        credential: Option<&str>,
        bug_id: &str,
        request: PostAnswerRequest,
    ) -> Result<Answer, AppError> {
        let author_id = self.verifier.require(credential)?;
        let content = non_blank(request.content)
            .ok_or_else(|| AppError::InvalidRequest("Please enter an answer".to_string()))?;

        let answer = Answer::new(bug_id.to_string(), content, author_id);
        self.store.insert_answer(&answer).await?;

        tracing::info!("Answer {} posted on bug {}", answer.id, answer.bug_id);
        Ok(answer)
    }
}
