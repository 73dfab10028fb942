use crate::domain::{TargetKind, VoteStatus, VoteStatusQuery};
use crate::infrastructure::auth::TokenVerifier;
use crate::infrastructure::store::DocumentStore;
use brosolve_errors::AppError;
use std::sync::Arc;

/// Read-only lookup of the caller's vote. Anonymous or unverifiable callers
/// get `userVote: null` instead of an error.
pub struct GetVoteStatus {
    store: DocumentStore,
    verifier: Arc<TokenVerifier>,
}

impl GetVoteStatus {
    pub fn new(store: DocumentStore, verifier: Arc<TokenVerifier>) -> Self {
        Self { store, verifier }
    }

    pub async fn execute(
        &self,
        credential: Option<&str>,
        query: VoteStatusQuery,
    ) -> Result<VoteStatus, AppError> {
        let target_id = query.target_id.trim();
        if target_id.is_empty() {
            return Err(AppError::InvalidRequest(
                "Invalid request parameters".to_string(),
            ));
        }
        let kind: TargetKind = query.target_type.parse()?;

        let Some(token) = credential else {
            return Ok(VoteStatus::anonymous());
        };
        let voter_id = match self.verifier.verify(token) {
            Ok(voter_id) => voter_id,
            Err(e) => {
                tracing::debug!("Vote status for unverified caller: {}", e);
                return Ok(VoteStatus::anonymous());
            }
        };

        let record = self.store.find_vote(&voter_id, target_id).await?;
        Ok(VoteStatus {
            user_vote: record
                .filter(|r| r.target_kind == kind)
                .map(|r| r.direction),
        })
    }
}
