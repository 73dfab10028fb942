use crate::domain::{CastVoteRequest, TargetKind, TargetRef, VoteDirection, VoteOutcome, VotePlan};
use crate::infrastructure::auth::TokenVerifier;
use crate::infrastructure::security::RateLimiter;
use crate::infrastructure::store::DocumentStore;
use brosolve_errors::AppError;
use std::sync::Arc;

/// Casts, changes or withdraws a vote and returns the committed count.
pub struct CastVote {
    store: DocumentStore,
    verifier: Arc<TokenVerifier>,
    rate_limiter: RateLimiter,
}

impl CastVote {
    pub fn new(store: DocumentStore, verifier: Arc<TokenVerifier>, rate_limiter: RateLimiter) -> Self {
        Self {
            store,
            verifier,
            rate_limiter,
        }
    }

    pub async fn execute(
        &self,
        credential: Option<&str>,
        request: CastVoteRequest,
    ) -> Result<VoteOutcome, AppError> {
        let voter_id = self.verifier.require(credential)?;

        let (target, plan) = validate(request).inspect_err(|e| {
            tracing::warn!("Vote from {} rejected: {}", voter_id, e);
        })?;

        // Every validated attempt counts, whether or not it commits
        self.rate_limiter.check(&voter_id)?;

        let outcome = self
            .store
            .apply_vote(&voter_id, &target, plan)
            .await
            .inspect_err(|e| {
                if e.is_client_error() {
                    tracing::warn!("Vote on {} by {} aborted: {}", target.id(), voter_id, e);
                } else {
                    tracing::error!("Vote on {} by {} failed: {}", target.id(), voter_id, e);
                }
            })?;

        tracing::info!(
            voter = %voter_id,
            target = %target.id(),
            kind = %target.kind(),
            vote = ?outcome.user_vote,
            count = outcome.new_vote_count,
            "Vote committed"
        );
        Ok(outcome)
    }
}

/// Checks run before any transaction, in order: target, parent, direction.
fn validate(request: CastVoteRequest) -> Result<(TargetRef, VotePlan), AppError> {
    let target_id = request.target_id.trim();
    if target_id.is_empty() {
        return Err(AppError::InvalidRequest(
            "Invalid request parameters".to_string(),
        ));
    }
    let kind: TargetKind = request.target_type.parse()?;

    let target = match kind {
        TargetKind::Bug => TargetRef::bug(target_id),
        TargetKind::Answer => {
            let parent_id = request
                .parent_id
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    AppError::InvalidRequest("Parent ID required for answer votes".to_string())
                })?;
            TargetRef::answer(parent_id, target_id)
        }
    };

    let requested = request
        .vote_type
        .as_deref()
        .map(str::parse::<VoteDirection>)
        .transpose()?;

    if kind == TargetKind::Bug && requested == Some(VoteDirection::Down) {
        return Err(AppError::InvalidRequest(
            "Bug votes only support 'up' or null".to_string(),
        ));
    }

    Ok((target, VotePlan::new(kind, requested)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::*;
    use crate::infrastructure::security::RateLimitConfig;
    use crate::infrastructure::store::MemoryStore;

    fn cast_vote(store: &MemoryStore) -> CastVote {
        CastVote::new(document_store(store), verifier(), RateLimiter::default())
    }

    fn bug_vote(id: &str, vote: Option<&str>) -> CastVoteRequest {
        CastVoteRequest {
            target_id: id.to_string(),
            target_type: "bug".to_string(),
            vote_type: vote.map(str::to_string),
            parent_id: None,
        }
    }

    fn answer_vote(id: &str, parent: Option<&str>, vote: Option<&str>) -> CastVoteRequest {
        CastVoteRequest {
            target_id: id.to_string(),
            target_type: "answer".to_string(),
            vote_type: vote.map(str::to_string),
            parent_id: parent.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_bug_upvote_then_toggle_off() {
        let store = MemoryStore::new();
        seeded_bug(&store, "bug-1", 5);
        let uc = cast_vote(&store);
        let token = token_for("alice");

        let first = uc.execute(Some(&token), bug_vote("bug-1", Some("up"))).await.unwrap();
        assert_eq!(first, VoteOutcome { new_vote_count: 6, user_vote: Some(VoteDirection::Up) });

        let second = uc.execute(Some(&token), bug_vote("bug-1", Some("up"))).await.unwrap();
        assert_eq!(second, VoteOutcome { new_vote_count: 5, user_vote: None });
        assert!(store.find_vote("alice", "bug-1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_answer_down_then_up() {
        let store = MemoryStore::new();
        seeded_bug(&store, "B1", 0);
        seeded_answer(&store, "B1", "A1", 0);
        let uc = cast_vote(&store);
        let token = token_for("bob");

        let down = uc
            .execute(Some(&token), answer_vote("A1", Some("B1"), Some("down")))
            .await
            .unwrap();
        assert_eq!(down, VoteOutcome { new_vote_count: -1, user_vote: Some(VoteDirection::Down) });

        let up = uc
            .execute(Some(&token), answer_vote("A1", Some("B1"), Some("up")))
            .await
            .unwrap();
        assert_eq!(up, VoteOutcome { new_vote_count: 1, user_vote: Some(VoteDirection::Up) });

        let record = store.find_vote("bob", "A1").unwrap().unwrap();
        assert_eq!(record.direction, VoteDirection::Up);
        assert_eq!(record.parent_id.as_deref(), Some("B1"));
    }

    #[tokio::test]
    async fn test_up_then_down_on_answer_moves_by_two() {
        let store = MemoryStore::new();
        seeded_bug(&store, "B1", 0);
        seeded_answer(&store, "B1", "A1", 7);
        let uc = cast_vote(&store);
        let token = token_for("carol");

        let up = uc.execute(Some(&token), answer_vote("A1", Some("B1"), Some("up"))).await.unwrap();
        let down = uc.execute(Some(&token), answer_vote("A1", Some("B1"), Some("down"))).await.unwrap();
        assert_eq!(down.new_vote_count - up.new_vote_count, -2);
    }

    #[tokio::test]
    async fn test_explicit_null_withdraws_vote() {
        let store = MemoryStore::new();
        seeded_bug(&store, "B1", 0);
        seeded_answer(&store, "B1", "A1", 0);
        let uc = cast_vote(&store);
        let token = token_for("dave");

        uc.execute(Some(&token), answer_vote("A1", Some("B1"), Some("down"))).await.unwrap();
        let cleared = uc.execute(Some(&token), answer_vote("A1", Some("B1"), None)).await.unwrap();
        assert_eq!(cleared, VoteOutcome { new_vote_count: 0, user_vote: None });

        let again = uc.execute(Some(&token), answer_vote("A1", Some("B1"), None)).await.unwrap();
        assert_eq!(again.new_vote_count, 0);
    }

    #[tokio::test]
    async fn test_downvote_on_bug_rejected_without_change() {
        let store = MemoryStore::new();
        seeded_bug(&store, "bug-1", 3);
        let uc = cast_vote(&store);

        let err = uc
            .execute(Some(&token_for("eve")), bug_vote("bug-1", Some("down")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(store.find_bug("bug-1").unwrap().unwrap().votes, 3);
        assert!(store.find_vote("eve", "bug-1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bug_count_floors_at_zero() {
        let store = MemoryStore::new();
        seeded_bug(&store, "bug-1", 0);
        // Record left over from before the count was reset
        {
            let uc = cast_vote(&store);
            uc.execute(Some(&token_for("frank")), bug_vote("bug-1", Some("up"))).await.unwrap();
        }
        let mut bug = store.find_bug("bug-1").unwrap().unwrap();
        bug.votes = 0;
        store.insert_bug(&bug).unwrap();

        let outcome = cast_vote(&store)
            .execute(Some(&token_for("frank")), bug_vote("bug-1", Some("up")))
            .await
            .unwrap();
        assert_eq!(outcome.new_vote_count, 0);
        assert_eq!(outcome.user_vote, None);
    }

    #[tokio::test]
    async fn test_validation_order() {
        let store = MemoryStore::new();
        let uc = cast_vote(&store);

        // Credential is checked before anything else
        let err = uc.execute(None, bug_vote("", Some("down"))).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
        let err = uc.execute(Some("garbage"), bug_vote("x", Some("up"))).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));

        let token = token_for("gina");
        let bad_kind = CastVoteRequest {
            target_id: "x".into(),
            target_type: "comment".into(),
            vote_type: Some("up".into()),
            parent_id: None,
        };
        assert!(matches!(
            uc.execute(Some(&token), bad_kind).await,
            Err(AppError::InvalidRequest(_))
        ));

        let err = uc
            .execute(Some(&token), answer_vote("A1", None, Some("up")))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AppError::InvalidRequest("Parent ID required for answer votes".to_string())
        );

        let err = uc
            .execute(Some(&token), bug_vote("x", Some("sideways")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_missing_target_leaves_no_record() {
        let store = MemoryStore::new();
        seeded_bug(&store, "B1", 0);
        let uc = cast_vote(&store);
        let token = token_for("hank");

        let err = uc
            .execute(Some(&token), answer_vote("ghost", Some("B1"), Some("up")))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::NotFound("Answer".to_string()));
        assert!(store.find_vote("hank", "ghost").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_applies_after_validation() {
        let store = MemoryStore::new();
        seeded_bug(&store, "bug-1", 0);
        let limiter = RateLimiter::new(RateLimitConfig {
            per_minute: 1,
            per_hour: 10,
        });
        let uc = CastVote::new(document_store(&store), verifier(), limiter);
        let token = token_for("ivy");

        // Rejected requests do not use up the allowance
        uc.execute(Some(&token), bug_vote("bug-1", Some("down"))).await.unwrap_err();
        uc.execute(Some(&token), bug_vote("bug-1", Some("up"))).await.unwrap();

        let err = uc.execute(Some(&token), bug_vote("bug-1", Some("up"))).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
        assert_eq!(store.find_bug("bug-1").unwrap().unwrap().votes, 1);
    }

    #[tokio::test]
    async fn test_vote_on_missing_target_uses_allowance() {
        let store = MemoryStore::new();
        seeded_bug(&store, "bug-1", 0);
        let limiter = RateLimiter::new(RateLimitConfig {
            per_minute: 1,
            per_hour: 10,
        });
        let uc = CastVote::new(document_store(&store), verifier(), limiter);
        let token = token_for("jay");

        let err = uc.execute(Some(&token), bug_vote("ghost", Some("up"))).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = uc.execute(Some(&token), bug_vote("bug-1", Some("up"))).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
        assert_eq!(store.find_bug("bug-1").unwrap().unwrap().votes, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upvotes_converge() {
        const VOTERS: usize = 40;
        let store = MemoryStore::new().with_max_attempts(64);
        seeded_bug(&store, "hot", 0);
        let uc = Arc::new(cast_vote(&store));

        let handles: Vec<_> = (0..VOTERS)
            .map(|i| {
                let uc = uc.clone();
                tokio::spawn(async move {
                    let token = token_for(&format!("voter-{}", i));
                    uc.execute(Some(&token), bug_vote("hot", Some("up"))).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.find_bug("hot").unwrap().unwrap().votes, VOTERS as i32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_double_click_is_not_double_counted() {
        let store = MemoryStore::new().with_max_attempts(64);
        seeded_bug(&store, "bug-1", 10);
        let uc = Arc::new(cast_vote(&store));
        let token = token_for("jay");

        let a = {
            let (uc, token) = (uc.clone(), token.clone());
            tokio::spawn(async move { uc.execute(Some(&token), bug_vote("bug-1", Some("up"))).await })
        };
        let b = {
            let (uc, token) = (uc.clone(), token.clone());
            tokio::spawn(async move { uc.execute(Some(&token), bug_vote("bug-1", Some("up"))).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Two serialized toggles: on then off
        assert_eq!(store.find_bug("bug-1").unwrap().unwrap().votes, 10);
        assert!(store.find_vote("jay", "bug-1").unwrap().is_none());
    }
}
