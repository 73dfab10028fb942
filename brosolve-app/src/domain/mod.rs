mod answer;
mod bug;
pub mod feed;
pub mod ledger;
mod vote;

pub use answer::{Answer, PostAnswerRequest};
pub use bug::{Bug, BugDetail, SubmitBugRequest, TagsInput, UpdateBugRequest};
pub use feed::{BugFeedQuery, BugPage, FeedCursor, FeedFilter, FeedRequest};
pub use ledger::{LedgerDecision, RecordAction, VotePlan, VoteSnapshot};
pub use vote::{
    CastVoteRequest, TargetKind, TargetRef, VoteDirection, VoteOutcome, VoteRecord, VoteStatus,
    VoteStatusQuery,
};
