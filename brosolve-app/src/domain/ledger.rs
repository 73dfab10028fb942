//! Vote ledger: decides how a vote request changes a target's cached count
//! and the voter's record. Pure; the store applies the decision inside its
//! transaction.

use super::vote::{TargetKind, VoteDirection};

/// What to do with the (voter, target) vote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    /// No record before, none requested.
    Keep,
    Write(VoteDirection),
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerDecision {
    pub delta: i32,
    pub action: RecordAction,
    /// Direction the voter holds after the decision is applied.
    pub applied: Option<VoteDirection>,
}

/// Requesting the direction already held withdraws it.
pub fn decide(previous: Option<VoteDirection>, requested: Option<VoteDirection>) -> LedgerDecision {
    let applied = if requested == previous { None } else { requested };
    let delta = weight(applied) - weight(previous);

    let action = match (previous, applied) {
        (None, None) => RecordAction::Keep,
        (Some(_), None) => RecordAction::Delete,
        (_, Some(direction)) => RecordAction::Write(direction),
    };

    LedgerDecision {
        delta,
        action,
        applied,
    }
}

/// Bug counts never drop below zero; answer counts may go negative.
pub fn apply_delta(kind: TargetKind, current: i32, delta: i32) -> i32 {
    let next = current.saturating_add(delta);
    match kind {
        TargetKind::Bug => next.max(0),
        TargetKind::Answer => next,
    }
}

fn weight(direction: Option<VoteDirection>) -> i32 {
    direction.map_or(0, VoteDirection::weight)
}

/// State read by the store transaction before deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteSnapshot {
    pub current_count: i32,
    pub previous: Option<VoteDirection>,
}

/// A validated vote request, handed to the store so the decision is taken
/// against what the transaction actually read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotePlan {
    pub kind: TargetKind,
    pub requested: Option<VoteDirection>,
}

impl VotePlan {
    pub fn new(kind: TargetKind, requested: Option<VoteDirection>) -> Self {
        Self { kind, requested }
    }

    /// Returns the decision and the count to write back.
    pub fn resolve(&self, snapshot: VoteSnapshot) -> (LedgerDecision, i32) {
        let decision = decide(snapshot.previous, self.requested);
        let new_count = apply_delta(self.kind, snapshot.current_count, decision.delta);
        (decision, new_count)
    }
}
