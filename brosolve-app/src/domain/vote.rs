use brosolve_errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a single vote. `up` counts +1, `down` counts -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn weight(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(AppError::InvalidRequest(format!(
                "Unknown vote type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Bug,
    Answer,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Answer => "answer",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bug" => Ok(Self::Bug),
            "answer" => Ok(Self::Answer),
            _ => Err(AppError::InvalidRequest(
                "Invalid request parameters".to_string(),
            )),
        }
    }
}

/// Storage location of a vote target. Answers live under their parent bug,
/// so an answer cannot be addressed without the bug id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetRef {
    Bug { id: String },
    Answer { bug_id: String, id: String },
}

impl TargetRef {
    pub fn bug(id: impl Into<String>) -> Self {
        Self::Bug { id: id.into() }
    }

    pub fn answer(bug_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Answer {
            bug_id: bug_id.into(),
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Bug { id } | Self::Answer { id, .. } => id,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Bug { .. } => TargetKind::Bug,
            Self::Answer { .. } => TargetKind::Answer,
        }
    }

    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::Bug { .. } => None,
            Self::Answer { bug_id, .. } => Some(bug_id),
        }
    }

    /// Name used in `NotFound` errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bug { .. } => "Bug",
            Self::Answer { .. } => "Answer",
        }
    }
}

/// One user's stance on one target, keyed by (voter_id, target_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub voter_id: String,
    pub target_id: String,
    pub target_kind: TargetKind,
    pub direction: VoteDirection,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VoteRecord {
    pub fn new(
        voter_id: &str,
        target: &TargetRef,
        direction: VoteDirection,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            voter_id: voter_id.to_string(),
            target_id: target.id().to_string(),
            target_kind: target.kind(),
            direction,
            parent_id: target.parent_id().map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    /// Same record pointing the other way; creation time is kept.
    pub fn redirected(mut self, direction: VoteDirection, now: DateTime<Utc>) -> Self {
        self.direction = direction;
        self.updated_at = now;
        self
    }
}

/// Body of `POST /api/votes`. Fields stay raw so that malformed values are
/// reported as `InvalidRequest` by the coordinator, in validation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub vote_type: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub new_vote_count: i32,
    pub user_vote: Option<VoteDirection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatusQuery {
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub target_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub user_vote: Option<VoteDirection>,
}

impl VoteStatus {
    pub fn anonymous() -> Self {
        Self { user_vote: None }
    }
}
