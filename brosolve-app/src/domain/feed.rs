use super::bug::Bug;
use brosolve_errors::AppError;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 50;

/// Query string of the bug feed: `?cursor=&limit=&q=&tag=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BugFeedQuery {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Position in the feed: the sort key of the last bug already returned.
/// Carries its own timestamp so it stays valid if that bug is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: Option<DateTime<Utc>>,
    pub id: String,
}

impl FeedCursor {
    pub fn of(bug: &Bug) -> Self {
        Self {
            created_at: bug.created_at,
            id: bug.id.clone(),
        }
    }

    /// Whether `bug` comes strictly after this position in feed order.
    pub fn precedes(&self, bug: &Bug) -> bool {
        (&bug.created_at, &bug.id) < (&self.created_at, &self.id)
    }

    pub fn encode(&self) -> String {
        let nanos = self
            .created_at
            .and_then(|t| t.timestamp_nanos_opt())
            .map(|n| n.to_string())
            .unwrap_or_default();
        format!("{}_{}", nanos, self.id)
    }
}

impl FromStr for FeedCursor {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidRequest("Invalid cursor".to_string());
        let (nanos, id) = s.split_once('_').ok_or_else(invalid)?;
        if id.is_empty() {
            return Err(invalid());
        }
        let created_at = if nanos.is_empty() {
            None
        } else {
            let nanos: i64 = nanos.parse().map_err(|_| invalid())?;
            Some(DateTime::from_timestamp_nanos(nanos))
        };
        Ok(Self {
            created_at,
            id: id.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub cursor: Option<FeedCursor>,
    pub limit: u64,
    pub filter: FeedFilter,
}

impl TryFrom<BugFeedQuery> for FeedRequest {
    type Error = AppError;

    fn try_from(query: BugFeedQuery) -> Result<Self, Self::Error> {
        let limit = match query.limit {
            None => DEFAULT_PAGE_SIZE,
            Some(0) => {
                return Err(AppError::InvalidRequest(
                    "Invalid request parameters".to_string(),
                ))
            }
            Some(n) => n.min(MAX_PAGE_SIZE),
        };
        let trimmed = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let cursor = trimmed(query.cursor)
            .map(|c| c.parse::<FeedCursor>())
            .transpose()?;

        Ok(Self {
            cursor,
            limit,
            filter: FeedFilter {
                search: trimmed(query.q).map(|q| q.to_lowercase()),
                tag: trimmed(query.tag),
            },
        })
    }
}

/// Case-insensitive substring search over title and description, plus an
/// exact tag match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    /// Already lowercased.
    pub search: Option<String>,
    pub tag: Option<String>,
}

impl FeedFilter {
    pub fn matches(&self, bug: &Bug) -> bool {
        let search_ok = self.search.as_deref().map_or(true, |q| {
            bug.title.to_lowercase().contains(q) || bug.description.to_lowercase().contains(q)
        });
        let tag_ok = self
            .tag
            .as_deref()
            .map_or(true, |tag| bug.tags.iter().any(|t| t == tag));
        search_ok && tag_ok
    }
}

/// Feed order: newest first, ties broken by id descending, undated bugs last.
pub fn feed_order(a: &Bug, b: &Bug) -> Ordering {
    (&b.created_at, &b.id).cmp(&(&a.created_at, &a.id))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugPage {
    pub bugs: Vec<Bug>,
    /// Pass back as `cursor` to fetch the next page; absent on the last page.
    pub next_cursor: Option<String>,
}

impl BugPage {
    /// Builds a page from up to `limit + 1` bugs in feed order.
    pub fn from_window(mut bugs: Vec<Bug>, limit: u64) -> Self {
        let limit = limit as usize;
        let has_more = bugs.len() > limit;
        bugs.truncate(limit);
        let next_cursor = if has_more {
            bugs.last().map(|b| FeedCursor::of(b).encode())
        } else {
            None
        };
        Self { bugs, next_cursor }
    }
}
