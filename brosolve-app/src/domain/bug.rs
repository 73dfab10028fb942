use super::answer::Answer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bug {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: String,
    pub created_by: String,
    pub votes: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Bug {
    pub fn new(title: String, description: String, tags: Vec<String>, created_by: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description,
            tags,
            status: "open".to_string(),
            created_by,
            votes: 0,
            created_at: Some(chrono::Utc::now()),
            updated_at: None,
        }
    }
}

/// Bug with its answers, newest answer first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugDetail {
    pub bug: Bug,
    pub answers: Vec<Answer>,
}

/// Tags arrive either as "a, b, c" or as a JSON array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    Csv(String),
    List(Vec<String>),
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            Self::Csv(s) => s.split(',').map(str::to_string).collect(),
            Self::List(list) => list,
        };
        raw.into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitBugRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<TagsInput>,
}

/// Author edit: title and description required, tags may be cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBugRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<TagsInput>,
}
