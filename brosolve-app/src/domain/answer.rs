use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: String,
    pub bug_id: String,
    pub content: String,
    pub author_id: String,
    pub votes: i32,
    pub is_accepted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Answer {
    pub fn new(bug_id: String, content: String, author_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            bug_id,
            content,
            author_id,
            votes: 0,
            is_accepted: false,
            created_at: Some(chrono::Utc::now()),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostAnswerRequest {
    #[serde(default)]
    pub content: Option<String>,
}
