use crate::domain::BugDetail;
use crate::infrastructure::store::DocumentStore;
use brosolve_errors::AppError;

pub struct ViewBug {
    store: DocumentStore,
}

impl ViewBug {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub async fn execute(&self, bug_id: &str) -> Result<BugDetail, AppError> {
        let bug = self
            .store
            .find_bug(bug_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Bug".to_string()))?;
        let answers = self.store.list_answers(bug_id).await?;
        Ok(BugDetail { bug, answers })
    }
}
