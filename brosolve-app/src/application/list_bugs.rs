use crate::domain::{BugFeedQuery, BugPage, FeedRequest};
use crate::infrastructure::store::DocumentStore;
use brosolve_errors::AppError;

/// The bug feed: newest first, cursor paged, filtered by search term and tag.
pub struct ListBugs {
    store: DocumentStore,
}

impl ListBugs {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub async fn execute(&self, query: BugFeedQuery) -> Result<BugPage, AppError> {
        let request = FeedRequest::try_from(query)?;
        let page = self.store.list_bugs(&request).await?;
        tracing::debug!(
            "Feed page of {} bugs (more: {})",
            page.bugs.len(),
            page.next_cursor.is_some()
        );
        Ok(page)
    }
}
