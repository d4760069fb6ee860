use serve::upstream::Upstream;
use std::sync::Arc;

use crate::ApiError;

/// Per-process state shared by every relay handler.
#[derive(Clone)]
pub struct AppState {
    upstream: Arc<dyn Upstream>,
    database_id: Option<Arc<str>>,
}

impl AppState {
    #[tracing::instrument(skip_all)]
    pub fn new(upstream: Arc<dyn Upstream>, database_id: Option<String>) -> Self {
        Self {
            upstream,
            database_id: database_id
                .filter(|id| !id.trim().is_empty())
                .map(Arc::from),
        }
    }

    pub fn upstream(&self) -> &dyn Upstream {
        self.upstream.as_ref()
    }

    /// The target collection, or the 400 the relay answers without one.
    pub fn database_id(&self) -> Result<&str, ApiError> {
        self.database_id
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("Database ID not configured"))
    }
}
