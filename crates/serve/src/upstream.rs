// crates/serve/src/upstream.rs

//! Port for the hosted document-database API.
//!
//! The relay and the page flows only see this trait; the HTTP client lives in
//! the `adapt` crate. Every method returns the upstream's JSON unchanged so
//! the relay can pass it through verbatim.

use async_trait::async_trait;
use domain::block::UpstreamBlock;
use serde_json::Value as Json;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Non-success HTTP status with the upstream's `{code, message}` body.
    #[error("upstream returned {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream response could not be decoded: {0}")]
    Decode(String),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The upstream's own message where there is one.
    pub fn details(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn query_database(&self, database_id: &str) -> Result<Json, UpstreamError>;

    async fn retrieve_page(&self, page_id: &str) -> Result<Json, UpstreamError>;

    async fn create_page(&self, database_id: &str, properties: Json) -> Result<Json, UpstreamError>;

    async fn update_page(&self, page_id: &str, properties: Json) -> Result<Json, UpstreamError>;

    /// Soft delete: sets `archived: true` and leaves properties alone.
    async fn archive_page(&self, page_id: &str) -> Result<Json, UpstreamError>;

    /// First page of a block's children.
    async fn list_children(&self, block_id: &str) -> Result<Json, UpstreamError>;

    /// Children page starting at a `next_cursor` from an earlier listing.
    async fn list_children_after(&self, block_id: &str, cursor: &str)
        -> Result<Json, UpstreamError>;

    async fn append_children(
        &self,
        block_id: &str,
        children: Vec<UpstreamBlock>,
    ) -> Result<Json, UpstreamError>;

    async fn delete_block(&self, block_id: &str) -> Result<Json, UpstreamError>;

    async fn update_block(&self, block_id: &str, block: UpstreamBlock)
        -> Result<Json, UpstreamError>;
}

/// Ids of all of a block's current children, in order, following the
/// upstream's `has_more`/`next_cursor` paging.
#[tracing::instrument(skip_all)]
pub async fn child_ids<U>(upstream: &U, block_id: &str) -> Result<Vec<String>, UpstreamError>
where
    U: Upstream + ?Sized,
{
    let mut ids = Vec::new();
    let mut listing = upstream.list_children(block_id).await?;

    loop {
        if let Some(blocks) = listing.get("results").and_then(Json::as_array) {
            ids.extend(
                blocks
                    .iter()
                    .filter_map(|b| b.get("id").and_then(Json::as_str))
                    .map(str::to_owned),
            );
        }

        if !listing.get("has_more").and_then(Json::as_bool).unwrap_or(false) {
            return Ok(ids);
        }
        let cursor = listing
            .get("next_cursor")
            .and_then(Json::as_str)
            .map(str::to_owned)
            .ok_or_else(|| UpstreamError::Decode("has_more set without next_cursor".to_owned()))?;

        debug!("fetching children of {} after {}", block_id, cursor);
        listing = upstream.list_children_after(block_id, &cursor).await?;
    }
}
