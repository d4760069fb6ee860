// crates/serve/src/flow.rs

//! Multi-call page operations built on the upstream port.

use domain::block::BlockDescriptor;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::info;

use crate::reconcile::{reconcile, ReconcileOutcome, ReconcilePlan};
use crate::transform::to_upstream_blocks;
use crate::upstream::{child_ids, Upstream, UpstreamError};
use crate::Error;

/// Create a page in `database_id`, then append its initial content.
///
/// Returns the created page object. Blocks are appended only when at least
/// one of them maps to a supported type.
#[tracing::instrument(skip_all)]
pub async fn create_page<U>(
    upstream: &U,
    database_id: &str,
    properties: Json,
    blocks: &[BlockDescriptor],
) -> Result<Json, UpstreamError>
where
    U: Upstream + ?Sized,
{
    let page = upstream.create_page(database_id, properties).await?;

    let children = to_upstream_blocks(blocks);
    if !children.is_empty() {
        let page_id = page
            .get("id")
            .and_then(Json::as_str)
            .ok_or_else(|| UpstreamError::Decode("created page has no id".to_owned()))?;
        info!("Appending {} blocks to new page {}", children.len(), page_id);
        upstream.append_children(page_id, children).await?;
    }

    Ok(page)
}

/// Result of the edit flow.
#[derive(Debug, Clone, Serialize)]
pub struct EditReport {
    /// Updated page object, when properties were part of the edit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Json>,
    pub content: ReconcileOutcome,
}

/// Replace a page's properties (when given) and its whole block list.
#[tracing::instrument(skip_all, fields(page_id = %page_id))]
pub async fn edit_page<U>(
    upstream: &U,
    page_id: &str,
    properties: Option<Json>,
    blocks: &[BlockDescriptor],
) -> Result<EditReport, Error>
where
    U: Upstream + ?Sized,
{
    let page = match properties {
        Some(props) => Some(upstream.update_page(page_id, props).await?),
        None => None,
    };

    let old_ids = child_ids(upstream, page_id).await?;
    let plan = ReconcilePlan::new(&old_ids, blocks);
    let content = reconcile(upstream, page_id, plan).await?;

    Ok(EditReport { page, content })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::MockUpstream;
    use domain::block::BlockKind;
    use domain::page::PageProperties;
    use mockall::Sequence;
    use serde_json::json;

    #[tokio::test]
    async fn create_appends_supported_blocks_to_new_page() {
        let mut mock = MockUpstream::new();
        let mut seq = Sequence::new();

        mock.expect_create_page()
            .once()
            .in_sequence(&mut seq)
            .withf(|db, props| db == "db" && props["Name"]["title"][0]["text"]["content"] == "Hi")
            .returning(|_, _| Ok(json!({ "id": "new-page", "object": "page" })));
        mock.expect_append_children()
            .once()
            .in_sequence(&mut seq)
            .withf(|id, children| id == "new-page" && children.len() == 1)
            .returning(|_, _| Ok(json!({})));

        let blocks = vec![
            BlockDescriptor::new(BlockKind::Paragraph, "body"),
            BlockDescriptor::raw("callout", "ignored"),
        ];
        let page = create_page(&mock, "db", PageProperties::new("Hi").to_upstream(), &blocks)
            .await
            .unwrap();
        assert_eq!(page["id"], "new-page");
    }

    #[tokio::test]
    async fn create_without_blocks_skips_append() {
        let mut mock = MockUpstream::new();
        mock.expect_create_page()
            .once()
            .returning(|_, _| Ok(json!({ "id": "p" })));
        mock.expect_append_children().never();

        create_page(&mock, "db", json!({}), &[]).await.unwrap();
    }

    #[tokio::test]
    async fn edit_updates_properties_then_replaces_content() {
        let mut mock = MockUpstream::new();
        let mut seq = Sequence::new();

        mock.expect_update_page()
            .once()
            .in_sequence(&mut seq)
            .returning(|id, props| Ok(json!({ "id": id, "properties": props })));
        mock.expect_list_children()
            .once()
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!({ "results": [{ "id": "x" }, { "id": "y" }] })));
        mock.expect_delete_block()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json!({})));
        mock.expect_append_children()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(json!({})));

        let props = PageProperties::new("Edited").with_status("Done").to_upstream();
        let blocks = vec![BlockDescriptor::new(BlockKind::BulletedListItem, "one")];

        let report = edit_page(&mock, "p1", Some(props), &blocks).await.unwrap();

        assert_eq!(report.page.unwrap()["id"], "p1");
        assert_eq!(
            report.content,
            ReconcileOutcome::Complete {
                deleted: 2,
                appended: 1
            }
        );
    }

    #[tokio::test]
    async fn edit_deletes_children_beyond_the_first_listing_page() {
        let mut mock = MockUpstream::new();
        let mut seq = Sequence::new();

        mock.expect_list_children()
            .once()
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(json!({ "results": [{ "id": "a" }], "has_more": true, "next_cursor": "c2" }))
            });
        mock.expect_list_children_after()
            .once()
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(json!({ "results": [{ "id": "b" }], "has_more": false })));
        for id in ["a", "b"] {
            mock.expect_delete_block()
                .once()
                .in_sequence(&mut seq)
                .withf(move |block_id| block_id == id)
                .returning(|_| Ok(json!({})));
        }
        mock.expect_append_children().never();

        let report = edit_page(&mock, "p1", None, &[]).await.unwrap();

        assert!(report.page.is_none());
        assert_eq!(
            report.content,
            ReconcileOutcome::Complete {
                deleted: 2,
                appended: 0
            }
        );
    }

    #[tokio::test]
    async fn edit_surfaces_listing_failure() {
        let mut mock = MockUpstream::new();
        mock.expect_list_children()
            .returning(|_| Err(UpstreamError::Transport("timeout".into())));
        mock.expect_delete_block().never();

        let err = edit_page(&mock, "p1", None, &[]).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(UpstreamError::Transport(_))));
    }
}
