// crates/serve/src/reconcile.rs

//! Converge a page's child blocks onto an edited descriptor list.
//!
//! The upstream offers no move/reorder primitive, so every existing child is
//! deleted and the whole edited list is appended afresh. The sequence is not
//! atomic: a failed append leaves the page without the content that was just
//! deleted, and [`ReconcileError::Append`] reports how much was lost.

use domain::block::{BlockDescriptor, UpstreamBlock};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::transform::to_upstream_blocks;
use crate::upstream::{Upstream, UpstreamError};

/// The upstream calls needed to converge, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    /// Every previously existing child, surviving or not.
    pub deletes: Vec<String>,
    /// The full edited list, already mapped; unsupported entries are gone.
    pub append: Vec<UpstreamBlock>,
}

impl ReconcilePlan {
    pub fn new(old_ids: &[String], edited: &[BlockDescriptor]) -> Self {
        Self {
            deletes: old_ids.to_vec(),
            append: to_upstream_blocks(edited),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDelete {
    pub block_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Old children removed and the new list written.
    Complete { deleted: usize, appended: usize },
    /// New list written but some old children could not be removed and are
    /// still on the page ahead of it.
    Partial {
        deleted: usize,
        stale: Vec<FailedDelete>,
        appended: usize,
    },
}

impl ReconcileOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn appended(&self) -> usize {
        match self {
            Self::Complete { appended, .. } | Self::Partial { appended, .. } => *appended,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("append failed after deleting {deleted} blocks; {lost} blocks were not written: {source}")]
    Append {
        deleted: usize,
        lost: usize,
        stale: Vec<FailedDelete>,
        source: UpstreamError,
    },
}

/// Issue the plan against `page_id`: sequential deletes, then one append.
///
/// Failed deletes are logged and collected; a failed append is an error.
#[tracing::instrument(skip_all, fields(page_id = %page_id))]
pub async fn reconcile<U>(
    upstream: &U,
    page_id: &str,
    plan: ReconcilePlan,
) -> Result<ReconcileOutcome, ReconcileError>
where
    U: Upstream + ?Sized,
{
    let mut deleted = 0;
    let mut stale = Vec::new();

    for block_id in &plan.deletes {
        match upstream.delete_block(block_id).await {
            Ok(_) => deleted += 1,
            Err(e) => {
                warn!("Failed to delete block {}: {}", block_id, e);
                stale.push(FailedDelete {
                    block_id: block_id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let appended = plan.append.len();
    if appended > 0 {
        if let Err(source) = upstream.append_children(page_id, plan.append).await {
            return Err(ReconcileError::Append {
                deleted,
                lost: appended,
                stale,
                source,
            });
        }
    } else {
        debug!("nothing to append");
    }

    info!(
        "Reconciled page: {} deleted, {} stale, {} appended",
        deleted,
        stale.len(),
        appended
    );

    Ok(if stale.is_empty() {
        ReconcileOutcome::Complete { deleted, appended }
    } else {
        ReconcileOutcome::Partial {
            deleted,
            stale,
            appended,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::MockUpstream;
    use domain::block::BlockKind;
    use mockall::Sequence;
    use serde_json::json;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    fn edited() -> Vec<BlockDescriptor> {
        vec![
            BlockDescriptor::new(BlockKind::Heading1, "Title").with_upstream_id("b"),
            BlockDescriptor::new(BlockKind::Paragraph, "fresh"),
        ]
    }

    #[tokio::test]
    async fn deletes_every_old_block_then_appends_once() {
        let mut mock = MockUpstream::new();
        let mut seq = Sequence::new();

        for id in ["a", "b", "c"] {
            mock.expect_delete_block()
                .once()
                .in_sequence(&mut seq)
                .withf(move |block_id| block_id == id)
                .returning(|_| Ok(json!({ "archived": true })));
        }
        mock.expect_append_children()
            .once()
            .in_sequence(&mut seq)
            .withf(|page_id, children| page_id == "page" && children.len() == 2)
            .returning(|_, _| Ok(json!({ "results": [] })));

        let plan = ReconcilePlan::new(&ids(&["a", "b", "c"]), &edited());
        let outcome = reconcile(&mock, "page", plan).await.unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Complete {
                deleted: 3,
                appended: 2
            }
        );
    }

    #[tokio::test]
    async fn failed_delete_is_skipped_and_reported_as_partial() {
        let mut mock = MockUpstream::new();

        mock.expect_delete_block()
            .times(3)
            .returning(|id| match id {
                "b" => Err(UpstreamError::Status {
                    status: 429,
                    code: "rate_limited".into(),
                    message: "slow down".into(),
                }),
                _ => Ok(json!({})),
            });
        mock.expect_append_children()
            .once()
            .returning(|_, _| Ok(json!({})));

        let plan = ReconcilePlan::new(&ids(&["a", "b", "c"]), &edited());
        let outcome = reconcile(&mock, "page", plan).await.unwrap();

        assert!(!outcome.is_complete());
        match outcome {
            ReconcileOutcome::Partial {
                deleted,
                stale,
                appended,
            } => {
                assert_eq!(deleted, 2);
                assert_eq!(appended, 2);
                assert_eq!(stale.len(), 1);
                assert_eq!(stale[0].block_id, "b");
            }
            other => panic!("expected partial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_append_reports_lost_blocks() {
        let mut mock = MockUpstream::new();

        mock.expect_delete_block()
            .times(2)
            .returning(|_| Ok(json!({})));
        mock.expect_append_children()
            .once()
            .returning(|_, _| Err(UpstreamError::Transport("connection reset".into())));

        let plan = ReconcilePlan::new(&ids(&["a", "b"]), &edited());
        let err = reconcile(&mock, "page", plan).await.unwrap_err();

        let ReconcileError::Append { deleted, lost, .. } = err;
        assert_eq!(deleted, 2);
        assert_eq!(lost, 2);
    }

    #[tokio::test]
    async fn empty_edit_only_deletes() {
        let mut mock = MockUpstream::new();

        mock.expect_delete_block()
            .once()
            .returning(|_| Ok(json!({})));
        mock.expect_append_children().never();

        let plan = ReconcilePlan::new(&ids(&["a"]), &[BlockDescriptor::raw("embed", "x")]);
        assert!(plan.append.is_empty());

        let outcome = reconcile(&mock, "page", plan).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Complete {
                deleted: 1,
                appended: 0
            }
        );
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = ReconcileOutcome::Complete {
            deleted: 1,
            appended: 2,
        };
        assert_eq!(
            serde_json::to_value(outcome).unwrap(),
            json!({ "status": "complete", "deleted": 1, "appended": 2 })
        );
    }
}
