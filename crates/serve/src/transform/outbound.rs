// crates/serve/src/transform/outbound.rs

use domain::block::{BlockDescriptor, BlockKind, MediaBody, TextBody, UpstreamBlock};
use tracing::debug;

/// Build the upstream block for a known kind.
pub fn build_block(kind: BlockKind, content: &str) -> UpstreamBlock {
    match kind {
        BlockKind::Paragraph => UpstreamBlock::Paragraph {
            paragraph: TextBody::plain(content),
        },
        BlockKind::Heading1 => UpstreamBlock::Heading1 {
            heading_1: TextBody::plain(content),
        },
        BlockKind::Heading2 => UpstreamBlock::Heading2 {
            heading_2: TextBody::plain(content),
        },
        BlockKind::Heading3 => UpstreamBlock::Heading3 {
            heading_3: TextBody::plain(content),
        },
        BlockKind::Image => UpstreamBlock::Image {
            image: MediaBody::external(content),
        },
        BlockKind::Video => UpstreamBlock::Video {
            video: MediaBody::external(content),
        },
        BlockKind::BulletedListItem => UpstreamBlock::BulletedListItem {
            bulleted_list_item: TextBody::plain(content),
        },
    }
}

/// `None` for descriptors whose type is not supported.
pub fn to_upstream_block(descriptor: &BlockDescriptor) -> Option<UpstreamBlock> {
    descriptor
        .block_kind()
        .map(|kind| build_block(kind, &descriptor.content))
}

/// Map a descriptor sequence in document order, dropping unsupported entries.
#[tracing::instrument(skip_all)]
pub fn to_upstream_blocks(descriptors: &[BlockDescriptor]) -> Vec<UpstreamBlock> {
    descriptors
        .iter()
        .filter_map(|d| {
            let block = to_upstream_block(d);
            if block.is_none() {
                debug!("dropping block {} with unsupported type {:?}", d.id, d.kind);
            }
            block
        })
        .collect()
}
