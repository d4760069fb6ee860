// crates/serve/src/transform/inbound.rs

use domain::block::{BlockDescriptor, BlockKind};
use serde_json::Value as Json;

/// Content pulled out of one upstream block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// `None` when the block's type is not one we render.
    pub kind: Option<BlockKind>,
    /// The raw `type` tag as the upstream reported it.
    pub type_tag: String,
    pub content: String,
}

impl Extracted {
    pub fn is_supported(&self) -> bool {
        self.kind.is_some()
    }
}

fn str_at<'a>(value: &'a Json, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Json::as_str)
}

/// Every lookup short-circuits to `""`; this never fails.
pub fn extract(block: &Json) -> Extracted {
    let type_tag = str_at(block, "/type").unwrap_or_default().to_owned();
    let kind = BlockKind::parse(&type_tag);

    let content = match kind {
        Some(BlockKind::Image) => str_at(block, "/image/external/url")
            .or_else(|| str_at(block, "/image/file/url")),
        Some(BlockKind::Video) => str_at(block, "/video/external/url"),
        Some(text) => {
            let first = format!("/{}/rich_text/0", text.as_str());
            // Freshly built blocks only carry `text.content`.
            str_at(block, &format!("{first}/plain_text"))
                .or_else(|| str_at(block, &format!("{first}/text/content")))
        }
        None => None,
    }
    .unwrap_or_default()
    .to_owned();

    Extracted {
        kind,
        type_tag,
        content,
    }
}

pub fn extract_content(block: &Json) -> String {
    extract(block).content
}

/// Load an upstream block into the editable shape, keeping its upstream id.
pub fn to_descriptor(block: &Json) -> BlockDescriptor {
    let extracted = extract(block);
    let descriptor = BlockDescriptor::raw(extracted.type_tag, extracted.content);
    match str_at(block, "/id") {
        Some(id) => descriptor.with_upstream_id(id),
        None => descriptor,
    }
}

/// Descriptors for every block in a child-list response, in order.
pub fn to_descriptors(children: &Json) -> Vec<BlockDescriptor> {
    children
        .get("results")
        .and_then(Json::as_array)
        .map(|blocks| blocks.iter().map(to_descriptor).collect())
        .unwrap_or_default()
}

/// One-line plain-text rendering for terminal display.
pub fn render_block(block: &Json) -> String {
    let Extracted {
        kind,
        type_tag,
        content,
    } = extract(block);

    match kind {
        Some(BlockKind::Paragraph) => content,
        Some(BlockKind::Heading1) => format!("# {content}"),
        Some(BlockKind::Heading2) => format!("## {content}"),
        Some(BlockKind::Heading3) => format!("### {content}"),
        Some(BlockKind::BulletedListItem) => format!("• {content}"),
        Some(BlockKind::Image) => format!("[image] {content}"),
        Some(BlockKind::Video) => format!("[video] {content}"),
        None => format!("Unsupported block type: {type_tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::outbound::build_block;
    use serde_json::json;

    #[test]
    fn content_survives_outbound_then_inbound() {
        for kind in BlockKind::ALL {
            let content = if kind.is_media() {
                "https://cdn.example/asset"
            } else {
                "Hello, world"
            };
            let json = serde_json::to_value(build_block(kind, content)).unwrap();
            assert_eq!(extract_content(&json), content, "kind {kind}");
        }
    }

    #[test]
    fn reads_plain_text_from_upstream_response() {
        let block = json!({
            "id": "b1",
            "type": "heading_2",
            "heading_2": { "rich_text": [
                { "plain_text": "Section", "text": { "content": "ignored" } },
                { "plain_text": " tail" }
            ] }
        });
        assert_eq!(extract_content(&block), "Section");
    }

    #[test]
    fn image_falls_back_to_hosted_file() {
        let block = json!({
            "type": "image",
            "image": { "type": "file", "file": { "url": "https://s3/x.png", "expiry_time": "…" } }
        });
        assert_eq!(extract_content(&block), "https://s3/x.png");
    }

    #[test]
    fn missing_nested_fields_extract_to_empty() {
        let cases = [
            json!({ "type": "paragraph" }),
            json!({ "type": "paragraph", "paragraph": null }),
            json!({ "type": "heading_1", "heading_1": { "rich_text": [] } }),
            json!({ "type": "bulleted_list_item", "bulleted_list_item": { "rich_text": [null] } }),
            json!({ "type": "image", "image": {} }),
            json!({ "type": "video", "video": { "external": { "url": 7 } } }),
            json!({}),
            json!(null),
            json!("paragraph"),
        ];
        for case in cases {
            assert_eq!(extract_content(&case), "", "case {case}");
        }
    }

    #[test]
    fn unknown_type_is_flagged_and_rendered_as_placeholder() {
        let block = json!({ "type": "embed", "embed": { "url": "https://e" } });
        let extracted = extract(&block);
        assert!(!extracted.is_supported());
        assert_eq!(extracted.content, "");
        assert_eq!(render_block(&block), "Unsupported block type: embed");
    }

    #[test]
    fn descriptors_keep_upstream_ids_and_order() {
        let children = json!({ "results": [
            { "id": "a", "type": "paragraph", "paragraph": { "rich_text": [{ "plain_text": "one" }] } },
            { "id": "b", "type": "table", "table": {} },
            { "id": "c", "type": "video", "video": { "external": { "url": "https://v" } } }
        ]});
        let ds = to_descriptors(&children);
        let got: Vec<(&str, &str, Option<&str>)> = ds
            .iter()
            .map(|d| (d.kind.as_str(), d.content.as_str(), d.upstream_id.as_deref()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("paragraph", "one", Some("a")),
                ("table", "", Some("b")),
                ("video", "https://v", Some("c")),
            ]
        );
    }

    #[test]
    fn renders_headings_and_lists() {
        let h = json!({ "type": "heading_1", "heading_1": { "rich_text": [{ "plain_text": "Top" }] } });
        let li = json!({ "type": "bulleted_list_item", "bulleted_list_item": { "rich_text": [{ "plain_text": "milk" }] } });
        assert_eq!(render_block(&h), "# Top");
        assert_eq!(render_block(&li), "• milk");
    }
}
