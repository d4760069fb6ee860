// crates/domain/src/block.rs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as Json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Block kinds
// ─────────────────────────────────────────────────────────────────────────────

/// The closed set of block types the relay knows how to write and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Image,
    Video,
    BulletedListItem,
}

impl BlockKind {
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Paragraph,
        BlockKind::Heading1,
        BlockKind::Heading2,
        BlockKind::Heading3,
        BlockKind::Image,
        BlockKind::Video,
        BlockKind::BulletedListItem,
    ];

    /// Parse an upstream/client type tag. `bulleted_list` is the legacy
    /// spelling some clients still send.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "paragraph" => Some(Self::Paragraph),
            "heading_1" => Some(Self::Heading1),
            "heading_2" => Some(Self::Heading2),
            "heading_3" => Some(Self::Heading3),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "bulleted_list_item" | "bulleted_list" => Some(Self::BulletedListItem),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading1 => "heading_1",
            Self::Heading2 => "heading_2",
            Self::Heading3 => "heading_3",
            Self::Image => "image",
            Self::Video => "video",
            Self::BulletedListItem => "bulleted_list_item",
        }
    }

    /// Text kinds carry a rich-text array; media kinds carry an external URL.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::UnsupportedBlock(s.to_owned()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client-facing descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Simplified `{id, type, content}` record edited by clients.
///
/// `type` stays a raw string so unknown tags survive deserialization and can
/// be dropped by the mapper instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    #[serde(default = "local_id", deserialize_with = "opaque_id")]
    pub id: String,

    #[serde(rename = "type", default, deserialize_with = "tag_or_empty")]
    pub kind: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    /// Set when the block was loaded from the upstream service.
    #[serde(default, alias = "notionId", skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,
}

impl BlockDescriptor {
    pub fn new(kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            id: local_id(),
            kind: kind.as_str().to_owned(),
            content: content.into(),
            upstream_id: None,
        }
    }

    /// Descriptor with an arbitrary (possibly unsupported) type tag.
    pub fn raw(kind: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: local_id(),
            kind: kind.into(),
            content: content.into(),
            upstream_id: None,
        }
    }

    pub fn with_upstream_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.id = id.clone();
        self.upstream_id = Some(id);
        self
    }

    pub fn block_kind(&self) -> Option<BlockKind> {
        BlockKind::parse(&self.kind)
    }

    pub fn is_new(&self) -> bool {
        self.upstream_id.is_none()
    }
}

fn local_id() -> String {
    format!("new-{}", Uuid::new_v4())
}

/// Clients send string or numeric ids; both are opaque to us.
fn opaque_id<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Json>::deserialize(de)? {
        Some(Json::String(s)) => s,
        Some(Json::Null) | None => local_id(),
        Some(other) => other.to_string(),
    })
}

/// Only string tags can name a kind; anything else becomes `""` and is
/// dropped by the mapper.
fn tag_or_empty<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Json::deserialize(de)? {
        Json::String(s) => s,
        _ => String::new(),
    })
}

/// Scalars are kept as their text; null, arrays and objects become `""`.
fn null_as_empty<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Json::deserialize(de)? {
        Json::String(s) => s,
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Upstream block shapes (outbound)
// ─────────────────────────────────────────────────────────────────────────────

/// Upstream-native block, tagged by `type` with a same-named payload field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum UpstreamBlock {
    #[serde(rename = "paragraph")]
    Paragraph { paragraph: TextBody },
    #[serde(rename = "heading_1")]
    Heading1 { heading_1: TextBody },
    #[serde(rename = "heading_2")]
    Heading2 { heading_2: TextBody },
    #[serde(rename = "heading_3")]
    Heading3 { heading_3: TextBody },
    #[serde(rename = "image")]
    Image { image: MediaBody },
    #[serde(rename = "video")]
    Video { video: MediaBody },
    #[serde(rename = "bulleted_list_item")]
    BulletedListItem { bulleted_list_item: TextBody },
}

impl UpstreamBlock {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Paragraph { .. } => BlockKind::Paragraph,
            Self::Heading1 { .. } => BlockKind::Heading1,
            Self::Heading2 { .. } => BlockKind::Heading2,
            Self::Heading3 { .. } => BlockKind::Heading3,
            Self::Image { .. } => BlockKind::Image,
            Self::Video { .. } => BlockKind::Video,
            Self::BulletedListItem { .. } => BlockKind::BulletedListItem,
        }
    }

    /// The text or URL this block was built from.
    pub fn content(&self) -> &str {
        match self {
            Self::Paragraph { paragraph: t }
            | Self::Heading1 { heading_1: t }
            | Self::Heading2 { heading_2: t }
            | Self::Heading3 { heading_3: t }
            | Self::BulletedListItem {
                bulleted_list_item: t,
            } => t.first_text(),
            Self::Image { image: m } | Self::Video { video: m } => &m.external.url,
        }
    }

    /// Payload without the `type` tag, as the block-update call expects it.
    pub fn to_update_body(&self) -> Result<Json, Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("type");
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBody {
    pub rich_text: Vec<RichText>,
}

impl TextBody {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            rich_text: vec![RichText {
                text: TextContent {
                    content: content.into(),
                },
            }],
        }
    }

    fn first_text(&self) -> &str {
        self.rich_text
            .first()
            .map(|r| r.text.content.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichText {
    pub text: TextContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaBody {
    #[serde(rename = "type")]
    pub source: MediaSource,
    pub external: ExternalFile,
}

impl MediaBody {
    pub fn external(url: impl Into<String>) -> Self {
        Self {
            source: MediaSource::External,
            external: ExternalFile { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalFile {
    pub url: String,
}
