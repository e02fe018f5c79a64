//! Block schema produced by the structuring stage, and its mapping onto the
//! document backend's native blocks.
//!
//! The structuring stage emits `{"blocks": [{"type", "text", "url", "is_code"}]}`.
//! [`parse_structured_output`] validates that shape and [`to_notion_blocks`]
//! turns it into [`NotionBlock`]s. Image blocks always point at the job's
//! diagram URL, whatever URL the generated block carried.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::SchemaError;

const RAW_EXCERPT_CHARS: usize = 1000;

/// Kinds of block the structuring stage may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredBlockKind {
    Paragraph,
    #[serde(rename = "heading_1", alias = "heading1")]
    Heading1,
    #[serde(rename = "heading_2", alias = "heading2")]
    Heading2,
    LinkPreview,
    Image,
    NumberedListItem,
}

/// One generated block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StructuredBlock {
    #[serde(rename = "type")]
    pub kind: StructuredBlockKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StructuredDocument {
    pub blocks: Vec<StructuredBlock>,
}

/// Strip a surrounding ```json fence, then parse and validate the document.
pub fn parse_structured_output(raw: &str) -> Result<StructuredDocument, SchemaError> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag, if any, along with the fence.
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();

    serde_json::from_str::<StructuredDocument>(text).map_err(|e| {
        let raw_excerpt: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
        error!(error = %e, raw = %raw_excerpt, "[PUBLISH] Structured output failed schema validation");
        SchemaError {
            message: e.to_string(),
            raw_excerpt,
        }
    })
}

/// A text run inside a rich-text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichText {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: TextContent,
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Annotations {
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichTextBody {
    pub rich_text: Vec<RichText>,
}

impl RichTextBody {
    fn single(content: impl Into<String>, code: bool) -> Self {
        Self {
            rich_text: vec![RichText {
                kind: "text",
                text: TextContent {
                    content: content.into(),
                },
                annotations: Annotations { code },
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalImage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub external: ExternalUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalUrl {
    pub url: String,
}

/// Native block of the document backend. Serializes as
/// `{"object": "block", "type": K, K: {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum NotionBlock {
    #[serde(rename = "paragraph")]
    Paragraph { paragraph: RichTextBody },
    #[serde(rename = "heading_1")]
    Heading1 { heading_1: RichTextBody },
    #[serde(rename = "heading_2")]
    Heading2 { heading_2: RichTextBody },
    #[serde(rename = "numbered_list_item")]
    NumberedListItem { numbered_list_item: RichTextBody },
    #[serde(rename = "image")]
    Image { image: ExternalImage },
}

impl NotionBlock {
    pub fn paragraph(text: impl Into<String>, code: bool) -> Self {
        NotionBlock::Paragraph {
            paragraph: RichTextBody::single(text, code),
        }
    }

    pub fn external_image(url: impl Into<String>) -> Self {
        NotionBlock::Image {
            image: ExternalImage {
                kind: "external",
                external: ExternalUrl { url: url.into() },
            },
        }
    }

    /// Backend type name of this block.
    pub fn type_name(&self) -> &'static str {
        match self {
            NotionBlock::Paragraph { .. } => "paragraph",
            NotionBlock::Heading1 { .. } => "heading_1",
            NotionBlock::Heading2 { .. } => "heading_2",
            NotionBlock::NumberedListItem { .. } => "numbered_list_item",
            NotionBlock::Image { .. } => "image",
        }
    }

    /// JSON value including the `"object": "block"` marker the backend expects.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.insert("object".to_string(), serde_json::Value::from("block"));
        }
        value
    }
}

/// Map generated blocks onto backend blocks, in order.
pub fn to_notion_blocks(document: &StructuredDocument, diagram_url: &str) -> Vec<NotionBlock> {
    document
        .blocks
        .iter()
        .map(|block| {
            let text = block.text.clone().unwrap_or_default();
            let code = block.is_code;
            match block.kind {
                StructuredBlockKind::Paragraph => NotionBlock::paragraph(text, code),
                StructuredBlockKind::Heading1 => NotionBlock::Heading1 {
                    heading_1: RichTextBody::single(text, code),
                },
                StructuredBlockKind::Heading2 => NotionBlock::Heading2 {
                    heading_2: RichTextBody::single(text, code),
                },
                StructuredBlockKind::NumberedListItem => NotionBlock::NumberedListItem {
                    numbered_list_item: RichTextBody::single(text, code),
                },
                StructuredBlockKind::Image => {
                    if let Some(embedded) = block.url.as_deref() {
                        debug!(embedded = %embedded, "[PUBLISH] Ignoring generated image URL");
                    }
                    NotionBlock::external_image(diagram_url)
                }
                StructuredBlockKind::LinkPreview => {
                    NotionBlock::paragraph(block.url.clone().unwrap_or_default(), false)
                }
            }
        })
        .collect()
}
