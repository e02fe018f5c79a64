use tracing::{error, info, warn};

use crate::blocks::{parse_structured_output, to_notion_blocks};
use crate::config::PipelineConfig;
use crate::contract::{PageRequest, PagePublisher};
use crate::error::SchemaError;

/// Result of a publish attempt that got past schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { blocks: usize },
    /// The page id looked like a test value; the backend was not contacted.
    SkippedPlaceholderPage,
    /// The backend refused the page or could not be reached.
    Rejected(String),
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

/// True when `page_id` is the sentinel or too short to be a real page id.
pub fn is_placeholder_page_id(page_id: &str, config: &PipelineConfig) -> bool {
    page_id == config.sentinel_page_id || page_id.len() < config.min_page_id_len
}

/// Parse the structured article, map it onto backend blocks and create the page.
///
/// Schema problems are errors; everything after parsing is reported through
/// [`PublishOutcome`].
pub async fn publish(
    publisher: &dyn PagePublisher,
    config: &PipelineConfig,
    page_id: &str,
    raw_structured: &str,
    diagram_url: &str,
) -> Result<PublishOutcome, SchemaError> {
    let document = parse_structured_output(raw_structured)?;
    let children = to_notion_blocks(&document, diagram_url);

    if is_placeholder_page_id(page_id, config) {
        warn!(
            page_id = %page_id,
            "[PUBLISH] Page id looks like a test value, not creating a page"
        );
        return Ok(PublishOutcome::SkippedPlaceholderPage);
    }

    let blocks = children.len();
    info!(page_id = %page_id, blocks, "[PUBLISH] Attempting to create page");
    let request = PageRequest {
        parent_page_id: page_id.to_string(),
        title: config.page_title.clone(),
        children,
    };

    match publisher.create_page(request).await {
        Ok(()) => {
            info!(page_id = %page_id, blocks, "[PUBLISH] Newsletter added successfully");
            Ok(PublishOutcome::Published { blocks })
        }
        Err(e) => {
            error!(page_id = %page_id, error = %e, "[PUBLISH] Failed to add newsletter");
            Ok(PublishOutcome::Rejected(e.to_string()))
        }
    }
}
