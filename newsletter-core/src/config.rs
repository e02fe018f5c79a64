use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// Image used when neither the generated nor the simplified diagram could be
/// rendered and stored.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1551288049-bebda4e38f71?w=400&h=300&fit=crop&crop=center";

/// Diagram rendered when the generated one is unusable.
pub const FALLBACK_DIAGRAM: &str = "graph TD\nA[User] --> B[System]\nB --> C[Result]";

/// Page id the webhook sender uses for dry runs.
pub const SENTINEL_PAGE_ID: &str = "notion-page-id";

/// Read-only settings shared by every job. Built once at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory under which each job gets its own scratch directory.
    pub scratch_root: PathBuf,
    /// File-name suffixes fed to generation as context.
    pub extensions: Vec<String>,
    pub placeholder_image_url: String,
    pub fallback_diagram: String,
    pub sentinel_page_id: String,
    /// Page ids shorter than this are never sent to the backend.
    pub min_page_id_len: usize,
    pub page_title: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir().join("newsletter_repos"),
            extensions: vec!["md".to_string(), "py".to_string()],
            placeholder_image_url: PLACEHOLDER_IMAGE_URL.to_string(),
            fallback_diagram: FALLBACK_DIAGRAM.to_string(),
            sentinel_page_id: SENTINEL_PAGE_ID.to_string(),
            min_page_id_len: 32,
            page_title: "Newsletter Draft".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            scratch_root = %self.scratch_root.display(),
            extensions = ?self.extensions,
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}
