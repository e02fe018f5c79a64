//! Diagram rasterization through the mermaid.ink image service.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use newsletter_core::contract::DiagramRenderer;
use newsletter_core::error::RenderError;
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub const MERMAID_INK_BASE_URL: &str = "https://mermaid.ink";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MermaidInkRenderer {
    client: Client,
    base_url: String,
}

impl MermaidInkRenderer {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RenderError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RenderError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Image URL for `diagram_source`. The source travels base64url-encoded in the path.
    pub fn image_url(&self, diagram_source: &str) -> String {
        let encoded = URL_SAFE.encode(diagram_source.as_bytes());
        format!(
            "{}/img/{encoded}?type=png&width=1024",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl DiagramRenderer for MermaidInkRenderer {
    async fn render(&self, diagram_source: &str) -> Result<Vec<u8>, RenderError> {
        let url = self.image_url(diagram_source);
        tracing::info!(source_len = diagram_source.len(), "[DIAGRAM] Requesting PNG from renderer");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::error!(status = status.as_u16(), "[DIAGRAM] Renderer returned non-200");
            return Err(RenderError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::Transport(e.to_string()))?;
        tracing::info!(bytes = bytes.len(), "[DIAGRAM] PNG rendered");
        Ok(bytes.to_vec())
    }
}
