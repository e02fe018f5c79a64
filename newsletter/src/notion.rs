use async_trait::async_trait;
use newsletter_core::contract::{PageRequest, PagePublisher};
use newsletter_core::error::PublishError;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

pub const NOTION_BASE_URL: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates child pages through the Notion pages API.
pub struct NotionClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NotionClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

/// JSON body of a create-page call.
pub fn page_body(request: &PageRequest) -> Value {
    let children: Vec<Value> = request.children.iter().map(|b| b.to_json()).collect();
    json!({
        "parent": { "page_id": request.parent_page_id },
        "properties": {
            "title": {
                "title": [{ "text": { "content": request.title } }]
            }
        },
        "children": children,
    })
}

#[async_trait]
impl PagePublisher for NotionClient {
    async fn create_page(&self, request: PageRequest) -> Result<(), PublishError> {
        let url = format!("{}/v1/pages", self.base_url.trim_end_matches('/'));
        let body = page_body(&request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK {
            tracing::info!(
                parent_page_id = %request.parent_page_id,
                blocks = request.children.len(),
                "[PUBLISH] Page created"
            );
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            parent_page_id = %request.parent_page_id,
            status = status.as_u16(),
            body = %body,
            "[PUBLISH] Notion rejected the page"
        );
        Err(PublishError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
