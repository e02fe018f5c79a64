//! # contract: ports between the newsletter pipeline and the outside world
//!
//! Every remote collaborator the pipeline talks to is expressed here as a
//! small async trait, so that the orchestration in [`crate::synchronise`]
//! can be exercised end to end with deterministic mocks.
//!
//! ## Ports
//! - [`SourceFetcher`]: retrieve and unpack a repository.
//! - [`TextGenerator`]: one LLM completion for an instruction plus input.
//! - [`DiagramRenderer`]: rasterize diagram source into PNG bytes.
//! - [`ObjectStore`]: store bytes and hand back a public URL.
//! - [`PagePublisher`]: create a page of blocks under a parent page.
//!
//! ## Mocking & Testing
//! - Each trait is annotated for `mockall`; the generated `Mock*` types are
//!   exported when the `test-export-mocks` feature is on (the default), so the
//!   service crate can reuse them in its own tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mockall::automock;

use crate::blocks::NotionBlock;
use crate::error::{FetchError, GenerationError, PublishError, RenderError, UploadError};

/// Everything the document backend needs to create one newsletter page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Page the new page is created under.
    pub parent_page_id: String,
    pub title: String,
    /// Ordered content of the page.
    pub children: Vec<NotionBlock>,
}

/// Trait for retrieving a repository's default-branch content.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Download `repo_url` and unpack it below `dest`, returning the path of
    /// the unpacked repository root.
    async fn fetch(&self, repo_url: &str, dest: &Path) -> Result<PathBuf, FetchError>;
}

/// Trait for a single text-generation call.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run `instruction` against `input` and return the generated text.
    async fn complete(&self, instruction: &str, input: &str) -> Result<String, GenerationError>;
}

/// Trait for turning diagram source into an image.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    /// Render diagram source to PNG bytes.
    async fn render(&self, diagram_source: &str) -> Result<Vec<u8>, RenderError>;
}

/// Trait for storing rendered images.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` as `<object_name>.png` and return its public URL.
    async fn store_png(&self, object_name: &str, bytes: Vec<u8>) -> Result<String, UploadError>;
}

/// Trait for the document backend the article is published to.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PagePublisher: Send + Sync {
    /// Create the page. Any non-success answer from the backend is an error.
    async fn create_page(&self, request: PageRequest) -> Result<(), PublishError>;
}
