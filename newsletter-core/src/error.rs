//! Error taxonomy for a newsletter job.
//!
//! Each pipeline stage owns one error type. Only [`DiagramError`] is
//! recovered internally (by the diagram fallback chain); everything else
//! ends the job and surfaces through [`JobError`] to the orchestrator, where
//! it is logged and swallowed.

use std::path::PathBuf;

/// The repository could not be retrieved.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// URL did not parse or does not carry an owner and repository segment.
    #[error("invalid GitHub repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A single archive candidate answered with a non-200 status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Transport-level failure talking to an archive candidate.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The archive could not be written or unpacked.
    #[error("failed to unpack archive from {url}: {message}")]
    Extract { url: String, message: String },

    /// Unpacking succeeded but produced nothing.
    #[error("archive from {url} contained no entries")]
    EmptyArchive { url: String },

    /// Every archive candidate failed; `last` is the final underlying cause.
    #[error("failed to download repo from {repo_url}. Last error: {last}")]
    Exhausted { repo_url: String, last: String },
}

/// Selected repository content could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("directory {0:?} does not exist")]
    MissingDirectory(PathBuf),

    #[error("{path:?} is not valid UTF-8 text")]
    Decode { path: PathBuf },

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A text-generation call failed.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Transport(String),

    #[error("generation backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation backend returned no text")]
    Empty,

    /// Wraps another generation error with the article stage that produced it.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<GenerationError>,
    },
}

/// The diagram rendering service failed.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render request failed: {0}")]
    Transport(String),

    #[error("renderer returned HTTP {0}")]
    Status(u16),
}

/// Storing the rendered diagram failed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload request failed: {0}")]
    Transport(String),

    #[error("object store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// One failed render-then-store attempt inside the diagram fallback chain.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// The structuring stage produced text that does not fit the block schema.
#[derive(Debug, thiserror::Error)]
#[error("structured output does not match the block schema: {message}")]
pub struct SchemaError {
    pub message: String,
    /// Leading slice of the offending text, kept for diagnostics.
    pub raw_excerpt: String,
}

/// The document backend refused or failed the publish call.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publish request failed: {0}")]
    Transport(String),

    #[error("document backend returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Anything that ends a job early.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("could not allocate scratch directory under {path:?}: {source}")]
    Scratch {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl JobError {
    /// Stable label used as the `failure_kind` field in job logs.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Fetch(_) => "fetch",
            JobError::Read(_) => "read",
            JobError::Generation(_) => "generation",
            JobError::Schema(_) => "schema",
            JobError::Scratch { .. } => "scratch",
        }
    }
}
