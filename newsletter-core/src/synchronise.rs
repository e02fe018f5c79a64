//! High-level pipeline: orchestrates fetch → select → diagram → article → publish
//! for one newsletter job.
//!
//! # Responsibilities
//! - Runs the stages of a [`NewsletterJob`] strictly in order, one at a time
//! - Gives every job its own scratch directory, removed on every exit path
//! - Funnels every failure, panics included, into a single structured log record; nothing above
//!   [`run_job_logged`] / [`spawn_job`] ever sees a job error
//!
//! # Error Handling
//! [`run_job`] returns the first fatal [`JobError`]. Diagram failures are not
//! fatal (see [`crate::diagram`]), and a refused publish is reported as a
//! [`PublishOutcome`], not an error.
//!
//! # Navigation
//! - Main entrypoint: [`run_job`]
//! - Fire-and-forget wrapper: [`spawn_job`]

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::article::write_article;
use crate::config::PipelineConfig;
use crate::contract::{DiagramRenderer, ObjectStore, PagePublisher, SourceFetcher, TextGenerator};
use crate::diagram::{build_diagram, DiagramAsset};
use crate::error::JobError;
use crate::preprocess::select_files;
use crate::publish::{publish, PublishOutcome};

/// One run of the pipeline for a repository/page pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterJob {
    pub job_id: Uuid,
    pub page_id: String,
    pub repo_url: String,
}

impl NewsletterJob {
    pub fn new(page_id: impl Into<String>, repo_url: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            page_id: page_id.into(),
            repo_url: repo_url.into(),
        }
    }
}

/// Handles to every remote collaborator a job uses.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub generator: Arc<dyn TextGenerator>,
    pub renderer: Arc<dyn DiagramRenderer>,
    pub store: Arc<dyn ObjectStore>,
    pub publisher: Arc<dyn PagePublisher>,
}

/// What a finished job did.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: Uuid,
    pub files_selected: usize,
    pub diagram: DiagramAsset,
    pub outcome: PublishOutcome,
}

/// Run every stage of `job` in order.
pub async fn run_job(
    collaborators: &Collaborators,
    config: &PipelineConfig,
    job: &NewsletterJob,
) -> Result<JobReport, JobError> {
    info!(job_id = %job.job_id, repo_url = %job.repo_url, page_id = %job.page_id, "[JOB] Starting newsletter job");

    // Dropping the guard removes the scratch tree, whether the job succeeds or not.
    std::fs::create_dir_all(&config.scratch_root).map_err(|source| JobError::Scratch {
        path: config.scratch_root.clone(),
        source,
    })?;
    let scratch = tempfile::Builder::new()
        .prefix(&format!("job-{}-", job.job_id.simple()))
        .tempdir_in(&config.scratch_root)
        .map_err(|source| JobError::Scratch {
            path: config.scratch_root.clone(),
            source,
        })?;

    // --- Step 1: Fetch ---
    let repo_root = collaborators
        .fetcher
        .fetch(&job.repo_url, scratch.path())
        .await?;
    info!(path = %repo_root.display(), "[JOB] Repository fetched");

    // --- Step 2: Select ---
    let bundle = select_files(&repo_root, Some(config.extensions.as_slice()))?;
    let context = bundle.to_prompt(&job.repo_url);

    // --- Step 3: Diagram (never fatal) ---
    let diagram = build_diagram(
        collaborators.generator.as_ref(),
        collaborators.renderer.as_ref(),
        collaborators.store.as_ref(),
        &context,
        config,
    )
    .await;
    info!(url = %diagram.url, origin = ?diagram.origin, "[JOB] Diagram resolved");

    // --- Step 4: Article ---
    let article = write_article(collaborators.generator.as_ref(), &context).await?;

    // --- Step 5: Publish ---
    let outcome = publish(
        collaborators.publisher.as_ref(),
        config,
        &job.page_id,
        &article.structured,
        &diagram.url,
    )
    .await?;

    info!(job_id = %job.job_id, outcome = ?outcome, "[JOB] Newsletter job finished");
    Ok(JobReport {
        job_id: job.job_id,
        files_selected: bundle.len(),
        diagram,
        outcome,
    })
}

/// Run `job` and log its result. Never returns an error.
pub async fn run_job_logged(collaborators: &Collaborators, config: &PipelineConfig, job: &NewsletterJob) {
    match run_job(collaborators, config, job).await {
        Ok(report) => {
            info!(
                job_id = %report.job_id,
                files = report.files_selected,
                diagram_origin = ?report.diagram.origin,
                published = report.outcome.is_published(),
                "[JOB] Newsletter processing completed"
            );
        }
        Err(e) => {
            error!(
                job_id = %job.job_id,
                page_id = %job.page_id,
                repo_url = %job.repo_url,
                failure_kind = e.kind(),
                error = %e,
                "[JOB][ERROR] Newsletter job failed"
            );
        }
    }
}

/// Detach `job` onto the runtime. The handle may be dropped; errors and
/// panics inside the job are logged with its identifiers.
pub fn spawn_job(
    collaborators: Arc<Collaborators>,
    config: Arc<PipelineConfig>,
    job: NewsletterJob,
) -> JoinHandle<()> {
    let span = info_span!(
        "job",
        job_id = %job.job_id,
        page_id = %job.page_id,
        repo_url = %job.repo_url
    );
    tokio::spawn(
        async move {
            let outcome = AssertUnwindSafe(run_job_logged(&collaborators, &config, &job))
                .catch_unwind()
                .await;
            if let Err(payload) = outcome {
                error!(
                    job_id = %job.job_id,
                    page_id = %job.page_id,
                    repo_url = %job.repo_url,
                    failure_kind = "panic",
                    error = %panic_message(payload.as_ref()),
                    "[JOB][ERROR] Newsletter job panicked"
                );
            }
        }
        .instrument(span),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
