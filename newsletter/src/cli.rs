/// # repo-newsletter CLI
///
/// Command parsing and wiring for the `repo-newsletter` binary. Pipeline
/// logic lives in `newsletter-core`; this module only builds the concrete
/// collaborators from configuration and hands control to the server or to a
/// single foreground job.
///
/// ## Subcommands
/// - `serve`: run the webhook server
/// - `run`: run one job in the foreground and print its report, which is the
///   quickest way to check a set of credentials end to end
use crate::gemini::GeminiClient;
use crate::load_config::{load_config, AppConfig, Secrets};
use crate::mermaid_ink::MermaidInkRenderer;
use crate::notion::NotionClient;
use crate::server::{run_server, AppState};
use crate::upload::{S3Settings, S3Store};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use newsletter_core::download::ArchiveFetcher;
use newsletter_core::synchronise::{run_job, Collaborators, NewsletterJob};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[clap(
    name = "repo-newsletter",
    version,
    about = "Turn a GitHub repository into a newsletter page"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook server
    Serve {
        /// Path to an optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Address to listen on; overrides `server.bind`
        #[clap(long)]
        bind: Option<String>,
    },
    /// Run one newsletter job in the foreground
    Run {
        /// GitHub repository URL
        #[clap(long)]
        repo: String,
        /// Parent page id to publish under
        #[clap(long)]
        page: String,
        /// Path to an optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Build every concrete collaborator from settings and secrets.
pub fn build_collaborators(config: &AppConfig, secrets: &Secrets) -> Result<Collaborators> {
    let services = &config.services;
    let fetcher = ArchiveFetcher::with_base_url(services.github_base_url.clone())
        .context("building repository fetcher")?;
    let generator = GeminiClient::new(
        secrets.gemini_api_key.clone(),
        services.gemini_base_url.clone(),
        services.gemini_model.clone(),
    )
    .context("building Gemini client")?;
    let renderer = MermaidInkRenderer::new(services.mermaid_ink_base_url.clone())
        .context("building diagram renderer")?;
    let store = S3Store::new(S3Settings {
        bucket: secrets.aws_bucket.clone(),
        region: secrets.aws_region.clone(),
        access_key_id: secrets.aws_access_key_id.clone(),
        secret_access_key: secrets.aws_secret_access_key.clone(),
        endpoint: services.s3_endpoint.clone(),
    })
    .context("building S3 store")?;
    let publisher = NotionClient::new(secrets.notion_api_key.clone(), services.notion_base_url.clone())
        .context("building Notion client")?;

    Ok(Collaborators {
        fetcher: Arc::new(fetcher),
        generator: Arc::new(generator),
        renderer: Arc::new(renderer),
        store: Arc::new(store),
        publisher: Arc::new(publisher),
    })
}

/// Async entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve { config, bind } => {
            let config = load_config(config.as_deref())?;
            let secrets = Secrets::from_env()?;
            let collaborators = build_collaborators(&config, &secrets)?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            tracing::info!(command = "serve", bind = %bind, "Starting server");

            let state = AppState {
                api_key: Arc::from(secrets.api_key.as_str()),
                collaborators: Arc::new(collaborators),
                pipeline: Arc::new(config.pipeline),
            };
            run_server(&bind, state).await
        }
        Commands::Run { repo, page, config } => {
            let config = load_config(config.as_deref())?;
            let secrets = Secrets::from_env()?;
            let collaborators = build_collaborators(&config, &secrets)?;
            let job = NewsletterJob::new(page, repo);
            tracing::info!(command = "run", job_id = %job.job_id, "Running job in the foreground");

            match run_job(&collaborators, &config.pipeline, &job).await {
                Ok(report) => {
                    println!("job:      {}", report.job_id);
                    println!("files:    {}", report.files_selected);
                    println!("diagram:  {} ({:?})", report.diagram.url, report.diagram.origin);
                    println!("outcome:  {:?}", report.outcome);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "run", failure_kind = e.kind(), error = %e, "Job failed");
                    Err(anyhow::Error::new(e).context(format!("job {} failed", job.job_id)))
                }
            }
        }
    }
}
