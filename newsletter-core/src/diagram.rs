//! Diagram Pipeline: generate a Mermaid workflow diagram for the repository,
//! render it and store the image, degrading gracefully at every step.
//!
//! The degrade policy is an ordered list of [`DiagramAttempt`]s run by
//! [`first_successful`]: the generated diagram, then a fixed simplified
//! diagram, then the placeholder image URL. [`build_diagram`] never fails.

use std::sync::LazyLock;

use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::contract::{DiagramRenderer, ObjectStore, TextGenerator};
use crate::error::DiagramError;
use crate::prompts;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^`{3,}[A-Za-z0-9_-]*").expect("static regex"));

/// Where the diagram URL of a job came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramOrigin {
    Generated,
    Simplified,
    Placeholder,
}

/// Public URL of the job's diagram image. Fixed for the rest of the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramAsset {
    pub url: String,
    pub origin: DiagramOrigin,
}

/// One step of the fallback chain.
pub struct DiagramAttempt<'a> {
    pub origin: DiagramOrigin,
    pub run: BoxFuture<'a, Result<String, DiagramError>>,
}

/// Remove a surrounding code fence (with optional language tag) and trim.
pub fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(found) = OPENING_FENCE.find(text) {
        text = &text[found.end()..];
    }
    let without_closing = text.trim_end_matches('`');
    if text.len() - without_closing.len() >= 3 {
        text = without_closing;
    }
    text.trim().to_string()
}

/// Normalise diagram source for the renderer.
///
/// Drops blank and fence lines, trims every line and rewrites curly braces to
/// square brackets. Applying it twice gives the same result as applying it once.
pub fn sanitize_diagram(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .map(|line| line.replace('{', "[").replace('}', "]"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn raw generation output into renderable diagram source.
pub fn extract_diagram(raw: &str) -> String {
    sanitize_diagram(&strip_fences(raw))
}

/// Render `source` and store the image, returning its public URL.
pub async fn render_and_store(
    renderer: &dyn DiagramRenderer,
    store: &dyn ObjectStore,
    source: &str,
) -> Result<String, DiagramError> {
    let png = renderer.render(source).await?;
    let id = Uuid::new_v4().simple().to_string();
    let object_name = format!("diagram-{}", &id[..8]);
    info!(object = %object_name, size = png.len(), "[DIAGRAM] Rendered, uploading");
    let url = store.store_png(&object_name, png).await?;
    Ok(url)
}

/// Run attempts in order and return the first non-empty URL, or the placeholder.
pub async fn first_successful(attempts: Vec<DiagramAttempt<'_>>, placeholder: &str) -> DiagramAsset {
    for attempt in attempts {
        match attempt.run.await {
            Ok(url) if !url.trim().is_empty() => {
                info!(origin = ?attempt.origin, url = %url, "[DIAGRAM] Diagram available");
                return DiagramAsset {
                    url,
                    origin: attempt.origin,
                };
            }
            Ok(_) => {
                warn!(origin = ?attempt.origin, "[DIAGRAM] Attempt returned an empty URL");
            }
            Err(e) => {
                warn!(origin = ?attempt.origin, error = %e, "[DIAGRAM] Attempt failed");
            }
        }
    }
    warn!(url = %placeholder, "[DIAGRAM] All attempts failed, using placeholder");
    DiagramAsset {
        url: placeholder.to_string(),
        origin: DiagramOrigin::Placeholder,
    }
}

/// Produce the job's diagram URL. Always returns a usable URL.
pub async fn build_diagram(
    generator: &dyn TextGenerator,
    renderer: &dyn DiagramRenderer,
    store: &dyn ObjectStore,
    context: &str,
    config: &PipelineConfig,
) -> DiagramAsset {
    let generated = match generator.complete(prompts::DIAGRAM_GENERATOR, context).await {
        Ok(raw) => {
            let source = extract_diagram(&raw);
            info!(
                diagram = %source.chars().take(200).collect::<String>(),
                "[DIAGRAM] Cleaned Mermaid code"
            );
            Some(source).filter(|s| !s.is_empty())
        }
        Err(e) => {
            warn!(error = %e, "[DIAGRAM] Diagram generation failed, skipping to simplified diagram");
            None
        }
    };

    let mut attempts = Vec::with_capacity(2);
    if let Some(source) = generated.as_deref() {
        attempts.push(DiagramAttempt {
            origin: DiagramOrigin::Generated,
            run: render_and_store(renderer, store, source).boxed(),
        });
    }
    attempts.push(DiagramAttempt {
        origin: DiagramOrigin::Simplified,
        run: render_and_store(renderer, store, &config.fallback_diagram).boxed(),
    });

    first_successful(attempts, &config.placeholder_image_url).await
}
