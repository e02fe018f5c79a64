use tracing::{error, info};

use crate::contract::TextGenerator;
use crate::error::GenerationError;
use crate::prompts;

/// Outputs of the three article stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub draft: String,
    pub edited: String,
    /// Block-schema JSON text, not yet validated.
    pub structured: String,
}

/// Draft, edit and structure the article. Each stage feeds the next; the
/// first failure aborts and names its stage.
pub async fn write_article(
    generator: &dyn TextGenerator,
    context: &str,
) -> Result<Article, GenerationError> {
    let draft = run_stage(generator, "draft", prompts::NEWSLETTER_WRITER, context).await?;
    let edited = run_stage(generator, "edit", prompts::NEWSLETTER_EDITOR, &draft).await?;
    let structured = run_stage(generator, "structure", prompts::TEXT_TO_BLOCKS, &edited).await?;

    info!(
        raw = %structured.chars().take(500).collect::<String>(),
        "[ARTICLE] Structured blocks raw output"
    );
    Ok(Article {
        draft,
        edited,
        structured,
    })
}

async fn run_stage(
    generator: &dyn TextGenerator,
    stage: &'static str,
    instruction: &str,
    input: &str,
) -> Result<String, GenerationError> {
    info!(stage, input_len = input.len(), "[ARTICLE] Running stage");
    match generator.complete(instruction, input).await {
        Ok(output) => {
            info!(stage, output_len = output.len(), "[ARTICLE] Stage complete");
            Ok(output)
        }
        Err(e) => {
            error!(stage, error = %e, "[ARTICLE] Stage failed");
            Err(GenerationError::Stage {
                stage,
                source: Box::new(e),
            })
        }
    }
}
