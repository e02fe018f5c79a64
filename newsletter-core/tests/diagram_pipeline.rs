use std::sync::{Arc, Mutex};

use newsletter_core::config::{PipelineConfig, PLACEHOLDER_IMAGE_URL};
use newsletter_core::contract::{MockDiagramRenderer, MockObjectStore, MockTextGenerator};
use newsletter_core::diagram::{build_diagram, DiagramOrigin};
use newsletter_core::error::{GenerationError, RenderError, UploadError};
use newsletter_core::prompts;

const STORED_URL: &str = "https://newsletter-diagrams.s3.eu-west-1.amazonaws.com/diagram-1.png";

fn generator_returning(reply: &'static str) -> MockTextGenerator {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_complete()
        .withf(|instruction, _input| instruction.starts_with(prompts::DIAGRAM_GENERATOR))
        .times(1)
        .returning(move |_, _| Ok(reply.to_string()));
    generator
}

#[tokio::test]
async fn test_generated_diagram_is_sanitized_before_rendering() {
    let generator = generator_returning("```mermaid\ngraph TD\nA-->B\n```");
    let rendered = Arc::new(Mutex::new(Vec::<String>::new()));

    let mut renderer = MockDiagramRenderer::new();
    let seen = rendered.clone();
    renderer.expect_render().times(1).returning(move |source| {
        seen.lock().unwrap().push(source.to_string());
        Ok(vec![0x89, b'P', b'N', b'G'])
    });

    let mut store = MockObjectStore::new();
    store
        .expect_store_png()
        .withf(|name, bytes| name.starts_with("diagram-") && bytes.len() == 4)
        .times(1)
        .returning(|_, _| Ok(STORED_URL.to_string()));

    let asset = build_diagram(&generator, &renderer, &store, "<files></files>", &PipelineConfig::default()).await;

    assert_eq!(rendered.lock().unwrap().as_slice(), ["graph TD\nA-->B"]);
    assert_eq!(asset.url, STORED_URL);
    assert_eq!(asset.origin, DiagramOrigin::Generated);
}

#[tokio::test]
async fn test_render_failing_twice_yields_placeholder() {
    let generator = generator_returning("graph TD\nA-->B");

    let mut renderer = MockDiagramRenderer::new();
    renderer
        .expect_render()
        .times(2)
        .returning(|_| Err(RenderError::Status(503)));

    let mut store = MockObjectStore::new();
    store.expect_store_png().never();

    let asset = build_diagram(&generator, &renderer, &store, "ctx", &PipelineConfig::default()).await;

    assert_eq!(asset.url, PLACEHOLDER_IMAGE_URL);
    assert_eq!(asset.origin, DiagramOrigin::Placeholder);
}

#[tokio::test]
async fn test_upload_failure_falls_back_to_simplified_diagram() {
    let generator = generator_returning("graph TD\nA-->B");
    let config = PipelineConfig::default();

    let rendered = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut renderer = MockDiagramRenderer::new();
    let seen = rendered.clone();
    renderer.expect_render().times(2).returning(move |source| {
        seen.lock().unwrap().push(source.to_string());
        Ok(vec![1])
    });

    let mut store = MockObjectStore::new();
    let mut calls = 0;
    store.expect_store_png().times(2).returning(move |_, _| {
        calls += 1;
        if calls == 1 {
            Err(UploadError::Status {
                status: 403,
                body: "AccessDenied".into(),
            })
        } else {
            Ok(STORED_URL.to_string())
        }
    });

    let asset = build_diagram(&generator, &renderer, &store, "ctx", &config).await;

    assert_eq!(asset.origin, DiagramOrigin::Simplified);
    assert_eq!(asset.url, STORED_URL);
    let rendered = rendered.lock().unwrap();
    assert_eq!(rendered[0], "graph TD\nA-->B");
    assert_eq!(rendered[1], config.fallback_diagram);
}

#[tokio::test]
async fn test_generation_failure_goes_straight_to_simplified_diagram() {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_complete()
        .times(1)
        .returning(|_, _| Err(GenerationError::Transport("connection reset".into())));

    let config = PipelineConfig::default();
    let expected = config.fallback_diagram.clone();
    let mut renderer = MockDiagramRenderer::new();
    renderer
        .expect_render()
        .withf(move |source| source.trim() == expected.as_str())
        .times(1)
        .returning(|_| Ok(vec![1]));

    let mut store = MockObjectStore::new();
    store
        .expect_store_png()
        .times(1)
        .returning(|_, _| Ok(STORED_URL.to_string()));

    let asset = build_diagram(&generator, &renderer, &store, "ctx", &config).await;
    assert_eq!(asset.origin, DiagramOrigin::Simplified);
}

#[tokio::test]
async fn test_blank_generated_diagram_is_not_rendered() {
    let generator = generator_returning("```mermaid\n\n```");
    let mut renderer = MockDiagramRenderer::new();
    renderer
        .expect_render()
        .times(1)
        .returning(|_| Err(RenderError::Transport("timeout".into())));
    let mut store = MockObjectStore::new();
    store.expect_store_png().never();

    let asset = build_diagram(&generator, &renderer, &store, "ctx", &PipelineConfig::default()).await;
    assert_eq!(asset.url, PLACEHOLDER_IMAGE_URL);
}
