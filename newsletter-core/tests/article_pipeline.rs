use newsletter_core::article::write_article;
use newsletter_core::contract::MockTextGenerator;
use newsletter_core::error::GenerationError;
use newsletter_core::prompts;

#[tokio::test]
async fn test_each_stage_feeds_the_next() {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_complete()
        .times(3)
        .returning(|instruction, input| {
            if instruction == prompts::NEWSLETTER_WRITER {
                assert!(input.contains("<files>"));
                Ok("draft text".to_string())
            } else if instruction == prompts::NEWSLETTER_EDITOR {
                assert_eq!(input, "draft text");
                Ok("edited text".to_string())
            } else if instruction == prompts::TEXT_TO_BLOCKS {
                assert_eq!(input, "edited text");
                Ok(r#"{"blocks": []}"#.to_string())
            } else {
                Err(GenerationError::Empty)
            }
        });

    let article = write_article(&generator, "<files>\n</files>\n").await.unwrap();
    assert_eq!(article.draft, "draft text");
    assert_eq!(article.edited, "edited text");
    assert_eq!(article.structured, r#"{"blocks": []}"#);
}

#[tokio::test]
async fn test_failure_names_the_stage_and_stops() {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_complete()
        .times(2)
        .returning(|instruction, _| {
            if instruction == prompts::NEWSLETTER_EDITOR {
                Err(GenerationError::Status {
                    status: 429,
                    body: "quota".into(),
                })
            } else {
                Ok("draft text".to_string())
            }
        });

    let err = write_article(&generator, "ctx").await.unwrap_err();
    match err {
        GenerationError::Stage { stage, source } => {
            assert_eq!(stage, "edit");
            assert!(matches!(*source, GenerationError::Status { status: 429, .. }));
        }
        other => panic!("expected a stage error, got {other:?}"),
    }
}

#[test]
fn test_article_templates_carry_the_diagram_tag() {
    for template in [
        prompts::NEWSLETTER_WRITER,
        prompts::NEWSLETTER_EDITOR,
        prompts::TEXT_TO_BLOCKS,
    ] {
        assert!(template.contains(prompts::DIAGRAM_TAG));
    }
    assert!(!prompts::DIAGRAM_GENERATOR.contains(prompts::DIAGRAM_TAG));
}
