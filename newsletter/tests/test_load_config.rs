use newsletter::load_config::{load_config, Secrets, DEFAULT_BIND};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

const VARS: [(&str, &str); 7] = [
    ("API_KEY", "api"),
    ("GEMINI_API_KEY", "gemini"),
    ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
    ("AWS_SECRET_ACCESS_KEY", "secret"),
    ("AWS_S3_REGION", "eu-west-1"),
    ("AWS_S3_BUCKET", "newsletter-diagrams"),
    ("NOTION_API_KEY", "notion"),
];

fn set_all() {
    for (k, v) in VARS {
        std::env::set_var(k, v);
    }
}

fn clear_all() {
    for (k, _) in VARS {
        std::env::remove_var(k);
    }
}

#[test]
fn test_no_file_means_defaults() {
    let config = load_config(None).unwrap();
    assert_eq!(config.server.bind, DEFAULT_BIND);
    assert_eq!(config.pipeline.extensions, vec!["md", "py"]);
    assert_eq!(config.pipeline.min_page_id_len, 32);
    assert_eq!(config.services.gemini_model, "gemini-1.5-flash");
    assert_eq!(config.services.github_base_url, "https://github.com");
    assert!(config.services.s3_endpoint.is_none());
}

#[test]
fn test_partial_yaml_keeps_other_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
server:
  bind: "127.0.0.1:9000"
pipeline:
  extensions: ["md", "rs"]
  page_title: "Weekly Repo"
services:
  s3_endpoint: "http://localhost:4566"
"#
    )
    .unwrap();

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:9000");
    assert_eq!(config.pipeline.extensions, vec!["md", "rs"]);
    assert_eq!(config.pipeline.page_title, "Weekly Repo");
    assert_eq!(config.pipeline.sentinel_page_id, "notion-page-id");
    assert_eq!(config.services.s3_endpoint.as_deref(), Some("http://localhost:4566"));
    assert_eq!(config.services.notion_base_url, "https://api.notion.com");
}

#[test]
fn test_empty_file_means_defaults() {
    let file = NamedTempFile::new().unwrap();
    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.server.bind, DEFAULT_BIND);
}

#[test]
fn test_missing_file_and_bad_yaml_are_errors() {
    let err = load_config(Some(std::path::Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "pipeline:\n  min_page_id_len: lots").unwrap();
    let err = load_config(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config YAML"));
}

#[test]
#[serial]
fn test_secrets_from_env() {
    set_all();
    let secrets = Secrets::from_env().unwrap();
    assert_eq!(secrets.aws_bucket, "newsletter-diagrams");
    assert_eq!(secrets.notion_api_key, "notion");
    let debug = format!("{secrets:?}");
    assert!(!debug.contains("secret\""));
    assert!(!debug.contains("gemini"));
    clear_all();
}

#[test]
#[serial]
fn test_missing_secret_names_the_variable() {
    set_all();
    std::env::remove_var("NOTION_API_KEY");
    let err = Secrets::from_env().unwrap_err();
    assert!(format!("{err:#}").contains("NOTION_API_KEY"));

    std::env::set_var("NOTION_API_KEY", "   ");
    let err = Secrets::from_env().unwrap_err();
    assert!(err.to_string().contains("NOTION_API_KEY"));
    clear_all();
}
