use std::io::{Cursor, Write};

use newsletter_core::contract::SourceFetcher;
use newsletter_core::download::ArchiveFetcher;
use newsletter_core::error::FetchError;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// Zip laid out like a GitHub branch archive: one top-level folder.
fn repo_archive(top: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.add_directory(format!("{top}/"), options).unwrap();
    writer
        .start_file(format!("{top}/README.md"), options)
        .unwrap();
    writer.write_all(b"# Widget\nA tiny widget.\n").unwrap();
    writer
        .start_file(format!("{top}/src/main.py"), options)
        .unwrap();
    writer.write_all(b"print('widget')\n").unwrap();
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn test_fetch_main_branch_archive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/archive/refs/heads/main.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(repo_archive("widget-main")))
        .expect(1)
        .mount(&server)
        .await;

    let dest = tempdir().unwrap();
    let fetcher = ArchiveFetcher::with_base_url(server.uri()).unwrap();
    let root = fetcher
        .fetch("https://github.com/acme/widget", dest.path())
        .await
        .expect("main archive should be fetched");

    assert!(root.ends_with("widget-main"), "unexpected root {root:?}");
    assert!(root.starts_with(dest.path()));
    let readme = std::fs::read_to_string(root.join("README.md")).unwrap();
    assert!(readme.contains("tiny widget"));
}

#[tokio::test]
async fn test_fetch_falls_back_to_master() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/archive/refs/heads/main.zip"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/archive/refs/heads/master.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(repo_archive("widget-master")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/archive/HEAD.zip"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dest = tempdir().unwrap();
    let fetcher = ArchiveFetcher::with_base_url(server.uri()).unwrap();
    let root = fetcher
        .fetch("https://github.com/acme/widget.git", dest.path())
        .await
        .unwrap();
    assert!(root.ends_with("widget-master"));
}

#[tokio::test]
async fn test_fetch_corrupt_archive_moves_to_next_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/archive/refs/heads/main.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a zip".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/archive/refs/heads/master.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/archive/HEAD.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(repo_archive("widget-abc123")))
        .mount(&server)
        .await;

    let dest = tempdir().unwrap();
    let fetcher = ArchiveFetcher::with_base_url(server.uri()).unwrap();
    let root = fetcher
        .fetch("https://github.com/acme/widget", dest.path())
        .await
        .unwrap();
    assert!(root.ends_with("widget-abc123"));
}

/// Archive whose central directory is intact but whose file data fails the CRC check.
fn crc_corrupted_archive(top: &str) -> Vec<u8> {
    let content = b"PARTIAL-CONTENT-MARKER";
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer
        .start_file(format!("{top}/README.md"), options)
        .unwrap();
    writer.write_all(content).unwrap();
    let mut bytes = writer.finish().unwrap().into_inner();
    let at = bytes
        .windows(content.len())
        .position(|w| w == content)
        .unwrap();
    bytes[at] ^= 0xff;
    bytes
}

#[tokio::test]
async fn test_fetch_discards_partial_tree_of_failed_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/archive/refs/heads/main.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(crc_corrupted_archive("aaa-partial")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/widget/archive/refs/heads/master.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(repo_archive("widget-master")))
        .expect(1)
        .mount(&server)
        .await;

    let dest = tempdir().unwrap();
    let fetcher = ArchiveFetcher::with_base_url(server.uri()).unwrap();
    let root = fetcher
        .fetch("https://github.com/acme/widget", dest.path())
        .await
        .unwrap();

    assert!(root.ends_with("widget-master"), "unexpected root {root:?}");
    assert!(root.join("README.md").is_file());
    let leftovers: Vec<_> = std::fs::read_dir(dest.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(leftovers.len(), 1, "only the winning candidate remains: {leftovers:?}");
    assert!(root.starts_with(&leftovers[0]));
}

#[tokio::test]
async fn test_fetch_all_candidates_fail_with_one_aggregated_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let dest = tempdir().unwrap();
    let fetcher = ArchiveFetcher::with_base_url(server.uri()).unwrap();
    let err = fetcher
        .fetch("https://github.com/acme/widget", dest.path())
        .await
        .unwrap_err();

    match &err {
        FetchError::Exhausted { repo_url, last } => {
            assert_eq!(repo_url, "https://github.com/acme/widget");
            assert!(last.contains("404"), "last error was {last}");
            assert!(last.contains("HEAD.zip"), "last error was {last}");
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
    assert!(err
        .to_string()
        .starts_with("failed to download repo from https://github.com/acme/widget. Last error:"));
}

#[tokio::test]
async fn test_fetch_rejects_url_without_repo_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dest = tempdir().unwrap();
    let fetcher = ArchiveFetcher::with_base_url(server.uri()).unwrap();
    for url in ["https://github.com/acme", "https://github.com/", "not a url"] {
        let err = fetcher.fetch(url, dest.path()).await.unwrap_err();
        assert!(
            matches!(err, FetchError::InvalidUrl { .. }),
            "{url} gave {err:?}"
        );
    }
}
