//! Source Fetcher: download a GitHub repository's default branch as a zip
//! archive and unpack it into a caller-owned directory.
//!
//! Three archive locations are tried in order (`main`, `master`, `HEAD`);
//! the first 200 wins. A failed candidate is logged and skipped, only the
//! exhaustion of all three is an error.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use tracing::{debug, error, info, warn};

use crate::contract::SourceFetcher;
use crate::error::FetchError;

pub const GITHUB_BASE_URL: &str = "https://github.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Owner and repository name extracted from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
}

/// Extract `{owner, repo}` from a repository URL.
///
/// Fails before any I/O when the URL does not parse or carries fewer than two
/// non-empty path segments.
pub fn parse_repo_url(repo_url: &str) -> Result<RepoCoordinates, FetchError> {
    let invalid = |reason: &str| FetchError::InvalidUrl {
        url: repo_url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(repo_url.trim()).map_err(|e| invalid(&e.to_string()))?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if segments.len() < 2 {
        return Err(invalid("expected /<owner>/<repository> in the path"));
    }

    let owner = segments[0].to_string();
    let repo = segments[1]
        .strip_suffix(".git")
        .unwrap_or(segments[1])
        .to_string();
    if repo.is_empty() {
        return Err(invalid("repository name is empty"));
    }

    Ok(RepoCoordinates { owner, repo })
}

/// Archive URLs to try, in order.
pub fn archive_candidates(base_url: &str, coords: &RepoCoordinates) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    let RepoCoordinates { owner, repo } = coords;
    vec![
        format!("{base}/{owner}/{repo}/archive/refs/heads/main.zip"),
        format!("{base}/{owner}/{repo}/archive/refs/heads/master.zip"),
        format!("{base}/{owner}/{repo}/archive/HEAD.zip"),
    ]
}

/// Fetches repositories as zip archives over HTTP.
pub struct ArchiveFetcher {
    client: Client,
    base_url: String,
}

impl ArchiveFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(GITHUB_BASE_URL)
    }

    /// Point the fetcher at a GitHub-compatible archive host.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport {
                url: base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }

    /// Try one archive URL: download, unpack into a fresh directory below `dest`,
/// return the unpacked root.
    async fn try_candidate(&self, url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        let extract = |message: String| FetchError::Extract {
            url: url.to_string(),
            message,
        };

        info!(url = %url, "[FETCH] Trying archive candidate");
        let mut response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        debug!(url = %url, status = %status, "[FETCH] Archive response");

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(
                url = %url,
                status = status.as_u16(),
                body = %body.chars().take(200).collect::<String>(),
                "[FETCH] Archive candidate returned non-200"
            );
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Stream to a temp file outside `dest` so it never shows up as an extracted entry.
        let mut archive = tempfile::Builder::new()
            .suffix(".zip")
            .tempfile()
            .map_err(|e| extract(e.to_string()))?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            archive
                .write_all(&chunk)
                .map_err(|e| extract(e.to_string()))?;
            written += chunk.len();
        }
        archive.flush().map_err(|e| extract(e.to_string()))?;
        info!(url = %url, bytes = written, "[FETCH] Download successful, extracting");

        // Each candidate unpacks into its own directory; a failed attempt
        // takes its partial tree with it when the guard drops.
        let unpack_dir = tempfile::Builder::new()
            .prefix("candidate-")
            .tempdir_in(dest)
            .map_err(|e| extract(e.to_string()))?;

        let archive_path = archive.path().to_path_buf();
        let unpack_path = unpack_dir.path().to_path_buf();
        tokio::task::spawn_blocking(move || unpack(&archive_path, &unpack_path))
            .await
            .map_err(|e| extract(e.to_string()))?
            .map_err(extract)?;
        // `archive` drops here and removes the intermediate zip.
        drop(archive);

        let root = first_entry(unpack_dir.path())
            .map_err(|e| extract(e.to_string()))?
            .ok_or_else(|| FetchError::EmptyArchive {
                url: url.to_string(),
            })?;
        // Removal of the kept tree is left to the owner of `dest`.
        let _ = unpack_dir.into_path();
        info!(url = %url, path = %root.display(), "[FETCH] Extracted repository");
        Ok(root)
    }
}

#[async_trait::async_trait]
impl SourceFetcher for ArchiveFetcher {
    async fn fetch(&self, repo_url: &str, dest: &Path) -> Result<PathBuf, FetchError> {
        let coords = parse_repo_url(repo_url)?;
        fs::create_dir_all(dest).map_err(|e| FetchError::Extract {
            url: repo_url.to_string(),
            message: format!("cannot create {}: {e}", dest.display()),
        })?;

        let mut last_error: Option<FetchError> = None;
        for candidate in archive_candidates(&self.base_url, &coords) {
            match self.try_candidate(&candidate, dest).await {
                Ok(path) => return Ok(path),
                Err(e) => {
                    warn!(url = %candidate, error = %e, "[FETCH] Candidate failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no archive candidates".to_string());
        error!(repo_url = %repo_url, last_error = %last, "[FETCH] All archive candidates failed");
        Err(FetchError::Exhausted {
            repo_url: repo_url.to_string(),
            last,
        })
    }
}

fn unpack(archive_path: &Path, dest: &Path) -> Result<(), String> {
    let file = File::open(archive_path).map_err(|e| e.to_string())?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;
    zip.extract(dest).map_err(|e| e.to_string())
}

/// First top-level entry of `dir`, preferring directories, in name order.
fn first_entry(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    let dir_entry = entries.iter().find(|p| p.is_dir()).cloned();
    Ok(dir_entry.or_else(|| entries.into_iter().next()))
}
