use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, error, info};

use crate::error::ReadError;

/// Text of the selected repository files, keyed by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentBundle {
    pub files: BTreeMap<String, String>,
}

impl ContentBundle {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Render the bundle as generation context for the given repository.
    pub fn to_prompt(&self, repo_url: &str) -> String {
        let mut prompt = String::from("<files>\n");
        for (name, content) in &self.files {
            let _ = writeln!(prompt, "<file name=\"{name}\">\n{content}\n</file>");
        }
        prompt.push_str("</files>\n<github link>\n");
        prompt.push_str(repo_url);
        prompt.push_str("\n</github link>\n");
        prompt
    }
}

/// Read the direct children of `dir` whose names end with one of `extensions`.
///
/// Not recursive; subdirectories are skipped. With `extensions` set to `None`
/// every regular file is read.
pub fn select_files(dir: &Path, extensions: Option<&[String]>) -> Result<ContentBundle, ReadError> {
    info!(path = %dir.display(), ?extensions, "[SELECT] Reading repository files");
    if !dir.is_dir() {
        error!(path = %dir.display(), "[SELECT] Directory does not exist");
        return Err(ReadError::MissingDirectory(dir.to_path_buf()));
    }

    let io_err = |path: &Path, source: std::io::Error| ReadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            debug!(path = %path.display(), "[SELECT] Skipping directory");
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let wanted = match extensions {
            None => true,
            Some(exts) => exts.iter().any(|ext| name.ends_with(ext.as_str())),
        };
        if !wanted {
            continue;
        }

        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::InvalidData => ReadError::Decode { path: path.clone() },
            _ => io_err(&path, e),
        })?;
        debug!(file = %name, size = content.len(), "[SELECT] Selected file");
        files.insert(name, content);
    }

    info!(count = files.len(), "[SELECT] Completed file selection");
    Ok(ContentBundle { files })
}
