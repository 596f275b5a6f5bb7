//! Resume loader. Plain text only: `.txt` and `.md` are read as-is, `.json`
//! is re-rendered as indented JSON so the judge sees one field per line.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("cannot read resume {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported resume format `{0}` (expected .txt, .md or .json)")]
    Unsupported(String),

    #[error("resume {0} is not valid JSON: {1}")]
    InvalidJson(PathBuf, serde_json::Error),

    #[error("resume {0} is empty")]
    Empty(PathBuf),
}

pub async fn load_resume(path: &Path) -> Result<String, ResumeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !matches!(ext.as_str(), "txt" | "md" | "json") {
        return Err(ResumeError::Unsupported(ext));
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ResumeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let text = if ext == "json" {
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| ResumeError::InvalidJson(path.to_path_buf(), e))?;
        serde_json::to_string_pretty(&value)
            .map_err(|e| ResumeError::InvalidJson(path.to_path_buf(), e))?
    } else {
        raw
    };

    if text.trim().is_empty() {
        return Err(ResumeError::Empty(path.to_path_buf()));
    }
    debug!("Loaded resume {} ({} chars)", path.display(), text.len());
    Ok(text)
}
