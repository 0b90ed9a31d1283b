use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 100;

/// Stores uploaded attachments as `<uuid>-<sanitized name>` under one directory.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    dir: PathBuf,
}

impl AttachmentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the file and returns the path recorded on the ticket.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!("{}-{}", Uuid::new_v4(), sanitize_filename(original_name));
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;
        info!(path = %path.display(), size = bytes.len(), "stored attachment");
        Ok(path.to_string_lossy().into_owned())
    }

    /// Deletes a file written by [`save`](Self::save) whose ticket never landed.
    pub async fn discard(&self, stored_path: &str) {
        match tokio::fs::remove_file(stored_path).await {
            Ok(()) => info!(path = %stored_path, "discarded orphaned attachment"),
            Err(e) => warn!(path = %stored_path, error = %e, "failed to discard attachment"),
        }
    }
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; drops any directory part.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    let truncated: String = trimmed.chars().take(MAX_NAME_LEN).collect();
    if truncated.is_empty() {
        "attachment".to_string()
    } else {
        truncated
    }
}
