//! Journal path checks shared by the commands.

use std::path::{Path, PathBuf};

/// Resolves `input` to an existing regular file.
pub fn validate_journal_path(input: &str) -> Result<PathBuf, String> {
    if input.trim().is_empty() {
        return Err("journal path is empty".to_string());
    }
    let path = PathBuf::from(input);
    let metadata = std::fs::metadata(&path)
        .map_err(|e| format!("{}: {}", display_name(&path), e))?;
    if !metadata.is_file() {
        return Err(format!("{} is not a regular file", display_name(&path)));
    }
    Ok(path)
}

/// File name only, so errors do not echo full local paths.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<journal>".to_string())
}
