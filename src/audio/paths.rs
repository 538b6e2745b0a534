//! Memo file location
//!
//! The memo is stored in the user's documents directory:
//! ~/Documents/MyAudioMemo.m4a (or wherever `dirs` resolves it).

use std::fs;
use std::path::{Path, PathBuf};

use super::recorder::AudioError;

/// Alert text shown when the documents directory cannot be resolved.
pub const DOCUMENT_DIR_ERROR: &str =
    "Failed to get the document directory for recording the audio. Please try again later.";

/// The user's documents directory.
pub fn document_dir() -> Result<PathBuf, AudioError> {
    dirs::document_dir().ok_or(AudioError::NoDocumentDirectory)
}

/// Path of the memo file inside `dir`.
pub fn memo_path_in(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(file_name)
}

/// Resolve the memo path, preferring `override_dir` over the documents directory.
pub fn memo_path(override_dir: Option<&Path>, file_name: &str) -> Result<PathBuf, AudioError> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => document_dir()?,
    };
    Ok(memo_path_in(&dir, file_name))
}

/// Create the directory that will hold the memo if it doesn't exist.
pub fn ensure_memo_dir(memo: &Path) -> Result<(), AudioError> {
    if let Some(parent) = memo.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AudioError::FileCreationFailed(format!("{}: {}", parent.display(), e))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memo_path_uses_override_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = memo_path(Some(dir.path()), "MyAudioMemo.m4a").unwrap();
        assert_eq!(path, dir.path().join("MyAudioMemo.m4a"));
    }

    #[test]
    fn ensure_memo_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let memo = dir.path().join("nested").join("memos").join("MyAudioMemo.m4a");
        ensure_memo_dir(&memo).unwrap();
        assert!(memo.parent().unwrap().is_dir());
    }

    #[test]
    fn missing_document_dir_has_user_facing_message() {
        assert_eq!(AudioError::NoDocumentDirectory.to_string(), DOCUMENT_DIR_ERROR);
    }
}
