//! Staging of captured screenshots on disk.
//!
//! Every comparison writes its capture into a fresh, uniquely named temporary
//! directory so concurrent comparisons never share a staging file.

use crate::result::ComparisonError;
use base64::Engine;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name of the staged capture inside its temp directory
pub const STAGED_FILE_NAME: &str = "new.png";

const DATA_URL_MARKER: &str = ";base64,";

/// Encoded pixel payload produced by a capture step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenshotData {
    /// Encoded image bytes (PNG, JPEG)
    Bytes(Vec<u8>),
    /// Base64 text of encoded image bytes, optionally as a `data:` URL
    Base64(String),
}

impl ScreenshotData {
    /// Wrap a base64 payload
    #[must_use]
    pub fn base64(text: impl Into<String>) -> Self {
        Self::Base64(text.into())
    }

    /// Decoded image bytes
    pub fn decode(&self) -> Result<Cow<'_, [u8]>, base64::DecodeError> {
        match self {
            Self::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            Self::Base64(text) => {
                let payload = text
                    .find(DATA_URL_MARKER)
                    .map_or(text.as_str(), |idx| &text[idx + DATA_URL_MARKER.len()..]);
                let compact: String = payload
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .map(Cow::Owned)
            }
        }
    }
}

impl From<Vec<u8>> for ScreenshotData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for ScreenshotData {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

/// A capture written to its own temporary directory.
///
/// The directory is removed when this value is dropped.
#[derive(Debug)]
pub struct StagedScreenshot {
    dir: TempDir,
    path: PathBuf,
}

impl StagedScreenshot {
    /// Decode `data` and write it as [`STAGED_FILE_NAME`] in a new temp directory
    pub fn stage(data: &ScreenshotData, root: Option<&Path>) -> Result<Self, ComparisonError> {
        let bytes = data.decode().map_err(|e| ComparisonError::Staging {
            message: format!("invalid base64 payload: {e}"),
        })?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("goldshot-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| ComparisonError::Staging {
            message: format!("cannot create temp directory: {e}"),
        })?;

        let path = dir.path().join(STAGED_FILE_NAME);
        std::fs::write(&path, &bytes).map_err(|e| ComparisonError::Staging {
            message: format!("cannot write {}: {e}", path.display()),
        })?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "staged screenshot");
        Ok(Self { dir, path })
    }

    /// Path of the staged file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temporary directory holding the staged file
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Copy the staged bytes to `dest`, creating parent directories
    pub fn copy_to(&self, dest: &Path) -> Result<(), ComparisonError> {
        let to_error = |source| ComparisonError::Filesystem {
            path: dest.to_path_buf(),
            source,
        };
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(to_error)?;
        }
        std::fs::copy(&self.path, dest).map_err(to_error)?;
        Ok(())
    }
}
