//! Result and error types for goldshot.

use crate::oracle::OracleError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for goldshot browser and configuration operations
pub type GoldshotResult<T> = Result<T, GoldshotError>;

/// Errors raised outside the comparison decision procedure
#[derive(Debug, Error)]
pub enum GoldshotError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    ScreenshotError {
        /// Error message
        message: String,
    },

    /// In-page script execution failed
    #[error("Script execution failed: {message}")]
    ScriptError {
        /// Error message
        message: String,
    },

    /// Element has no bounding box (detached, hidden or never rendered)
    #[error("Element {selector} is not rendered")]
    ElementNotRendered {
        /// Selector of the element
        selector: String,
    },

    /// Mask parameters rejected before reaching the browser
    #[error("Invalid mask: {message}")]
    InvalidMask {
        /// Error message
        message: String,
    },

    /// Highlight colour could not be parsed
    #[error("Invalid color {value:?}: expected #rrggbb")]
    InvalidColor {
        /// Rejected input
        value: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a comparison outcome.
///
/// Lets callers branch on what happened without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// Capture matched the golden
    Pass,
    /// Golden was created or overwritten
    Updated,
    /// Capture differs, nothing persisted
    Mismatch,
    /// Capture differs, diff artifacts written
    MismatchWithDiff,
    /// Equality oracle failed
    OracleError,
    /// Diff rendering failed while reporting a mismatch
    DiffWriteError,
    /// Captured bytes could not be staged
    StagingError,
    /// Golden or artifact file could not be written
    FilesystemError,
}

/// Successful comparison outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Capture matched the golden within tolerance
    Pass,
    /// Golden was written from the capture (update mode)
    Updated {
        /// Golden that was written
        golden: PathBuf,
    },
}

impl Verdict {
    /// Outcome classification
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Pass => OutcomeKind::Pass,
            Self::Updated { .. } => OutcomeKind::Updated,
        }
    }

    /// Whether the golden file was written
    #[must_use]
    pub const fn is_update(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => f.write_str("The test passed. "),
            Self::Updated { golden } => write!(
                f,
                "Reference image {} was successfully updated.",
                golden.display()
            ),
        }
    }
}

/// Failed comparison outcome
#[derive(Debug, Error)]
pub enum ComparisonError {
    /// Temp directory creation, payload decoding or staging write failed
    #[error("Failed to stage screenshot: {message}")]
    Staging {
        /// Error message
        message: String,
    },

    /// Equality oracle reported an infrastructure failure
    #[error("There has been an error. Error: {0}")]
    Oracle(#[source] OracleError),

    /// Images differ and no output folder was given
    #[error("Screenshots do not match for {}.", .golden.display())]
    Mismatch {
        /// Golden the capture was compared with
        golden: PathBuf,
    },

    /// Images differ; diff and current artifacts were written
    #[error(
        "Screenshot {} do not match for {}. Difference picture is saved as {}.",
        .current.display(),
        .golden.display(),
        .diff.display()
    )]
    MismatchWithDiff {
        /// Copy of the capture
        current: PathBuf,
        /// Golden the capture was compared with
        golden: PathBuf,
        /// Highlighted difference image
        diff: PathBuf,
    },

    /// Images differ and the diff image could not be rendered
    #[error("An error occurred while saving the diff image: {0}")]
    DiffWrite(#[source] OracleError),

    /// Golden path has no file name to derive artifact names from
    #[error("Reference path {} has no file name", .golden.display())]
    GoldenPath {
        /// Offending golden path
        golden: PathBuf,
    },

    /// Writing the golden or an artifact failed
    #[error("Failed to write {}: {source}", .path.display())]
    Filesystem {
        /// Destination that could not be written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl ComparisonError {
    /// Outcome classification
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Staging { .. } => OutcomeKind::StagingError,
            Self::Oracle(_) => OutcomeKind::OracleError,
            Self::Mismatch { .. } => OutcomeKind::Mismatch,
            Self::MismatchWithDiff { .. } => OutcomeKind::MismatchWithDiff,
            Self::DiffWrite(_) => OutcomeKind::DiffWriteError,
            Self::GoldenPath { .. } | Self::Filesystem { .. } => OutcomeKind::FilesystemError,
        }
    }

    /// True when the images differ, as opposed to tooling failures
    #[must_use]
    pub const fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. } | Self::MismatchWithDiff { .. })
    }

    /// Artifact files written for this failure, current first then diff
    #[must_use]
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        match self {
            Self::MismatchWithDiff { current, diff, .. } => vec![current.clone(), diff.clone()],
            _ => Vec::new(),
        }
    }
}
