//! Golden screenshot comparator.
//!
//! One call to [`Comparator::compare`] either updates the golden or performs a
//! comparison, never both:
//!
//! ```text
//! stage capture ──► update mode && golden missing ──► write golden ──► Updated
//!        │
//!        └──► oracle ──► error ─────────────────────────────► Oracle
//!                  ├──► equal ───────────────────────────────► Pass
//!                  └──► differ ──► update mode ──► overwrite ► Updated
//!                               ├► output folder ► diff + current ► MismatchWithDiff
//!                               └► otherwise ────────────────► Mismatch
//! ```
//!
//! Concurrent comparisons against the same golden are not coordinated; in
//! update mode the last write wins.

use crate::config::{ComparisonOverrides, GoldenConfig};
use crate::oracle::{DiffRequest, ImageOracle, PixelOracle};
use crate::result::{ComparisonError, Verdict};
use crate::staging::{ScreenshotData, StagedScreenshot};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Prefix of the highlighted-difference artifact
pub const DIFF_PREFIX: &str = "diff-";
/// Prefix of the copied capture artifact
pub const CURRENT_PREFIX: &str = "current-";

/// Where to compare and where to put artifacts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompareRequest {
    /// Golden image path
    pub golden: PathBuf,
    /// Directory for diff artifacts (None = never persist diffs)
    pub output_folder: Option<PathBuf>,
    /// Per-call option overrides
    pub overrides: ComparisonOverrides,
}

impl CompareRequest {
    /// Compare against `golden`
    #[must_use]
    pub fn new(golden: impl Into<PathBuf>) -> Self {
        Self {
            golden: golden.into(),
            output_folder: None,
            overrides: ComparisonOverrides::default(),
        }
    }

    /// Save diff artifacts in `folder` on mismatch
    #[must_use]
    pub fn with_output_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.output_folder = Some(folder.into());
        self
    }

    /// Override comparison options for this call
    #[must_use]
    pub const fn with_overrides(mut self, overrides: ComparisonOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Artifact paths derived from a golden's file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `diff-<name>` inside the output folder
    pub diff: PathBuf,
    /// `current-<name>` inside the output folder
    pub current: PathBuf,
}

impl ArtifactPaths {
    /// Derive artifact paths for `golden` inside `folder`
    pub fn derive(golden: &Path, folder: &Path) -> Result<Self, ComparisonError> {
        let name = golden
            .file_name()
            .ok_or_else(|| ComparisonError::GoldenPath {
                golden: golden.to_path_buf(),
            })?;
        let prefixed = |prefix: &str| {
            let mut file = OsString::from(prefix);
            file.push(name);
            folder.join(file)
        };
        Ok(Self {
            diff: prefixed(DIFF_PREFIX),
            current: prefixed(CURRENT_PREFIX),
        })
    }
}

/// Compares captures against golden images
#[derive(Debug, Clone)]
pub struct Comparator<O = ImageOracle> {
    oracle: O,
    config: GoldenConfig,
}

impl Default for Comparator<ImageOracle> {
    fn default() -> Self {
        Self::new(GoldenConfig::default())
    }
}

impl Comparator<ImageOracle> {
    /// Comparator using the built-in image oracle
    #[must_use]
    pub const fn new(config: GoldenConfig) -> Self {
        Self::with_oracle(ImageOracle::new(), config)
    }

    /// Comparator configured from `UPDATE_GOLDENS` and friends
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GoldenConfig::from_env())
    }
}

impl<O: PixelOracle> Comparator<O> {
    /// Comparator with a custom oracle
    #[must_use]
    pub const fn with_oracle(oracle: O, config: GoldenConfig) -> Self {
        Self { oracle, config }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &GoldenConfig {
        &self.config
    }

    /// Get the oracle
    #[must_use]
    pub const fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Compare `data` against `golden` with default options and no artifacts
    pub fn compare_screenshot(
        &self,
        data: impl Into<ScreenshotData>,
        golden: impl AsRef<Path>,
    ) -> Result<Verdict, ComparisonError> {
        self.compare(data, &CompareRequest::new(golden.as_ref()))
    }

    /// Compare a capture against its golden, or update the golden.
    ///
    /// # Errors
    ///
    /// Staging failures, oracle failures, mismatches (with or without diff
    /// artifacts), diff rendering failures and golden/artifact write failures.
    pub fn compare(
        &self,
        data: impl Into<ScreenshotData>,
        request: &CompareRequest,
    ) -> Result<Verdict, ComparisonError> {
        let data = data.into();
        let golden = request.golden.as_path();
        let staged = StagedScreenshot::stage(&data, self.config.staging_root.as_deref())?;
        let update = self.config.update_mode.is_update();

        if update && !golden.exists() {
            tracing::info!(golden = %golden.display(), "creating missing golden");
            return self.write_golden(&staged, golden);
        }

        let options = self.config.options.merge(&request.overrides);
        let equal = self
            .oracle
            .compare_images(staged.path(), golden, &options)
            .map_err(|e| {
                tracing::error!(golden = %golden.display(), error = %e, "oracle failed");
                ComparisonError::Oracle(e)
            })?;

        if equal {
            tracing::debug!(golden = %golden.display(), "screenshot matches golden");
            return Ok(Verdict::Pass);
        }

        if update {
            tracing::info!(golden = %golden.display(), "overwriting mismatching golden");
            return self.write_golden(&staged, golden);
        }

        let Some(folder) = request.output_folder.as_deref() else {
            tracing::warn!(golden = %golden.display(), "screenshot mismatch");
            return Err(ComparisonError::Mismatch {
                golden: golden.to_path_buf(),
            });
        };

        let artifacts = ArtifactPaths::derive(golden, folder)?;
        self.oracle
            .render_diff(&DiffRequest {
                reference: golden,
                current: staged.path(),
                diff: &artifacts.diff,
                highlight: self.config.highlight,
                options,
            })
            .map_err(|e| {
                tracing::error!(diff = %artifacts.diff.display(), error = %e, "diff rendering failed");
                ComparisonError::DiffWrite(e)
            })?;
        staged.copy_to(&artifacts.current)?;

        tracing::warn!(
            golden = %golden.display(),
            diff = %artifacts.diff.display(),
            current = %artifacts.current.display(),
            "screenshot mismatch, artifacts saved"
        );
        Err(ComparisonError::MismatchWithDiff {
            current: artifacts.current,
            golden: golden.to_path_buf(),
            diff: artifacts.diff,
        })
    }

    fn write_golden(
        &self,
        staged: &StagedScreenshot,
        golden: &Path,
    ) -> Result<Verdict, ComparisonError> {
        staged.copy_to(golden)?;
        Ok(Verdict::Updated {
            golden: golden.to_path_buf(),
        })
    }
}
