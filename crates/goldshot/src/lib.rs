//! Goldshot: golden-screenshot comparison for browser tests
//!
//! Compares a fresh screenshot against a stored golden image. On mismatch it
//! writes a diff image and a copy of the capture next to each other so a
//! reviewer can see what changed. Dynamic page regions (clocks, ads) can be
//! hidden behind opaque overlays first with [`MaskController`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    GOLDSHOT Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ PageDriver │    │ Staged     │    │ Pixel      │            │
//! │   │ + Masks    │───►│ Screenshot │───►│ Oracle     │            │
//! │   │            │    │ (tempdir)  │    │ (CIEDE2000)│            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             ▼                    │
//! │                         Verdict / ComparisonError + artifacts    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use goldshot::{Comparator, CompareRequest, ScreenshotData};
//!
//! let comparator = Comparator::from_env();
//! let png = std::fs::read("capture.png")?;
//! let request = CompareRequest::new("goldens/home.png").with_output_folder("artifacts");
//! match comparator.compare(ScreenshotData::from(png), &request) {
//!     Ok(verdict) => println!("{verdict}"),
//!     Err(err) => eprintln!("{err}"),
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Chromium driver and browser configuration
pub mod browser;

mod color;
mod comparator;
mod config;
mod driver;
mod logging;
mod mask;

/// Pixel comparison and diff rendering
pub mod oracle;

mod result;
mod staging;

#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use browser::BrowserConfig;
pub use color::{ciede2000, perceptual_diff, HighlightColor, Lab};
pub use comparator::{ArtifactPaths, Comparator, CompareRequest, CURRENT_PREFIX, DIFF_PREFIX};
pub use config::{
    parse_flag, ComparisonOptions, ComparisonOverrides, GoldenConfig, UpdateMode,
    DEFAULT_TOLERANCE, STRICT_ENV, TOLERANCE_ENV, UPDATE_GOLDENS_ENV,
};
pub use driver::{BoundingBox, ElementHandle, MockDriver, MockMask, PageDriver};
pub use logging::{init_tracing, DEFAULT_FILTER};
pub use mask::{
    MaskController, MaskHandle, MaskOptions, MaskRect, DEFAULT_Z_INDEX, MASK_INJECT_SCRIPT,
    MASK_REMOVE_SCRIPT,
};
pub use oracle::{DiffRequest, ImageDiff, ImageOracle, OracleError, PixelOracle};
pub use result::{ComparisonError, GoldshotError, GoldshotResult, OutcomeKind, Verdict};
pub use staging::{ScreenshotData, StagedScreenshot, STAGED_FILE_NAME};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Comparator, CompareRequest, ComparisonError, ComparisonOverrides, ElementHandle,
        GoldenConfig, MaskController, MaskOptions, PageDriver, ScreenshotData, Verdict,
    };
}
