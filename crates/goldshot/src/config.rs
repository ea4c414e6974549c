//! Comparison options and golden configuration.
//!
//! The update flag is an explicit value handed to the comparator. The process
//! environment is only read by [`GoldenConfig::from_env`].

use crate::color::HighlightColor;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment key enabling golden update mode
pub const UPDATE_GOLDENS_ENV: &str = "UPDATE_GOLDENS";
/// Environment key overriding the default tolerance
pub const TOLERANCE_ENV: &str = "GOLDSHOT_TOLERANCE";
/// Environment key overriding the default strictness
pub const STRICT_ENV: &str = "GOLDSHOT_STRICT";

/// Default perceptual tolerance (CIEDE2000 units)
pub const DEFAULT_TOLERANCE: f64 = 2.5;

/// Exact flag match: only `"1"` and `"true"` enable a flag.
///
/// Case variants such as `"TRUE"` are off.
#[must_use]
pub fn parse_flag(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true"))
}

/// Options forwarded to the pixel oracle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOptions {
    /// Exact pixel matching instead of perceptual matching
    pub strict: bool,
    /// Allowed perceptual distance before two pixels differ
    pub tolerance: f64,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            strict: false,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ComparisonOptions {
    /// Set strict mode
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the tolerance
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Apply caller overrides field by field
    #[must_use]
    pub fn merge(self, overrides: &ComparisonOverrides) -> Self {
        Self {
            strict: overrides.strict.unwrap_or(self.strict),
            tolerance: overrides.tolerance.unwrap_or(self.tolerance),
        }
    }
}

/// Per-call option overrides; unset fields keep the configured default
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOverrides {
    /// Strict mode override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    /// Tolerance override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
}

impl ComparisonOverrides {
    /// No overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override strict mode
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Override tolerance
    #[must_use]
    pub const fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
}

/// Whether mismatches fail or rewrite the golden
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Compare against the golden and fail on mismatch
    #[default]
    Compare,
    /// Create missing goldens and overwrite mismatching ones
    Update,
}

impl UpdateMode {
    /// Build from a raw flag value using [`parse_flag`]
    #[must_use]
    pub fn from_flag(value: Option<&str>) -> Self {
        if parse_flag(value) {
            Self::Update
        } else {
            Self::Compare
        }
    }

    /// Whether goldens are rewritten
    #[must_use]
    pub const fn is_update(self) -> bool {
        matches!(self, Self::Update)
    }
}

/// Comparator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenConfig {
    /// Update or compare
    pub update_mode: UpdateMode,
    /// Options used when a call gives no overrides
    pub options: ComparisonOptions,
    /// Colour for differing pixels in diff images
    pub highlight: HighlightColor,
    /// Parent directory for staging directories (None = system temp dir)
    pub staging_root: Option<PathBuf>,
}

impl Default for GoldenConfig {
    fn default() -> Self {
        Self {
            update_mode: UpdateMode::Compare,
            options: ComparisonOptions::default(),
            highlight: HighlightColor::MAGENTA,
            staging_root: None,
        }
    }
}

impl GoldenConfig {
    /// Create a default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default()
            .with_update_mode(UpdateMode::from_flag(lookup(UPDATE_GOLDENS_ENV).as_deref()));

        if let Some(raw) = lookup(TOLERANCE_ENV) {
            match raw.trim().parse::<f64>() {
                Ok(tolerance) if tolerance.is_finite() && tolerance >= 0.0 => {
                    config.options.tolerance = tolerance;
                }
                _ => tracing::warn!(key = TOLERANCE_ENV, value = %raw, "ignoring invalid tolerance"),
            }
        }
        if let Some(raw) = lookup(STRICT_ENV) {
            config.options.strict = parse_flag(Some(raw.as_str()));
        }

        tracing::debug!(
            update = config.update_mode.is_update(),
            strict = config.options.strict,
            tolerance = config.options.tolerance,
            "loaded golden config"
        );
        config
    }

    /// Set the update mode
    #[must_use]
    pub const fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    /// Set default comparison options
    #[must_use]
    pub const fn with_options(mut self, options: ComparisonOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the diff highlight colour
    #[must_use]
    pub const fn with_highlight(mut self, color: HighlightColor) -> Self {
        self.highlight = color;
        self
    }

    /// Stage captures under this directory
    #[must_use]
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }
}
