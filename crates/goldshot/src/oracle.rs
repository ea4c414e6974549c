//! Pixel-equality oracle.
//!
//! The comparator only needs two capabilities from an image backend: decide
//! whether two image files are equal under [`ComparisonOptions`], and render
//! a highlighted difference image. [`ImageOracle`] implements both with the
//! `image` crate.

use crate::color::{perceptual_diff, HighlightColor};
use crate::config::ComparisonOptions;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Infrastructure failure inside an oracle
#[derive(Debug, Error)]
pub enum OracleError {
    /// Image file missing, unreadable or corrupt
    #[error("cannot decode {}: {message}", .path.display())]
    Decode {
        /// File that failed to load
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Diff image could not be encoded
    #[error("cannot encode diff image: {message}")]
    Encode {
        /// Error message
        message: String,
    },

    /// Diff destination could not be prepared
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Inputs for rendering a difference image
#[derive(Debug, Clone, Copy)]
pub struct DiffRequest<'a> {
    /// Golden image
    pub reference: &'a Path,
    /// Captured image
    pub current: &'a Path,
    /// Where to write the diff
    pub diff: &'a Path,
    /// Colour for differing pixels
    pub highlight: HighlightColor,
    /// Options deciding which pixels differ
    pub options: ComparisonOptions,
}

/// Image equality and diff rendering capability
pub trait PixelOracle {
    /// Whether the images at `current` and `reference` are equal under `options`
    fn compare_images(
        &self,
        current: &Path,
        reference: &Path,
        options: &ComparisonOptions,
    ) -> Result<bool, OracleError>;

    /// Write a highlighted difference image
    fn render_diff(&self, request: &DiffRequest<'_>) -> Result<(), OracleError>;
}

/// Pixel statistics of a same-size comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDiff {
    /// Number of pixels that differ
    pub diff_pixel_count: usize,
    /// Total number of pixels compared
    pub total_pixels: usize,
    /// Largest perceptual distance seen
    pub max_distance: f64,
}

impl ImageDiff {
    /// Check if no pixel differs
    #[must_use]
    pub const fn is_identical(&self) -> bool {
        self.diff_pixel_count == 0
    }

    /// Percentage of pixels that differ (0.0-100.0)
    #[must_use]
    pub fn diff_percentage(&self) -> f64 {
        if self.total_pixels == 0 {
            0.0
        } else {
            (self.diff_pixel_count as f64 / self.total_pixels as f64) * 100.0
        }
    }
}

/// Oracle backed by the `image` crate.
///
/// Strict mode compares RGBA values exactly. Otherwise a pixel differs when
/// its alpha differs or its CIEDE2000 distance reaches the tolerance. Images
/// of different dimensions are never equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageOracle;

impl ImageOracle {
    /// Create a new oracle
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Load an image file as RGBA.
    ///
    /// The format is sniffed from the file contents, not its extension.
    pub fn load(path: &Path) -> Result<RgbaImage, OracleError> {
        let decode_error = |message: String| OracleError::Decode {
            path: path.to_path_buf(),
            message,
        };
        ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|e| decode_error(e.to_string()))?
            .decode()
            .map(|img| img.to_rgba8())
            .map_err(|e| decode_error(e.to_string()))
    }

    /// Encoding for a diff written to `path`: JPEG for `.jpg`/`.jpeg`, else PNG
    #[must_use]
    pub fn diff_format(path: &Path) -> ImageFormat {
        match ImageFormat::from_path(path) {
            Ok(ImageFormat::Jpeg) => ImageFormat::Jpeg,
            _ => ImageFormat::Png,
        }
    }

    /// Whether two pixels count as different
    #[must_use]
    pub fn pixels_differ(a: Rgba<u8>, b: Rgba<u8>, options: &ComparisonOptions) -> bool {
        if a == b {
            return false;
        }
        if options.strict || a.0[3] != b.0[3] {
            return true;
        }
        perceptual_diff(a, b) >= options.tolerance
    }

    /// Count differing pixels of two same-size images.
    ///
    /// Returns `None` when dimensions differ.
    #[must_use]
    pub fn diff(
        current: &RgbaImage,
        reference: &RgbaImage,
        options: &ComparisonOptions,
    ) -> Option<ImageDiff> {
        if current.dimensions() != reference.dimensions() {
            return None;
        }

        let mut diff_pixel_count = 0usize;
        let mut max_distance: f64 = 0.0;
        for (a, b) in current.pixels().zip(reference.pixels()) {
            if Self::pixels_differ(*a, *b, options) {
                diff_pixel_count += 1;
                max_distance = max_distance.max(perceptual_diff(*a, *b));
            }
        }

        Some(ImageDiff {
            diff_pixel_count,
            total_pixels: current.width() as usize * current.height() as usize,
            max_distance,
        })
    }

    /// Build the diff canvas: differing pixels get `highlight`, the rest copy
    /// the reference. Areas covered by only one image count as differing.
    #[must_use]
    pub fn diff_canvas(
        reference: &RgbaImage,
        current: &RgbaImage,
        highlight: HighlightColor,
        options: &ComparisonOptions,
    ) -> RgbaImage {
        let width = reference.width().max(current.width());
        let height = reference.height().max(current.height());
        let marker = highlight.to_rgba();

        RgbaImage::from_fn(width, height, |x, y| {
            let expected = reference
                .in_bounds(x, y)
                .then(|| *reference.get_pixel(x, y));
            let actual = current.in_bounds(x, y).then(|| *current.get_pixel(x, y));
            match (expected, actual) {
                (Some(e), Some(a)) if !Self::pixels_differ(a, e, options) => e,
                _ => marker,
            }
        })
    }
}

impl PixelOracle for ImageOracle {
    fn compare_images(
        &self,
        current: &Path,
        reference: &Path,
        options: &ComparisonOptions,
    ) -> Result<bool, OracleError> {
        let actual = Self::load(current)?;
        let expected = Self::load(reference)?;

        let equal = Self::diff(&actual, &expected, options).is_some_and(|d| d.is_identical());
        tracing::trace!(
            current = %current.display(),
            reference = %reference.display(),
            equal,
            "image comparison"
        );
        Ok(equal)
    }

    fn render_diff(&self, request: &DiffRequest<'_>) -> Result<(), OracleError> {
        let expected = Self::load(request.reference)?;
        let actual = Self::load(request.current)?;
        let canvas = Self::diff_canvas(&expected, &actual, request.highlight, &request.options);

        if let Some(parent) = request.diff.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| OracleError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let format = Self::diff_format(request.diff);
        let saved = match format {
            // JPEG has no alpha channel
            ImageFormat::Jpeg => DynamicImage::ImageRgba8(canvas)
                .to_rgb8()
                .save_with_format(request.diff, format),
            _ => canvas.save_with_format(request.diff, format),
        };
        saved.map_err(|e| OracleError::Encode {
            message: format!("{}: {e}", request.diff.display()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;

    /// Write a solid-colour PNG, optionally with one altered pixel
    pub(crate) fn write_png(
        path: &Path,
        size: (u32, u32),
        fill: Rgba<u8>,
        altered: Option<((u32, u32), Rgba<u8>)>,
    ) -> Vec<u8> {
        let mut img = RgbaImage::from_pixel(size.0, size.1, fill);
        if let Some(((x, y), pixel)) = altered {
            img.put_pixel(x, y, pixel);
        }
        img.save_with_format(path, ImageFormat::Png).unwrap();
        std::fs::read(path).unwrap()
    }

    const GRAY: Rgba<u8> = Rgba([100, 100, 100, 255]);

    #[test]
    fn test_identical_images_equal_strict_zero_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, (8, 8), GRAY, None);
        write_png(&b, (8, 8), GRAY, None);

        let options = ComparisonOptions::default()
            .with_strict(true)
            .with_tolerance(0.0);
        assert!(ImageOracle.compare_images(&a, &b, &options).unwrap());
    }

    #[test]
    fn test_one_pixel_changed_is_mismatch_strict() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, (8, 8), GRAY, None);
        write_png(&b, (8, 8), GRAY, Some(((3, 4), Rgba([101, 100, 100, 255]))));

        let options = ComparisonOptions::default()
            .with_strict(true)
            .with_tolerance(0.0);
        assert!(!ImageOracle.compare_images(&a, &b, &options).unwrap());
    }

    #[test]
    fn test_small_difference_within_default_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, (4, 4), GRAY, None);
        write_png(&b, (4, 4), GRAY, Some(((0, 0), Rgba([101, 100, 100, 255]))));

        assert!(ImageOracle
            .compare_images(&a, &b, &ComparisonOptions::default())
            .unwrap());
    }

    #[test]
    fn test_large_difference_exceeds_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, (4, 4), Rgba([255, 0, 0, 255]), None);
        write_png(&b, (4, 4), Rgba([0, 255, 0, 255]), None);

        assert!(!ImageOracle
            .compare_images(&a, &b, &ComparisonOptions::default())
            .unwrap());
    }

    #[test]
    fn test_alpha_difference_always_counts() {
        let options = ComparisonOptions::default().with_tolerance(100.0);
        assert!(ImageOracle::pixels_differ(
            Rgba([10, 10, 10, 255]),
            Rgba([10, 10, 10, 0]),
            &options
        ));
        assert!(!ImageOracle::pixels_differ(GRAY, GRAY, &options));
    }

    #[test]
    fn test_dimension_mismatch_is_not_equal() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a, (2, 2), GRAY, None);
        write_png(&b, (3, 3), GRAY, None);

        assert!(!ImageOracle
            .compare_images(&a, &b, &ComparisonOptions::default())
            .unwrap());
    }

    #[test]
    fn test_unreadable_image_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let corrupt = dir.path().join("corrupt.png");
        write_png(&a, (2, 2), GRAY, None);
        std::fs::write(&corrupt, b"definitely not a png").unwrap();

        let err = ImageOracle
            .compare_images(&a, &corrupt, &ComparisonOptions::default())
            .unwrap_err();
        assert!(matches!(err, OracleError::Decode { ref path, .. } if path == &corrupt));

        let missing = dir.path().join("missing.png");
        assert!(ImageOracle
            .compare_images(&a, &missing, &ComparisonOptions::default())
            .is_err());
    }

    #[test]
    fn test_diff_stats() {
        let current = RgbaImage::from_pixel(10, 10, GRAY);
        let mut reference = current.clone();
        reference.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        reference.put_pixel(9, 9, Rgba([255, 255, 255, 255]));

        let diff = ImageOracle::diff(&current, &reference, &ComparisonOptions::default()).unwrap();
        assert_eq!(diff.diff_pixel_count, 2);
        assert_eq!(diff.total_pixels, 100);
        assert!((diff.diff_percentage() - 2.0).abs() < f64::EPSILON);
        assert!(diff.max_distance > 2.5);
        assert!(!diff.is_identical());

        let other = RgbaImage::new(3, 3);
        assert!(ImageOracle::diff(&current, &other, &ComparisonOptions::default()).is_none());
    }

    #[test]
    fn test_render_diff_highlights_changed_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("ref.png");
        let current = dir.path().join("cur.png");
        let diff = dir.path().join("out/diff.png");
        write_png(&reference, (4, 4), GRAY, None);
        write_png(&current, (4, 4), GRAY, Some(((1, 2), Rgba([255, 255, 0, 255]))));

        ImageOracle
            .render_diff(&DiffRequest {
                reference: &reference,
                current: &current,
                diff: &diff,
                highlight: HighlightColor::MAGENTA,
                options: ComparisonOptions::default(),
            })
            .unwrap();

        let rendered = ImageOracle::load(&diff).unwrap();
        assert_eq!(rendered.dimensions(), (4, 4));
        assert_eq!(*rendered.get_pixel(1, 2), Rgba([255, 0, 255, 255]));
        assert_eq!(*rendered.get_pixel(0, 0), GRAY);
    }

    #[test]
    fn test_load_sniffs_format_from_contents() {
        let dir = tempfile::tempdir().unwrap();
        let png_as_jpg = dir.path().join("mislabelled.jpg");
        let no_extension = dir.path().join("button");
        write_png(&png_as_jpg, (3, 2), GRAY, None);
        write_png(&no_extension, (3, 2), GRAY, None);

        assert_eq!(ImageOracle::load(&png_as_jpg).unwrap().dimensions(), (3, 2));
        assert_eq!(*ImageOracle::load(&no_extension).unwrap().get_pixel(0, 0), GRAY);
    }

    #[test]
    fn test_jpeg_images_compare_equal() {
        let dir = tempfile::tempdir().unwrap();
        let jpeg = dir.path().join("capture.png");
        image::RgbImage::from_pixel(8, 8, image::Rgb([40, 90, 200]))
            .save_with_format(&jpeg, ImageFormat::Jpeg)
            .unwrap();

        assert!(ImageOracle
            .compare_images(&jpeg, &jpeg, &ComparisonOptions::default())
            .unwrap());
    }

    #[test]
    fn test_diff_format_follows_extension() {
        assert_eq!(ImageOracle::diff_format(Path::new("diff-a.jpg")), ImageFormat::Jpeg);
        assert_eq!(ImageOracle::diff_format(Path::new("diff-a.JPEG")), ImageFormat::Jpeg);
        assert_eq!(ImageOracle::diff_format(Path::new("diff-a.png")), ImageFormat::Png);
        assert_eq!(ImageOracle::diff_format(Path::new("diff-a")), ImageFormat::Png);
        assert_eq!(ImageOracle::diff_format(Path::new("diff-a.gif")), ImageFormat::Png);
    }

    #[test]
    fn test_render_diff_writes_jpeg_for_jpg_path() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("ref.png");
        let current = dir.path().join("cur.png");
        let diff = dir.path().join("diff-ref.jpg");
        write_png(&reference, (4, 4), GRAY, None);
        write_png(&current, (4, 4), GRAY, Some(((0, 0), Rgba([255, 255, 0, 255]))));

        ImageOracle
            .render_diff(&DiffRequest {
                reference: &reference,
                current: &current,
                diff: &diff,
                highlight: HighlightColor::MAGENTA,
                options: ComparisonOptions::default(),
            })
            .unwrap();

        let bytes = std::fs::read(&diff).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(ImageOracle::load(&diff).unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn test_diff_canvas_covers_both_sizes() {
        let reference = RgbaImage::from_pixel(2, 2, GRAY);
        let current = RgbaImage::from_pixel(3, 1, GRAY);
        let canvas = ImageOracle::diff_canvas(
            &reference,
            &current,
            HighlightColor::MAGENTA,
            &ComparisonOptions::default(),
        );
        assert_eq!(canvas.dimensions(), (3, 2));
        assert_eq!(*canvas.get_pixel(0, 0), GRAY);
        assert_eq!(*canvas.get_pixel(2, 0), HighlightColor::MAGENTA.to_rgba());
        assert_eq!(*canvas.get_pixel(0, 1), HighlightColor::MAGENTA.to_rgba());
    }

    #[test]
    fn test_render_diff_with_unreadable_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("ref.png");
        std::fs::write(&reference, b"junk").unwrap();
        let current = dir.path().join("cur.png");
        write_png(&current, (2, 2), GRAY, None);

        let result = ImageOracle.render_diff(&DiffRequest {
            reference: &reference,
            current: &current,
            diff: &dir.path().join("diff.png"),
            highlight: HighlightColor::MAGENTA,
            options: ComparisonOptions::default(),
        });
        assert!(result.is_err());
        assert!(!dir.path().join("diff.png").exists());
    }
}
