//! Opaque overlays for dynamic page regions.
//!
//! A mask is a plain absolutely positioned `div` covering an element (scaled
//! and offset as requested) so timestamps, animations or ads render as a
//! solid block in captures.

use crate::driver::{BoundingBox, ElementHandle, PageDriver};
use crate::result::{GoldshotError, GoldshotResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;

/// Default stacking order, above typical page content
pub const DEFAULT_Z_INDEX: i64 = 10_000;

/// Creates the overlay and returns its id.
///
/// Arguments: x, y, width, height, color, zIndex.
pub const MASK_INJECT_SCRIPT: &str = r"
const [x, y, width, height, color, zIndex] = arguments;
const el = document.createElement('div');
const registry = (window.__goldshotMasks = window.__goldshotMasks || {});
window.__goldshotMaskSeq = (window.__goldshotMaskSeq || 0) + 1;
el.id = 'goldshot-mask-' + window.__goldshotMaskSeq;
Object.assign(el.style, {
  position: 'absolute',
  left: x + 'px',
  top: y + 'px',
  width: width + 'px',
  height: height + 'px',
  backgroundColor: color,
  opacity: '1',
  zIndex: String(zIndex),
  pointerEvents: 'none',
});
document.body.appendChild(el);
registry[el.id] = el;
return el.id;
";

/// Detaches the overlay with id `arguments[0]`; throws if it is gone.
pub const MASK_REMOVE_SCRIPT: &str = r"
const registry = window.__goldshotMasks || {};
const el = registry[arguments[0]];
delete registry[arguments[0]];
el.parentNode.removeChild(el);
return null;
";

/// Mask appearance and placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskOptions {
    /// CSS colour of the overlay
    pub color: String,
    /// Stacking order
    pub z_index: i64,
    /// Added to the element's x
    pub x_offset: f64,
    /// Added to the element's y
    pub y_offset: f64,
    /// Scales width and height; position is not scaled
    pub size_multiplier: f64,
}

impl MaskOptions {
    /// Mask of `color` with default placement
    #[must_use]
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            z_index: DEFAULT_Z_INDEX,
            x_offset: 0.0,
            y_offset: 0.0,
            size_multiplier: 1.0,
        }
    }

    /// Set the z-index
    #[must_use]
    pub const fn with_z_index(mut self, z_index: i64) -> Self {
        self.z_index = z_index;
        self
    }

    /// Set position offsets
    #[must_use]
    pub const fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.x_offset = x;
        self.y_offset = y;
        self
    }

    /// Set the size multiplier
    #[must_use]
    pub const fn with_size_multiplier(mut self, multiplier: f64) -> Self {
        self.size_multiplier = multiplier;
        self
    }

    /// Reject placements that cannot produce a visible overlay
    pub fn validate(&self) -> GoldshotResult<()> {
        if !(self.size_multiplier.is_finite() && self.size_multiplier > 0.0) {
            return Err(GoldshotError::InvalidMask {
                message: format!(
                    "size multiplier must be a positive number, got {}",
                    self.size_multiplier
                ),
            });
        }
        if !(self.x_offset.is_finite() && self.y_offset.is_finite()) {
            return Err(GoldshotError::InvalidMask {
                message: "offsets must be finite".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self::new("black")
    }
}

/// Rectangle covered by a mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskRect {
    /// X coordinate of top-left corner
    pub x: f64,
    /// Y coordinate of top-left corner
    pub y: f64,
    /// Width of mask region
    pub width: f64,
    /// Height of mask region
    pub height: f64,
}

impl MaskRect {
    /// Offset the box position and scale its size
    #[must_use]
    pub fn from_bounding_box(bbox: BoundingBox, options: &MaskOptions) -> Self {
        Self {
            x: bbox.x + options.x_offset,
            y: bbox.y + options.y_offset,
            width: bbox.width * options.size_multiplier,
            height: bbox.height * options.size_multiplier,
        }
    }
}

/// An overlay currently in the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskHandle {
    /// In-page id of the overlay element
    pub id: String,
    /// Area the overlay covers
    pub rect: MaskRect,
}

/// Adds and removes masks through a [`PageDriver`]
#[derive(Debug)]
pub struct MaskController<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
}

impl<'a, D: PageDriver + ?Sized> MaskController<'a, D> {
    /// Controller over `driver`
    #[must_use]
    pub const fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    /// Cover `element` with an opaque overlay.
    ///
    /// # Errors
    ///
    /// Invalid options, an element without a bounding box, or a failing
    /// script execution.
    pub async fn add_mask(
        &self,
        element: &ElementHandle,
        options: &MaskOptions,
    ) -> GoldshotResult<MaskHandle> {
        options.validate()?;
        let bbox = self.driver.bounding_box(element).await?;
        let rect = MaskRect::from_bounding_box(bbox, options);

        let args = vec![
            json!(rect.x),
            json!(rect.y),
            json!(rect.width),
            json!(rect.height),
            json!(options.color),
            json!(options.z_index),
        ];
        let id = match self.driver.execute_script(MASK_INJECT_SCRIPT, args).await? {
            Value::String(id) => id,
            other => {
                return Err(GoldshotError::ScriptError {
                    message: format!("mask script returned {other} instead of an id"),
                })
            }
        };

        tracing::debug!(
            selector = %element.selector,
            mask = %id,
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "mask added"
        );
        Ok(MaskHandle { id, rect })
    }

    /// Remove a mask. Removing the same mask twice fails.
    pub async fn remove_mask(&self, mask: &MaskHandle) -> GoldshotResult<()> {
        self.driver
            .execute_script(MASK_REMOVE_SCRIPT, vec![json!(mask.id)])
            .await?;
        tracing::debug!(mask = %mask.id, "mask removed");
        Ok(())
    }

    /// Run `body` with `element` masked; the mask is removed on every exit.
    ///
    /// A body error takes precedence over a removal error.
    pub async fn with_mask<F, Fut, T>(
        &self,
        element: &ElementHandle,
        options: &MaskOptions,
        body: F,
    ) -> GoldshotResult<T>
    where
        F: FnOnce(MaskHandle) -> Fut,
        Fut: Future<Output = GoldshotResult<T>>,
    {
        let mask = self.add_mask(element, options).await?;
        let outcome = body(mask.clone()).await;
        let removed = self.remove_mask(&mask).await;

        match (outcome, removed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), removed) => {
                if let Err(remove_err) = removed {
                    tracing::warn!(mask = %mask.id, error = %remove_err, "mask cleanup failed");
                }
                Err(e)
            }
        }
    }

    /// Mask every element, run `body`, then remove all masks in reverse order.
    ///
    /// Masks added before a failing `add_mask` are still removed.
    pub async fn with_masks<F, Fut, T>(
        &self,
        elements: &[ElementHandle],
        options: &MaskOptions,
        body: F,
    ) -> GoldshotResult<T>
    where
        F: FnOnce(Vec<MaskHandle>) -> Fut,
        Fut: Future<Output = GoldshotResult<T>>,
    {
        let mut masks = Vec::with_capacity(elements.len());
        let mut outcome = None;
        for element in elements {
            match self.add_mask(element, options).await {
                Ok(mask) => masks.push(mask),
                Err(e) => {
                    outcome = Some(Err(e));
                    break;
                }
            }
        }
        let outcome = match outcome {
            Some(failed) => failed,
            None => body(masks.clone()).await,
        };

        let mut cleanup_error = None;
        for mask in masks.iter().rev() {
            if let Err(e) = self.remove_mask(mask).await {
                tracing::warn!(mask = %mask.id, error = %e, "mask cleanup failed");
                if cleanup_error.is_none() {
                    cleanup_error = Some(e);
                }
            }
        }

        match (outcome, cleanup_error) {
            (Ok(value), None) => Ok(value),
            (Ok(_), Some(e)) | (Err(e), _) => Err(e),
        }
    }
}
