//! Browser collaborator abstraction.
//!
//! Masking only needs two things from a browser: an element's bounding box and
//! in-page script execution. [`PageDriver`] captures exactly that (plus a
//! screenshot) so tests can swap the Chromium driver for [`MockDriver`].

use crate::mask::{MASK_INJECT_SCRIPT, MASK_REMOVE_SCRIPT};
use crate::result::{GoldshotError, GoldshotResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Element rectangle in CSS pixels, document-relative
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Handle to a renderable element, addressed by CSS selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Selector locating the element
    pub selector: String,
    /// Bounding box if already known
    pub bounding_box: Option<BoundingBox>,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            bounding_box: None,
        }
    }

    /// Attach a known bounding box
    #[must_use]
    pub const fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }
}

/// Browser operations used by masking and capture
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Current bounding box of `element`; fails when it is not rendered
    async fn bounding_box(&self, element: &ElementHandle) -> GoldshotResult<BoundingBox>;

    /// Run `script` (a function body reading `arguments`) with `args`
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> GoldshotResult<Value>;

    /// Capture the viewport as PNG bytes
    async fn screenshot(&self) -> GoldshotResult<Vec<u8>>;
}

/// An overlay injected into a [`MockDriver`] page
#[derive(Debug, Clone, PartialEq)]
pub struct MockMask {
    /// Mask x
    pub x: f64,
    /// Mask y
    pub y: f64,
    /// Mask width
    pub width: f64,
    /// Mask height
    pub height: f64,
    /// CSS colour
    pub color: String,
    /// Stacking order
    pub z_index: i64,
}

#[derive(Debug, Default)]
struct MockState {
    elements: HashMap<String, BoundingBox>,
    masks: HashMap<String, MockMask>,
    next_mask: u64,
    script_failure: Option<String>,
    screenshot: Option<Vec<u8>>,
    call_history: Vec<String>,
}

/// In-memory driver for unit testing.
///
/// Understands the mask injection/removal scripts and keeps a registry of
/// live masks, so removing an unknown mask fails like a detached node would.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a rendered element
    pub fn add_element(&self, selector: impl Into<String>, bbox: BoundingBox) {
        self.state().elements.insert(selector.into(), bbox);
    }

    /// Make the next script execution fail with `message`
    pub fn fail_next_script(&self, message: impl Into<String>) {
        self.state().script_failure = Some(message.into());
    }

    /// Set mock screenshot
    pub fn set_screenshot(&self, png: Vec<u8>) {
        self.state().screenshot = Some(png);
    }

    /// Masks currently in the page, keyed by id
    #[must_use]
    pub fn masks(&self) -> HashMap<String, MockMask> {
        self.state().masks.clone()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().call_history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_history.iter().any(|c| c.starts_with(method))
    }
}

fn number_arg(args: &[Value], idx: usize) -> GoldshotResult<f64> {
    args.get(idx)
        .and_then(Value::as_f64)
        .ok_or_else(|| GoldshotError::ScriptError {
            message: format!("argument {idx} is not a number"),
        })
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn bounding_box(&self, element: &ElementHandle) -> GoldshotResult<BoundingBox> {
        let mut state = self.state();
        state
            .call_history
            .push(format!("bounding_box:{}", element.selector));
        state
            .elements
            .get(&element.selector)
            .copied()
            .or(element.bounding_box)
            .ok_or_else(|| GoldshotError::ElementNotRendered {
                selector: element.selector.clone(),
            })
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> GoldshotResult<Value> {
        let mut state = self.state();
        if let Some(message) = state.script_failure.take() {
            state.call_history.push("execute_script:failed".to_string());
            return Err(GoldshotError::ScriptError { message });
        }

        if script == MASK_INJECT_SCRIPT {
            let mask = MockMask {
                x: number_arg(&args, 0)?,
                y: number_arg(&args, 1)?,
                width: number_arg(&args, 2)?,
                height: number_arg(&args, 3)?,
                color: args
                    .get(4)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                z_index: args.get(5).and_then(Value::as_i64).unwrap_or_default(),
            };
            state.next_mask += 1;
            let id = format!("goldshot-mask-{}", state.next_mask);
            state.call_history.push(format!("execute_script:inject:{id}"));
            state.masks.insert(id.clone(), mask);
            return Ok(Value::String(id));
        }

        if script == MASK_REMOVE_SCRIPT {
            let id = args.first().and_then(Value::as_str).unwrap_or_default();
            state.call_history.push(format!("execute_script:remove:{id}"));
            return state
                .masks
                .remove(id)
                .map(|_| Value::Null)
                .ok_or_else(|| GoldshotError::ScriptError {
                    message: "TypeError: Cannot read properties of undefined (reading 'parentNode')"
                        .to_string(),
                });
        }

        state.call_history.push("execute_script".to_string());
        Ok(Value::Null)
    }

    async fn screenshot(&self) -> GoldshotResult<Vec<u8>> {
        let mut state = self.state();
        state.call_history.push("screenshot".to_string());
        state
            .screenshot
            .clone()
            .ok_or_else(|| GoldshotError::ScreenshotError {
                message: "No mock screenshot set".to_string(),
            })
    }
}
