//! Chromium-backed page driver.
//!
//! With the `browser` feature this provides [`ChromiumDriver`], a
//! [`PageDriver`](crate::PageDriver) over the Chrome `DevTools` Protocol via
//! chromiumoxide. Scripts run as `(function(){ <script> }).apply(null, args)`
//! so they can read `arguments` the way WebDriver scripts do.

use serde_json::Value;

/// Browser configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 800,
            viewport_height: 600,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Wrap a script body so it receives `args` as `arguments`
pub fn script_invocation(script: &str, args: &[Value]) -> Result<String, serde_json::Error> {
    Ok(format!(
        "(function() {{ {script} }}).apply(null, {})",
        serde_json::to_string(args)?
    ))
}

/// Expression yielding the document-relative box of `selector`, or null
pub fn bounding_box_expression(selector: &str) -> Result<String, serde_json::Error> {
    Ok(format!(
        "(function(selector) {{ \
            const el = document.querySelector(selector); \
            if (!el || el.getClientRects().length === 0) return null; \
            const r = el.getBoundingClientRect(); \
            return {{ x: r.left + window.scrollX, y: r.top + window.scrollY, \
                      width: r.width, height: r.height }}; \
        }})({})",
        serde_json::to_string(selector)?
    ))
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening)]
mod cdp {
    use super::{bounding_box_expression, script_invocation, BrowserConfig};
    use crate::driver::{BoundingBox, ElementHandle, PageDriver};
    use crate::result::{GoldshotError, GoldshotResult};
    use async_trait::async_trait;
    use base64::Engine;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde_json::Value;
    use tokio::sync::Mutex;

    /// Page driver with a real CDP connection
    #[derive(Debug)]
    pub struct ChromiumDriver {
        config: BrowserConfig,
        browser: Mutex<CdpBrowser>,
        page: CdpPage,
        handle: tokio::task::JoinHandle<()>,
    }

    impl ChromiumDriver {
        /// Launch Chromium and open a blank page
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> GoldshotResult<Self> {
            let mut builder =
                CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| GoldshotError::BrowserLaunchError { message })?;

            let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
                GoldshotError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| GoldshotError::PageError {
                    message: e.to_string(),
                })?;

            tracing::info!(
                width = config.viewport_width,
                height = config.viewport_height,
                "chromium launched"
            );
            Ok(Self {
                config,
                browser: Mutex::new(browser),
                page,
                handle,
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Navigate to a URL
        ///
        /// # Errors
        ///
        /// Returns error if navigation fails
        pub async fn goto(&self, url: &str) -> GoldshotResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| GoldshotError::NavigationError {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn evaluate(&self, expression: String) -> GoldshotResult<Value> {
            let result = self
                .page
                .evaluate(expression)
                .await
                .map_err(|e| GoldshotError::ScriptError {
                    message: e.to_string(),
                })?;
            Ok(result.value().cloned().unwrap_or(Value::Null))
        }

        /// Close the browser
        pub async fn close(self) -> GoldshotResult<()> {
            let mut browser = self.browser.lock().await;
            browser
                .close()
                .await
                .map_err(|e| GoldshotError::BrowserLaunchError {
                    message: e.to_string(),
                })?;
            drop(browser);
            self.handle.abort();
            Ok(())
        }
    }

    #[async_trait]
    impl PageDriver for ChromiumDriver {
        async fn bounding_box(&self, element: &ElementHandle) -> GoldshotResult<BoundingBox> {
            let value = self
                .evaluate(bounding_box_expression(&element.selector)?)
                .await?;
            if value.is_null() {
                return Err(GoldshotError::ElementNotRendered {
                    selector: element.selector.clone(),
                });
            }
            Ok(serde_json::from_value(value)?)
        }

        async fn execute_script(&self, script: &str, args: Vec<Value>) -> GoldshotResult<Value> {
            self.evaluate(script_invocation(script, &args)?).await
        }

        async fn screenshot(&self) -> GoldshotResult<Vec<u8>> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();

            let screenshot =
                self.page
                    .execute(params)
                    .await
                    .map_err(|e| GoldshotError::ScreenshotError {
                        message: e.to_string(),
                    })?;

            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| GoldshotError::ScreenshotError {
                    message: e.to_string(),
                })
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!((config.viewport_width, config.viewport_height), (800, 600));
        assert!(config.sandbox);
        assert!(config.chromium_path.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = BrowserConfig::default()
            .with_viewport(1280, 720)
            .with_headless(false)
            .with_chromium_path("/usr/bin/chromium")
            .with_no_sandbox();
        assert_eq!((config.viewport_width, config.viewport_height), (1280, 720));
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
    }

    #[test]
    fn test_script_invocation_passes_arguments() {
        let expr = script_invocation("return arguments[0];", &[json!(1.5), json!("red")]).unwrap();
        assert_eq!(
            expr,
            r#"(function() { return arguments[0]; }).apply(null, [1.5,"red"])"#
        );
    }

    #[test]
    fn test_bounding_box_expression_escapes_selector() {
        let expr = bounding_box_expression(r#"div[data-x="1"]"#).unwrap();
        assert!(expr.ends_with(r#"})("div[data-x=\"1\"]")"#));
        assert!(expr.contains("getBoundingClientRect"));
    }
}
