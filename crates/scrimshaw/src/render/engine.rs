//! Headless render engine
//!
//! Drives one headless Chromium session per diagram to run Mermaid over the
//! host page and extract the resulting SVG. Completion detection races two
//! signals, each under its own budget: the page's explicit completion flag
//! first, then the presence of the rendered `<svg>` element. Both expiring
//! still proceeds to extraction, which is the authoritative success check.
//!
//! Every failure path is absorbed: the engine never returns an error, only a
//! degraded [`RenderOutcome`] carrying a synthesized placeholder SVG. The
//! overall call is bounded by a hard wall-clock ceiling, and spawned browser
//! processes are killed whenever their future is dropped.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, span, trace, warn, Instrument, Level};

use crate::core::{DiagramBlock, FilterConfig, FilterError, RenderOutcome, RunContext};

use super::browser::locate_browser;
use super::host::{error_marker, has_completion_flag, has_rendered_element, host_page};
use super::svg::{error_svg, extract_svg, normalize_svg, wrap_screenshot};

/// Dimensions used for the screenshot fallback capture
const SCREENSHOT_WIDTH: u32 = 800;
const SCREENSHOT_HEIGHT: u32 = 600;

/// Extra wall-clock allowance for browser startup and teardown on top of a
/// phase's virtual-time budget
const PROCESS_GRACE: Duration = Duration::from_secs(4);

/// Per-phase time budgets for one render call
#[derive(Debug, Clone)]
pub struct RenderTimings {
    /// Hard ceiling on the whole call
    pub overall: Duration,
    /// Page navigation and network idle
    pub navigation: Duration,
    /// First wait: the explicit completion flag
    pub completion_flag: Duration,
    /// Second wait: the rendered output element
    pub element_fallback: Duration,
    /// Settle delay before the screenshot fallback
    pub settle: Duration,
}

impl Default for RenderTimings {
    fn default() -> Self {
        Self {
            overall: Duration::from_secs(15),
            navigation: Duration::from_secs(8),
            completion_flag: Duration::from_secs(6),
            element_fallback: Duration::from_secs(3),
            settle: Duration::from_millis(500),
        }
    }
}

/// Drives the headless layout engine for single diagrams
pub struct RenderEngine {
    browser_override: Option<PathBuf>,
    timings: RenderTimings,
}

impl RenderEngine {
    pub fn new(config: &FilterConfig) -> Self {
        let timings = RenderTimings {
            overall: config.render_timeout,
            ..RenderTimings::default()
        };
        Self {
            browser_override: config.browser.clone(),
            timings,
        }
    }

    pub fn with_timings(config: &FilterConfig, timings: RenderTimings) -> Self {
        Self {
            browser_override: config.browser.clone(),
            timings,
        }
    }

    /// Render one diagram to SVG markup
    ///
    /// Never fails: timeouts and engine errors come back as degraded
    /// outcomes whose placeholder SVG carries the failure message.
    pub async fn render(&self, block: &DiagramBlock, ctx: &RunContext) -> RenderOutcome {
        let render_span = span!(
            Level::INFO,
            "render_diagram",
            index = block.index,
            id = %block.id,
            bytes = block.source.len(),
        );

        let result = timeout(
            self.timings.overall,
            self.render_inner(block, ctx).instrument(render_span),
        )
        .await;

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                warn!(index = block.index, error = %err, "Diagram render failed");
                let message = err.to_string();
                RenderOutcome::degraded(error_svg(&message), message)
            }
            Err(_) => {
                let err = FilterError::render_timeout(self.timings.overall.as_secs());
                warn!(index = block.index, "Diagram render hit the overall timeout");
                let message = err.to_string();
                RenderOutcome::degraded(error_svg(&message), message)
            }
        }
    }

    async fn render_inner(
        &self,
        block: &DiagramBlock,
        ctx: &RunContext,
    ) -> Result<RenderOutcome, FilterError> {
        // The raw source lands next to the host page, which makes failed
        // diagrams reproducible from the kept scratch directory.
        std::fs::write(ctx.block_path(&block.id, "mmd"), &block.source)?;
        let html_path = ctx.block_path(&block.id, "html");
        std::fs::write(&html_path, host_page(&block.source))?;
        let url = page_url(&html_path)?;

        let browser = locate_browser(self.browser_override.as_deref())?;
        info!(browser = %browser.display(), "Rendering diagram in headless browser");

        // Signal 1: explicit completion flag.
        let mut dom = None;
        let budget = self.timings.navigation + self.timings.completion_flag;
        match self.dump_dom(&browser, &url, budget).await {
            Ok(snapshot) => {
                if has_completion_flag(&snapshot) {
                    debug!("Completion flag observed");
                } else {
                    debug!("Completion flag not observed");
                }
                dom = Some(snapshot);
            }
            Err(err) => debug!(error = %err, "Completion-flag probe failed"),
        }

        // Signal 2: the rendered output element, on a shorter budget.
        let settled = dom
            .as_deref()
            .is_some_and(|d| has_completion_flag(d) || has_rendered_element(d));
        if !settled {
            debug!("Falling back to output-element wait");
            let budget = self.timings.navigation + self.timings.element_fallback;
            match self.dump_dom(&browser, &url, budget).await {
                Ok(snapshot) => {
                    if has_rendered_element(&snapshot) || dom.is_none() {
                        dom = Some(snapshot);
                    }
                }
                Err(err) => debug!(error = %err, "Output-element probe failed"),
            }
        }

        // Both signals may have timed out; extraction from whatever we got
        // is still attempted and is the authoritative check.
        let dom = dom.ok_or_else(|| {
            FilterError::render_failure("browser produced no DOM output")
        })?;

        if let Some(svg) = extract_svg(&dom) {
            debug!(svg_len = svg.len(), "Extracted SVG from page");
            return Ok(RenderOutcome::success(normalize_svg(svg)));
        }

        if let Some(message) = error_marker(&dom) {
            return Err(FilterError::render_failure(message));
        }

        // No SVG element: capture pixels instead and wrap them so the
        // vector-output contract still holds.
        debug!("No SVG element found, using screenshot fallback");
        tokio::time::sleep(self.timings.settle).await;
        let shot_path = ctx.block_path(&block.id, "shot.png");
        let png = self.screenshot(&browser, &url, &shot_path).await?;
        Ok(RenderOutcome::success(wrap_screenshot(
            &png,
            SCREENSHOT_WIDTH,
            SCREENSHOT_HEIGHT,
        )))
    }

    /// Run one bounded browser invocation and return the serialized DOM
    async fn dump_dom(
        &self,
        browser: &Path,
        url: &str,
        budget: Duration,
    ) -> Result<String, FilterError> {
        let mut command = Command::new(browser);
        command
            .arg("--headless")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg(format!("--virtual-time-budget={}", budget.as_millis()))
            .arg("--dump-dom")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn()?;
        let output = timeout(budget + PROCESS_GRACE, child.wait_with_output())
            .await
            .map_err(|_| {
                // Dropping the future kills the child (kill_on_drop).
                FilterError::render_failure(format!(
                    "browser did not exit within {:?}",
                    budget + PROCESS_GRACE
                ))
            })??;

        trace!(
            status = ?output.status,
            stderr = %String::from_utf8_lossy(&output.stderr),
            "Browser invocation finished"
        );

        if !output.status.success() {
            return Err(FilterError::render_failure(format!(
                "browser exited with {}: {}",
                output.status,
                tail(&String::from_utf8_lossy(&output.stderr)),
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Capture a pixel screenshot of the page
    async fn screenshot(
        &self,
        browser: &Path,
        url: &str,
        path: &Path,
    ) -> Result<Vec<u8>, FilterError> {
        let budget = self.timings.navigation + self.timings.element_fallback;
        let mut command = Command::new(browser);
        command
            .arg("--headless")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg(format!("--window-size={},{}", SCREENSHOT_WIDTH, SCREENSHOT_HEIGHT))
            .arg(format!("--virtual-time-budget={}", budget.as_millis()))
            .arg(format!("--screenshot={}", path.display()))
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn()?;
        let output = timeout(budget + PROCESS_GRACE, child.wait_with_output())
            .await
            .map_err(|_| {
                FilterError::render_failure(format!(
                    "screenshot capture did not finish within {:?}",
                    budget + PROCESS_GRACE
                ))
            })??;

        if !output.status.success() {
            return Err(FilterError::render_failure(format!(
                "screenshot capture exited with {}: {}",
                output.status,
                tail(&String::from_utf8_lossy(&output.stderr)),
            )));
        }
        Ok(std::fs::read(path)?)
    }
}

/// Build a `file://` URL for the host page
fn page_url(path: &Path) -> Result<String, FilterError> {
    let absolute = std::fs::canonicalize(path)?;
    Ok(format!("file://{}", absolute.display()))
}

/// Last few lines of captured process output, for diagnostics
fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().rev().take(3).collect();
    lines.into_iter().rev().collect::<Vec<_>>().join(" | ")
}
