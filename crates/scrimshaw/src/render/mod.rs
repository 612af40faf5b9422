//! Headless diagram rendering
//!
//! Everything between diagram text and SVG markup: browser discovery, the
//! host page, the render engine itself, and SVG post-processing.

mod browser;
mod engine;
mod host;
mod svg;

pub use browser::{locate_browser, KNOWN_BROWSER_PATHS};
pub use engine::{RenderEngine, RenderTimings};
pub use host::{host_page, DONE_ATTRIBUTE, ERROR_ATTRIBUTE};
pub use svg::{error_svg, extract_svg, normalize_svg, wrap_screenshot, xml_escape, XML_DECLARATION};

use std::path::Path;

use crate::core::{Dialect, DiagramBlock, FilterConfig, FilterError, Origin, RunContext};

/// Render a single diagram source file to an SVG file
///
/// Collaborator surface for external callers: always writes an SVG (the
/// placeholder on failure) and reports whether the render was genuine.
/// Mirrors the filter's own render path.
pub async fn render_to_file(
    input: &Path,
    output: &Path,
    config: &FilterConfig,
) -> Result<bool, FilterError> {
    let source = std::fs::read_to_string(input)?;
    let ctx = RunContext::new(config)?;
    let block = DiagramBlock::new(0, Dialect::FencedMermaid, source.trim_end(), Origin::Tree);

    let engine = RenderEngine::new(config);
    let outcome = engine.render(&block, &ctx).await;

    std::fs::write(output, format!("{}{}", XML_DECLARATION, outcome.svg))?;
    Ok(outcome.ok)
}
