//! Filter configuration
//!
//! Collects every knob the pipeline recognizes: browser and converter
//! overrides, scratch directory placement, timeouts, and the embedding
//! strategy. Values come from CLI flags with environment variables as the
//! fallback layer.
//!
//! # Environment Variables
//!
//! - `SCRIMSHAW_BROWSER`: path to the browser executable (otherwise a fixed
//!   list of well-known install locations is probed)
//! - `SCRIMSHAW_SVG_CONVERTER`: primary SVG-to-PNG conversion command

use std::path::PathBuf;
use std::time::Duration;

use super::types::EmbedStrategy;

/// Hard ceiling on one render call
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Time box for one external conversion command
pub const DEFAULT_CONVERT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a filter run
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Browser executable override; when unset, well-known paths are probed
    pub browser: Option<PathBuf>,
    /// Primary SVG-to-PNG conversion command; when unset the chain starts at
    /// the built-in converter
    pub svg_converter: Option<String>,
    /// Explicit scratch directory; when unset a temporary directory is used
    pub scratch_dir: Option<PathBuf>,
    /// Keep the scratch directory after the run instead of purging it
    pub keep_scratch: bool,
    /// Surface per-attempt diagnostics on stderr
    pub verbose: bool,
    /// How images are embedded back into the document
    pub embed: EmbedStrategy,
    /// Hard ceiling on one render call
    pub render_timeout: Duration,
    /// Time box for one external conversion command
    pub convert_timeout: Duration,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            browser: None,
            svg_converter: None,
            scratch_dir: None,
            keep_scratch: false,
            verbose: false,
            embed: EmbedStrategy::default(),
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            convert_timeout: DEFAULT_CONVERT_TIMEOUT,
        }
    }
}

impl FilterConfig {
    /// Build a configuration from environment variables on top of defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(browser) = std::env::var("SCRIMSHAW_BROWSER") {
            if !browser.is_empty() {
                config.browser = Some(PathBuf::from(browser));
            }
        }
        if let Ok(converter) = std::env::var("SCRIMSHAW_SVG_CONVERTER") {
            if !converter.is_empty() {
                config.svg_converter = Some(converter);
            }
        }
        config
    }
}
