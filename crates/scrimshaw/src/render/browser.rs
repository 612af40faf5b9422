//! Browser executable discovery
//!
//! Thin collaborator: finds a headless-capable Chromium/Chrome by probing a
//! fixed list of well-known install locations, unless an explicit override is
//! configured. An override that does not exist is a configuration error
//! rather than a reason to fall back to probing.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::FilterError;

/// Well-known Chromium/Chrome install locations, probed in order
pub const KNOWN_BROWSER_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/usr/bin/brave-browser",
    "/usr/bin/microsoft-edge",
];

/// Locate the browser executable to drive
pub fn locate_browser(override_path: Option<&Path>) -> Result<PathBuf, FilterError> {
    if let Some(path) = override_path {
        if path.is_file() {
            debug!(browser = %path.display(), "Using configured browser");
            return Ok(path.to_path_buf());
        }
        return Err(FilterError::render_failure(format!(
            "configured browser not found: {}",
            path.display()
        )));
    }

    for candidate in KNOWN_BROWSER_PATHS {
        let path = Path::new(candidate);
        if path.is_file() {
            debug!(browser = candidate, "Found browser");
            return Ok(path.to_path_buf());
        }
    }

    Err(FilterError::render_failure(
        "no chromium/chrome executable found in well-known locations",
    ))
}
