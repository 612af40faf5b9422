//! SVG post-processing helpers
//!
//! Pure string-level helpers applied to the markup coming back from the
//! layout engine: dimension/namespace normalization so downstream rasterizers
//! never have to infer intrinsic size, the screenshot wrapper for the
//! degraded capture path, and the synthesized error placeholder.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// XML declaration prepended when an SVG is written to disk
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n";

/// Fallback dimensions when the layout engine emitted none
const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;

/// Ensure the root element carries an explicit namespace and explicit
/// width/height attributes
///
/// Rasterizers in the fallback chain should not need to infer intrinsic
/// size. Markup without a recognizable root tag is returned unchanged.
pub fn normalize_svg(svg: &str) -> String {
    let trimmed = svg.trim();
    let Some(tag_end) = trimmed.find('>') else {
        return trimmed.to_string();
    };
    if !trimmed.starts_with("<svg") {
        return trimmed.to_string();
    }

    let (open, rest) = trimmed.split_at(tag_end);
    let mut open = open.to_string();
    if !open.contains(" xmlns=") {
        open.insert_str(4, " xmlns=\"http://www.w3.org/2000/svg\"");
    }
    if !open.contains(" width=") {
        open.push_str(&format!(" width=\"{}\"", DEFAULT_WIDTH));
    }
    if !open.contains(" height=") {
        open.push_str(&format!(" height=\"{}\"", DEFAULT_HEIGHT));
    }
    format!("{}{}", open, rest)
}

/// Wrap a captured PNG screenshot in a minimal SVG document
///
/// The degraded capture path still has to satisfy the engine's vector-output
/// contract; the pixels are inlined as a data URI so the wrapper does not
/// depend on a sibling file.
pub fn wrap_screenshot(png: &[u8], width: u32, height: u32) -> String {
    let encoded = BASE64.encode(png);
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width}\" height=\"{height}\">\n  <image width=\"{width}\" height=\"{height}\" href=\"data:image/png;base64,{encoded}\" />\n</svg>"
    )
}

/// Synthesize a placeholder SVG carrying an error message
///
/// Every render failure path returns one of these so a downstream raster
/// artifact remains producible.
pub fn error_svg(message: &str) -> String {
    let mut message = message.replace(['\n', '\r'], " ").trim().to_string();
    if message.len() > 200 {
        let mut end = 200;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
        message.push_str("...");
    }
    let message = xml_escape(&message);
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"500\" height=\"100\">\n  <rect width=\"500\" height=\"100\" fill=\"#ffcccc\" />\n  <text x=\"10\" y=\"30\" font-family=\"Arial\" font-size=\"12\">Error rendering diagram:</text>\n  <text x=\"10\" y=\"50\" font-family=\"Arial\" font-size=\"12\">{message}</text>\n  <text x=\"10\" y=\"80\" font-family=\"Arial\" font-size=\"10\">Run with --verbose for details</text>\n</svg>"
    )
}

/// Escape text for embedding in XML content or attribute values
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Extract the first `<svg>...</svg>` element from serialized page markup
pub fn extract_svg(dom: &str) -> Option<&str> {
    let start = dom.find("<svg")?;
    let end = dom[start..].find("</svg>")? + start + "</svg>".len();
    Some(&dom[start..end])
}
