//! Host page for the layout engine
//!
//! Builds the minimal HTML document that embeds one diagram inside a Mermaid
//! initialization script. Because the engine observes the page through
//! serialized DOM snapshots, every completion signal is mirrored into DOM
//! attributes on the root element:
//!
//! - `data-mermaid-done` is set exactly once, from the wrapped render
//!   callback (or by the page-side watchdog / error handler);
//! - `data-mermaid-error` carries the layout engine's failure message.
//!
//! The rendered `<svg>` element inside `.mermaid` remains the second,
//! independent completion signal.

use super::svg::xml_escape;

/// DOM attribute marking the explicit completion flag
pub const DONE_ATTRIBUTE: &str = "data-mermaid-done";

/// DOM attribute carrying a layout-engine error message
pub const ERROR_ATTRIBUTE: &str = "data-mermaid-error";

/// Pinned Mermaid build loaded by the host page
const MERMAID_SCRIPT_URL: &str = "https://cdn.jsdelivr.net/npm/mermaid@8.14.0/dist/mermaid.min.js";

/// Page-side watchdog that forces the completion flag, in milliseconds
const PAGE_WATCHDOG_MS: u32 = 5000;

/// Build the host document for one diagram
pub fn host_page(diagram: &str) -> String {
    // Entity-escaped text decodes back to the original in textContent, which
    // is what Mermaid reads from the element.
    let diagram = xml_escape(diagram);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>Mermaid Diagram</title>
  <script src="{MERMAID_SCRIPT_URL}"></script>
  <style>
    body {{ margin: 0; padding: 20px; }}
    .mermaid {{ max-width: 100%; }}
  </style>
</head>
<body>
  <pre class="mermaid">
{diagram}
  </pre>
  <script>
    window.mermaidRendered = false;
    function markDone(reason) {{
      if (window.mermaidRendered) return;
      window.mermaidRendered = true;
      document.documentElement.setAttribute('{DONE_ATTRIBUTE}', reason);
    }}
    function markError(message) {{
      document.documentElement.setAttribute('{ERROR_ATTRIBUTE}', String(message).slice(0, 300));
      markDone('error');
    }}
    var watchdog = setTimeout(function () {{ markDone('watchdog'); }}, {PAGE_WATCHDOG_MS});
    window.addEventListener('error', function (event) {{ markError(event.message); }});
    if (typeof mermaid === 'undefined') {{
      markError('mermaid library failed to load');
    }} else {{
      mermaid.initialize({{
        startOnLoad: true,
        theme: 'default',
        securityLevel: 'loose',
        fontFamily: 'arial, sans-serif',
        gantt: {{ titleTopMargin: 10 }},
        flowchart: {{ padding: 5, useMaxWidth: true }},
        sequence: {{ useMaxWidth: true }}
      }});
      var originalRender = mermaid.render;
      mermaid.render = function (id, text, callback, container) {{
        return originalRender(id, text, function (svgCode, bindFunctions) {{
          clearTimeout(watchdog);
          if (callback) callback(svgCode, bindFunctions);
          markDone('render-callback');
        }}, container);
      }};
      document.addEventListener('DOMContentLoaded', function () {{
        try {{
          mermaid.init(undefined, document.querySelectorAll('.mermaid'));
        }} catch (error) {{
          markError(error && error.message ? error.message : error);
        }}
      }});
    }}
  </script>
</body>
</html>
"#
    )
}

/// Whether a serialized DOM snapshot carries the explicit completion flag
///
/// Matches the serialized attribute form only, not the setter inside the
/// page's own script text.
pub fn has_completion_flag(dom: &str) -> bool {
    dom.contains(concat!("data-mermaid-done", "=\""))
}

/// Whether a serialized DOM snapshot contains a rendered output element
pub fn has_rendered_element(dom: &str) -> bool {
    dom.contains("<svg")
}

/// Pull the layout engine's error message out of a DOM snapshot, if any
pub fn error_marker(dom: &str) -> Option<String> {
    let needle = format!("{}=\"", ERROR_ATTRIBUTE);
    let start = dom.find(&needle)? + needle.len();
    let end = dom[start..].find('"')? + start;
    let message = dom[start..end].trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_page_embeds_escaped_diagram() {
        let page = host_page("graph TD; A-->B");
        assert!(page.contains("graph TD; A--&gt;B"));
        assert!(page.contains("mermaid.initialize"));
        assert!(page.contains(DONE_ATTRIBUTE));
    }

    #[test]
    fn test_signal_probes() {
        assert!(has_completion_flag("<html data-mermaid-done=\"render-callback\">"));
        assert!(!has_completion_flag("<html>"));
        assert!(has_rendered_element("<div><svg/></div>"));
        assert!(!has_rendered_element("<div></div>"));
    }

    #[test]
    fn test_error_marker_extraction() {
        let dom = "<html data-mermaid-error=\"Parse error on line 2\" data-mermaid-done=\"error\">";
        assert_eq!(
            error_marker(dom),
            Some("Parse error on line 2".to_string())
        );
        assert_eq!(error_marker("<html>"), None);
    }
}
