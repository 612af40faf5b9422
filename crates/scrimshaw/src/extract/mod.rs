//! Diagram block extraction
//!
//! Scans raw document text for diagram blocks under every supported dialect
//! and produces [`DiagramBlock`] values in document order. Fenced forms take
//! precedence; the raw keyword heuristic only runs when no explicit fence
//! matched anywhere in the document, which prevents false positives on
//! diagram bodies that are already inside a classified fence.

mod detector;

pub use detector::{
    explicit_detectors, BlockDetector, BlockMatch, FencedAttrDetector, FencedMermaidDetector,
    RawHeuristicDetector, TildeFencedDetector,
};

use tracing::{debug, span, Level};

use crate::core::{Dialect, DiagramBlock, Origin};

/// Extract every diagram block from raw document text
///
/// Returns blocks in document order with non-overlapping spans, each with a
/// monotonically increasing per-document index and a globally unique id.
/// An empty result is a valid, non-error outcome.
pub fn extract_blocks(source: &str) -> Vec<DiagramBlock> {
    let extract_span = span!(Level::DEBUG, "extract_blocks", source_len = source.len());
    let _enter = extract_span.enter();

    let mut found: Vec<(Dialect, BlockMatch)> = Vec::new();
    for detector in explicit_detectors() {
        for block_match in detector.scan(source) {
            found.push((detector.dialect(), block_match));
        }
    }

    if found.is_empty() {
        let detector = RawHeuristicDetector;
        for block_match in detector.scan(source) {
            found.push((detector.dialect(), block_match));
        }
    }

    // Fences can nest (an attribute-fence opener inside a backtick fence
    // body matches two detectors); the outermost match wins and anything
    // starting inside an accepted span is discarded.
    found.sort_by_key(|(_, m)| m.span.start);
    let mut claimed = 0;
    found.retain(|(_, m)| {
        if m.span.start >= claimed {
            claimed = m.span.end;
            true
        } else {
            false
        }
    });

    debug!(count = found.len(), "Diagram blocks extracted");

    found
        .into_iter()
        .enumerate()
        .map(|(index, (dialect, block_match))| {
            DiagramBlock::new(
                index,
                dialect,
                block_match.body,
                Origin::Source(block_match.span),
            )
        })
        .collect()
}

/// Classify a pre-parsed code block by its declared language and class list
///
/// Used by the document filter on pandoc CodeBlock attributes. Pandoc erases
/// the concrete fence syntax, so both the language form and the attribute
/// form normalize to [`Dialect::FencedMermaid`]. Pure function of its inputs.
pub fn classify_code_block(ident: &str, classes: &[&str]) -> Option<Dialect> {
    if ident == "mermaid" || classes.iter().any(|class| *class == "mermaid") {
        Some(Dialect::FencedMermaid)
    } else {
        None
    }
}
