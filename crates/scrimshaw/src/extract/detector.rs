//! Per-dialect diagram block detectors
//!
//! Each detector recognizes one textual convention for embedding a diagram in
//! a document and reports every occurrence with its span and verbatim body.
//! The detectors are pure functions of the source text, so classification is
//! deterministic across runs.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use crate::core::Dialect;

/// One occurrence of a diagram block in raw document text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMatch {
    /// Byte range of the full match, fences included
    pub span: Range<usize>,
    /// The inner body text, captured verbatim
    pub body: String,
}

/// Strategy interface for recognizing one diagram dialect
pub trait BlockDetector: Send + Sync {
    /// The dialect this detector recognizes
    fn dialect(&self) -> Dialect;

    /// Find every occurrence in `source`, in document order
    fn scan(&self, source: &str) -> Vec<BlockMatch>;
}

fn scan_with(regex: &Regex, dialect: Dialect, source: &str) -> Vec<BlockMatch> {
    let matches: Vec<BlockMatch> = regex
        .captures_iter(source)
        .filter_map(|caps| {
            let full = caps.get(0)?;
            let body = caps.get(1)?;
            Some(BlockMatch {
                span: full.start()..full.end(),
                body: body.as_str().to_string(),
            })
        })
        .collect();
    trace!(%dialect, count = matches.len(), "Detector scan finished");
    matches
}

/// Detects ```` ```mermaid ```` fenced blocks
pub struct FencedMermaidDetector;

impl BlockDetector for FencedMermaidDetector {
    fn dialect(&self) -> Dialect {
        Dialect::FencedMermaid
    }

    fn scan(&self, source: &str) -> Vec<BlockMatch> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"(?m)^``` *mermaid *\r?\n((?s:.*?))\r?\n``` *$").unwrap()
        });
        scan_with(re, self.dialect(), source)
    }
}

/// Detects fences tagged via an attribute class: ```` ```{.mermaid} ```` or
/// ```` ``` .mermaid ````
pub struct FencedAttrDetector;

impl BlockDetector for FencedAttrDetector {
    fn dialect(&self) -> Dialect {
        Dialect::FencedAttr
    }

    fn scan(&self, source: &str) -> Vec<BlockMatch> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"(?m)^``` *(?:\{\.mermaid[^}\n]*\}|\.mermaid) *\r?\n((?s:.*?))\r?\n``` *$")
                .unwrap()
        });
        scan_with(re, self.dialect(), source)
    }
}

/// Detects the alternate fence character variant: `~~~mermaid`
pub struct TildeFencedDetector;

impl BlockDetector for TildeFencedDetector {
    fn dialect(&self) -> Dialect {
        Dialect::TildeFenced
    }

    fn scan(&self, source: &str) -> Vec<BlockMatch> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"(?m)^~~~ *mermaid *\r?\n((?s:.*?))\r?\n~~~ *$").unwrap()
        });
        scan_with(re, self.dialect(), source)
    }
}

/// Last-resort heuristic: un-fenced text that opens with a recognized diagram
/// keyword, terminated by a blank line, a closing fence, or end of input
///
/// Can false-positive on prose, so the extractor only runs it when no
/// explicit fence matched anywhere in the document.
pub struct RawHeuristicDetector;

impl BlockDetector for RawHeuristicDetector {
    fn dialect(&self) -> Dialect {
        Dialect::RawHeuristic
    }

    fn scan(&self, source: &str) -> Vec<BlockMatch> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(
                r"(?m)^((?:graph|flowchart|sequenceDiagram|classDiagram|stateDiagram(?:-v2)?|erDiagram|gantt|pie|gitGraph|mindmap|journey)\b(?s:.*?))(?:\r?\n[ \t]*\r?\n|\r?\n```|\r?\n~~~|\z)",
            )
            .unwrap()
        });
        scan_with(re, self.dialect(), source)
    }
}

/// The explicit (fence-based) detectors, in precedence order
pub fn explicit_detectors() -> Vec<Box<dyn BlockDetector>> {
    vec![
        Box::new(FencedMermaidDetector),
        Box::new(FencedAttrDetector),
        Box::new(TildeFencedDetector),
    ]
}
