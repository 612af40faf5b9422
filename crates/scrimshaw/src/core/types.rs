//! Core data types shared across the diagram filter pipeline

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use uuid::Uuid;

/// MIME type of the raster artifacts the pipeline produces
pub const PNG_MIME: &str = "image/png";

/// The textual convention a diagram block was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// ```` ```mermaid ```` fenced block
    FencedMermaid,
    /// ```` ```{.mermaid} ```` or ```` ``` .mermaid ```` attribute-class fence
    FencedAttr,
    /// `~~~mermaid` tilde fence
    TildeFenced,
    /// Un-fenced text opening with a recognized diagram keyword
    RawHeuristic,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::FencedMermaid => "fenced-mermaid",
            Dialect::FencedAttr => "fenced-attr",
            Dialect::TildeFenced => "tilde-fenced",
            Dialect::RawHeuristic => "raw-heuristic",
        };
        write!(f, "{}", name)
    }
}

/// Where a diagram block was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Byte range of the full match (fences included) in raw document text
    Source(Range<usize>),
    /// A pre-parsed code block node in the document tree
    Tree,
}

/// Unique identifier of a diagram block within a run
///
/// Uniqueness keeps scratch file names collision-free even if diagrams are
/// processed concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId(Uuid);

impl BlockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single diagram block lifted out of a document
///
/// Immutable once created; consumed by the render engine.
#[derive(Debug, Clone)]
pub struct DiagramBlock {
    /// Globally unique id, used to key scratch files
    pub id: BlockId,
    /// Zero-based per-document index, in document order
    pub index: usize,
    /// The convention the block was written in
    pub dialect: Dialect,
    /// Diagram source text, captured verbatim
    pub source: String,
    /// Where the block came from
    pub origin: Origin,
}

impl DiagramBlock {
    pub fn new(index: usize, dialect: Dialect, source: impl Into<String>, origin: Origin) -> Self {
        Self {
            id: BlockId::new(),
            index,
            dialect,
            source: source.into(),
            origin,
        }
    }
}

/// The result of driving the layout engine over one diagram
///
/// Terminal; never mutated after creation. The `svg` field is always
/// populated: degraded outcomes carry a synthesized placeholder SVG so a
/// downstream raster artifact remains producible.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Whether the layout engine produced real output
    pub ok: bool,
    /// Serialized SVG markup (placeholder SVG when `ok` is false)
    pub svg: String,
    /// Human-readable failure description when `ok` is false
    pub error: Option<String>,
}

impl RenderOutcome {
    pub fn success(svg: impl Into<String>) -> Self {
        Self {
            ok: true,
            svg: svg.into(),
            error: None,
        }
    }

    pub fn degraded(svg: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            svg: svg.into(),
            error: Some(error.into()),
        }
    }
}

/// Identifies one link of the raster conversion fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMethod {
    /// The configured external conversion command
    PrimaryCommand,
    /// In-process rasterization via resvg
    BuiltinResvg,
    /// ImageMagick `convert`, when present on PATH
    ImageMagick,
    /// The terminal synthesized placeholder image
    ErrorImage,
}

impl fmt::Display for ConversionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConversionMethod::PrimaryCommand => "primary-command",
            ConversionMethod::BuiltinResvg => "builtin-resvg",
            ConversionMethod::ImageMagick => "imagemagick",
            ConversionMethod::ErrorImage => "error-image",
        };
        write!(f, "{}", name)
    }
}

/// One attempted link of the conversion chain, kept for diagnostics only
#[derive(Debug, Clone)]
pub struct ConversionAttempt {
    pub method: ConversionMethod,
    pub ok: bool,
    pub diagnostic: Option<String>,
}

/// The final binary image produced for a diagram
#[derive(Debug, Clone)]
pub struct RasterArtifact {
    pub path: PathBuf,
    pub mime: &'static str,
}

impl RasterArtifact {
    pub fn png(path: PathBuf) -> Self {
        Self {
            path,
            mime: PNG_MIME,
        }
    }
}

/// Outcome of running the conversion chain for one diagram
#[derive(Debug, Clone)]
pub struct Conversion {
    pub artifact: RasterArtifact,
    /// The first chain link that succeeded
    pub method: ConversionMethod,
    /// Failed attempts that preceded it
    pub attempts: Vec<ConversionAttempt>,
}

impl Conversion {
    /// True when the chain bottomed out at the terminal placeholder image
    pub fn degraded(&self) -> bool {
        matches!(self.method, ConversionMethod::ErrorImage)
    }

    /// Diagnostic from the last failed attempt, if any
    pub fn last_diagnostic(&self) -> Option<&str> {
        self.attempts
            .iter()
            .rev()
            .find_map(|attempt| attempt.diagnostic.as_deref())
    }
}

/// How rendered images are embedded back into the document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedStrategy {
    /// Reference the artifact by filesystem path
    Link,
    /// Inline the artifact as a base64 data URI (self-contained output)
    #[default]
    DataUri,
}
