//! Scrimshaw - render Mermaid diagrams inside pandoc documents
//!
//! A pandoc JSON filter that finds Mermaid code blocks in a document,
//! renders each one to SVG in a headless browser, rasterizes the SVG to PNG
//! through a fallback chain of converters, and substitutes image nodes back
//! into the document. A diagram that cannot be rendered becomes a visible
//! inline error paragraph; the document as a whole always comes back.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scrimshaw::{transform_document, FilterConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let document: serde_json::Value = serde_json::from_str(r#"{
//!     "pandoc-api-version": [1, 23, 1],
//!     "meta": {},
//!     "blocks": []
//! }"#)?;
//!
//! let config = FilterConfig::from_env();
//! let transformed = transform_document(document, &config).await?;
//! println!("{}", serde_json::to_string(&transformed)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Advanced Usage
//!
//! The pieces compose individually: [`extract::extract_blocks`] scans raw
//! markdown, [`render::RenderEngine`] drives the browser,
//! [`raster::RasterConverter`] walks the conversion chain, and
//! [`filter::DocumentFilter`] accepts any [`filter::DiagramPipeline`]
//! implementation, which is also the seam tests use.

pub mod core;
pub mod extract;
pub mod filter;
pub mod raster;
pub mod render;

pub use crate::core::*;

use serde_json::Value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        BlockId, Conversion, ConversionMethod, Dialect, DiagramBlock, EmbedStrategy,
        FilterConfig, FilterError, Origin, RasterArtifact, RenderOutcome, RunContext,
    };
    pub use crate::filter::{DiagramPipeline, DocumentFilter, PipelineVerdict, RenderPipeline};
    pub use crate::raster::RasterConverter;
    pub use crate::render::RenderEngine;
}

/// Transform a pandoc JSON document with the production pipeline
///
/// This is the simplest way to run the filter: it builds a run context from
/// the config, processes every Mermaid code block, and returns the
/// transformed document. Fails only on a malformed document or an unusable
/// scratch directory; per-diagram failures become inline error nodes.
pub async fn transform_document(
    document: Value,
    config: &FilterConfig,
) -> Result<Value, FilterError> {
    let ctx = RunContext::new(config)?;
    let pipeline = filter::RenderPipeline::new(config);
    let doc_filter = filter::DocumentFilter::new(pipeline, config.embed);
    doc_filter.transform(document, &ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_transform_document_identity_without_diagrams() {
        let document = json!({
            "pandoc-api-version": [1, 23, 1],
            "meta": {},
            "blocks": [{"t": "Para", "c": [{"t": "Str", "c": "plain"}]}]
        });
        let config = FilterConfig::default();
        let transformed = transform_document(document.clone(), &config).await.unwrap();
        assert_eq!(transformed, document);
    }

    #[tokio::test]
    async fn test_transform_document_rejects_garbage() {
        let config = FilterConfig::default();
        let err = transform_document(json!("not a document"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::MalformedDocument { .. }));
    }
}
