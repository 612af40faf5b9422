//! The document transform
//!
//! Two deterministic passes over the pandoc block tree with the async
//! per-diagram work in between: a read-only collection pass lifts every
//! Mermaid code block out in document order, each block runs through the
//! diagram pipeline, and a substitution pass splices the replacement nodes
//! back in by ordinal. Both passes walk the tree identically, so ordinals
//! line up without node bookkeeping.
//!
//! A diagram that fails anywhere in its pipeline becomes a visible inline
//! error paragraph; the only error this module itself raises is a document
//! that is not pandoc JSON at all.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, info, span, warn, Instrument, Level};

use crate::core::{
    DiagramBlock, EmbedStrategy, FilterConfig, FilterError, Origin, RasterArtifact, RunContext,
};
use crate::extract::classify_code_block;
use crate::raster::RasterConverter;
use crate::render::RenderEngine;

use super::node::{code_block_view, error_para, image_para, PandocDocument};

/// What the pipeline decided for one diagram
#[derive(Debug)]
pub enum PipelineVerdict {
    /// A raster image to substitute for the block
    Image(RasterArtifact),
    /// The block could not be turned into a genuine image
    Failed(String),
}

/// Seam between the document walk and the per-diagram work
///
/// The production pipeline drives a browser and a converter chain; tests
/// substitute a canned one.
pub trait DiagramPipeline {
    fn process(
        &self,
        block: &DiagramBlock,
        ctx: &RunContext,
    ) -> impl std::future::Future<Output = PipelineVerdict>;
}

/// The production pipeline: render to SVG, then convert to PNG
///
/// A conversion chain that bottomed out at the placeholder image counts as
/// failed here, so the document shows a readable error instead of an
/// anonymous pink rectangle.
pub struct RenderPipeline {
    engine: RenderEngine,
    converter: RasterConverter,
}

impl RenderPipeline {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            engine: RenderEngine::new(config),
            converter: RasterConverter::new(config),
        }
    }
}

impl DiagramPipeline for RenderPipeline {
    async fn process(&self, block: &DiagramBlock, ctx: &RunContext) -> PipelineVerdict {
        let outcome = self.engine.render(block, ctx).await;
        if !outcome.ok {
            let message = outcome
                .error
                .unwrap_or_else(|| "render produced no output".to_string());
            return PipelineVerdict::Failed(message);
        }

        match self.converter.convert(&outcome.svg, &block.id, ctx).await {
            Ok(conversion) if conversion.degraded() => {
                let message = conversion
                    .last_diagnostic()
                    .unwrap_or("no conversion method available")
                    .to_string();
                PipelineVerdict::Failed(message)
            }
            Ok(conversion) => PipelineVerdict::Image(conversion.artifact),
            Err(err) => PipelineVerdict::Failed(err.to_string()),
        }
    }
}

/// Applies a diagram pipeline across a whole pandoc document
pub struct DocumentFilter<P> {
    pipeline: P,
    embed: EmbedStrategy,
}

impl<P: DiagramPipeline> DocumentFilter<P> {
    pub fn new(pipeline: P, embed: EmbedStrategy) -> Self {
        Self { pipeline, embed }
    }

    /// Transform one pandoc JSON document
    ///
    /// Every Mermaid code block is replaced by an image paragraph or an
    /// inline error paragraph; all other nodes pass through byte-for-byte.
    /// Fails only when the input is not a pandoc document.
    pub async fn transform(
        &self,
        document: Value,
        ctx: &RunContext,
    ) -> Result<Value, FilterError> {
        let transform_span = span!(Level::INFO, "transform_document");
        self.transform_inner(document, ctx)
            .instrument(transform_span)
            .await
    }

    async fn transform_inner(
        &self,
        document: Value,
        ctx: &RunContext,
    ) -> Result<Value, FilterError> {
        let doc: PandocDocument = serde_json::from_value(document)
            .map_err(|err| FilterError::malformed_document(err.to_string()))?;

        let mut diagrams = Vec::new();
        for node in &doc.blocks {
            collect_diagrams(node, &mut diagrams);
        }
        info!(count = diagrams.len(), "Collected diagram blocks");

        let mut replacements = Vec::with_capacity(diagrams.len());
        for block in &diagrams {
            let verdict = self.pipeline.process(block, ctx).await;
            replacements.push(self.replacement_node(block, verdict));
        }

        let PandocDocument {
            api_version,
            meta,
            blocks,
        } = doc;
        let mut cursor = 0;
        let blocks = blocks
            .into_iter()
            .map(|node| substitute(node, &replacements, &mut cursor))
            .collect();

        let transformed = PandocDocument {
            api_version,
            meta,
            blocks,
        };
        serde_json::to_value(transformed)
            .map_err(|err| FilterError::malformed_document(err.to_string()))
    }

    fn replacement_node(&self, block: &DiagramBlock, verdict: PipelineVerdict) -> Value {
        match verdict {
            PipelineVerdict::Image(artifact) => {
                let alt = format!("Diagram {}", block.index + 1);
                match self.embed {
                    EmbedStrategy::Link => {
                        image_para(&artifact.path.display().to_string(), &alt)
                    }
                    EmbedStrategy::DataUri => match std::fs::read(&artifact.path) {
                        Ok(bytes) => {
                            let url =
                                format!("data:{};base64,{}", artifact.mime, BASE64.encode(bytes));
                            image_para(&url, &alt)
                        }
                        Err(err) => {
                            warn!(index = block.index, error = %err, "Could not read artifact");
                            error_para(&format!("could not read rendered image: {err}"))
                        }
                    },
                }
            }
            PipelineVerdict::Failed(message) => {
                debug!(index = block.index, message, "Substituting error node");
                error_para(&message)
            }
        }
    }
}

/// Is this node a Mermaid code block the filter should claim?
fn mermaid_code_block(node: &Value) -> Option<(crate::core::Dialect, String)> {
    let view = code_block_view(node)?;
    let dialect = classify_code_block(view.ident, &view.classes)?;
    Some((dialect, view.text.to_string()))
}

fn collect_diagrams(node: &Value, out: &mut Vec<DiagramBlock>) {
    if let Some((dialect, text)) = mermaid_code_block(node) {
        out.push(DiagramBlock::new(out.len(), dialect, text, Origin::Tree));
        return;
    }
    match node {
        Value::Array(items) => {
            for item in items {
                collect_diagrams(item, out);
            }
        }
        Value::Object(map) => {
            for value in map.values() {
                collect_diagrams(value, out);
            }
        }
        _ => {}
    }
}

/// Mirror of [`collect_diagrams`]: same walk, same claiming rule, so the
/// cursor pairs each claimed block with its replacement by ordinal
fn substitute(node: Value, replacements: &[Value], cursor: &mut usize) -> Value {
    if mermaid_code_block(&node).is_some() {
        let replacement = replacements
            .get(*cursor)
            .cloned()
            .unwrap_or_else(|| error_para("replacement out of step with collection"));
        *cursor += 1;
        return replacement;
    }
    match node {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute(item, replacements, cursor))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, substitute(value, replacements, cursor)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StubPipeline {
        verdict: fn(&DiagramBlock) -> PipelineVerdict,
    }

    impl DiagramPipeline for StubPipeline {
        async fn process(&self, block: &DiagramBlock, _ctx: &RunContext) -> PipelineVerdict {
            (self.verdict)(block)
        }
    }

    fn mermaid_block(text: &str) -> Value {
        json!({"t": "CodeBlock", "c": [["", ["mermaid"], []], text]})
    }

    fn doc(blocks: Vec<Value>) -> Value {
        json!({"pandoc-api-version": [1, 23, 1], "meta": {}, "blocks": blocks})
    }

    fn ctx() -> RunContext {
        RunContext::new(&FilterConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_non_mermaid_blocks_pass_through_unchanged() {
        let input = doc(vec![
            json!({"t": "Para", "c": [{"t": "Str", "c": "text"}]}),
            json!({"t": "CodeBlock", "c": [["", ["rust"], []], "fn main() {}"]}),
        ]);
        let filter = DocumentFilter::new(
            StubPipeline {
                verdict: |_| PipelineVerdict::Failed("should not run".to_string()),
            },
            EmbedStrategy::Link,
        );
        let output = filter.transform(input.clone(), &ctx()).await.unwrap();
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_failed_diagram_becomes_inline_error() {
        let input = doc(vec![mermaid_block("graph TD; A-->B")]);
        let filter = DocumentFilter::new(
            StubPipeline {
                verdict: |_| PipelineVerdict::Failed("browser exploded".to_string()),
            },
            EmbedStrategy::Link,
        );
        let output = filter.transform(input, &ctx()).await.unwrap();
        assert_eq!(
            output["blocks"][0]["c"][0]["c"],
            "[Error rendering diagram: browser exploded]"
        );
    }

    #[tokio::test]
    async fn test_nested_blocks_are_found_in_order() {
        let input = doc(vec![json!({
            "t": "BlockQuote",
            "c": [mermaid_block("graph TD; A-->B"), mermaid_block("pie\n\"a\": 1")]
        })]);
        let filter = DocumentFilter::new(
            StubPipeline {
                verdict: |block| {
                    PipelineVerdict::Failed(format!("diagram {}", block.index))
                },
            },
            EmbedStrategy::Link,
        );
        let output = filter.transform(input, &ctx()).await.unwrap();
        let quote = &output["blocks"][0]["c"];
        assert_eq!(quote[0]["c"][0]["c"], "[Error rendering diagram: diagram 0]");
        assert_eq!(quote[1]["c"][0]["c"], "[Error rendering diagram: diagram 1]");
    }

    #[tokio::test]
    async fn test_malformed_document_is_rejected() {
        let filter = DocumentFilter::new(
            StubPipeline {
                verdict: |_| PipelineVerdict::Failed(String::new()),
            },
            EmbedStrategy::Link,
        );
        let err = filter
            .transform(json!({"nope": true}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::MalformedDocument { .. }));
    }
}
