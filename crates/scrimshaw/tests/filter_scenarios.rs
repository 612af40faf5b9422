//! End-to-end document filter scenarios
//!
//! These exercise the whole transform around a scripted pipeline, so they
//! run without a browser: diagrams whose source contains "boom" fail, all
//! others produce a small PNG artifact.

use serde_json::{json, Value};

use scrimshaw::filter::{DiagramPipeline, DocumentFilter, PipelineVerdict};
use scrimshaw::{
    DiagramBlock, EmbedStrategy, FilterConfig, FilterError, RasterArtifact, RunContext,
};

const PNG_STUB: &[u8] = b"\x89PNG\r\n\x1a\nstub";

struct ScriptedPipeline {
    dir: tempfile::TempDir,
}

impl ScriptedPipeline {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }
}

impl DiagramPipeline for ScriptedPipeline {
    async fn process(&self, block: &DiagramBlock, _ctx: &RunContext) -> PipelineVerdict {
        if block.source.contains("boom") {
            return PipelineVerdict::Failed(format!("parse error in diagram {}", block.index + 1));
        }
        let path = self.dir.path().join(format!("{}.png", block.id));
        std::fs::write(&path, PNG_STUB).unwrap();
        PipelineVerdict::Image(RasterArtifact::png(path))
    }
}

fn mermaid_block(text: &str) -> Value {
    json!({"t": "CodeBlock", "c": [["", ["mermaid"], []], text]})
}

fn para(text: &str) -> Value {
    json!({"t": "Para", "c": [{"t": "Str", "c": text}]})
}

fn doc(blocks: Vec<Value>) -> Value {
    json!({"pandoc-api-version": [1, 23, 1], "meta": {}, "blocks": blocks})
}

fn ctx() -> RunContext {
    RunContext::new(&FilterConfig::default()).unwrap()
}

async fn run(input: Value, embed: EmbedStrategy) -> Value {
    let filter = DocumentFilter::new(ScriptedPipeline::new(), embed);
    filter.transform(input, &ctx()).await.unwrap()
}

fn node_text(node: &Value) -> &str {
    node["c"][0]["c"].as_str().unwrap_or("")
}

fn is_image(node: &Value) -> bool {
    node["c"][0]["t"] == "Image"
}

#[tokio::test]
async fn test_valid_diagram_becomes_one_image_node() {
    let input = doc(vec![
        para("intro"),
        mermaid_block("graph TD; A-->B"),
        para("outro"),
    ]);
    let output = run(input, EmbedStrategy::Link).await;

    let blocks = output["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(node_text(&blocks[0]), "intro");
    assert!(is_image(&blocks[1]), "diagram must become an image node");
    assert_eq!(blocks[1]["c"][0]["c"][1][0]["c"], "Diagram 1");
    assert_eq!(node_text(&blocks[2]), "outro");
}

#[tokio::test]
async fn test_invalid_diagram_becomes_inline_error_and_document_survives() {
    let input = doc(vec![
        para("before"),
        mermaid_block("graph boom TD"),
        para("after"),
    ]);
    let output = run(input, EmbedStrategy::Link).await;

    let blocks = output["blocks"].as_array().unwrap();
    assert_eq!(
        node_text(&blocks[1]),
        "[Error rendering diagram: parse error in diagram 1]"
    );
    // The failure stays confined to its own block.
    assert_eq!(node_text(&blocks[0]), "before");
    assert_eq!(node_text(&blocks[2]), "after");
}

#[tokio::test]
async fn test_mixed_document_keeps_per_diagram_outcomes_in_order() {
    let input = doc(vec![
        mermaid_block("graph TD; A-->B"),
        mermaid_block("boom one"),
        para("middle"),
        mermaid_block("boom two"),
    ]);
    let output = run(input, EmbedStrategy::Link).await;

    let blocks = output["blocks"].as_array().unwrap();
    assert!(is_image(&blocks[0]));
    assert_eq!(
        node_text(&blocks[1]),
        "[Error rendering diagram: parse error in diagram 2]"
    );
    assert_eq!(node_text(&blocks[2]), "middle");
    assert_eq!(
        node_text(&blocks[3]),
        "[Error rendering diagram: parse error in diagram 3]"
    );
}

#[tokio::test]
async fn test_document_without_diagrams_is_untouched() {
    let input = doc(vec![
        para("only prose"),
        json!({"t": "CodeBlock", "c": [["", ["python"], []], "print(1)"]}),
        json!({"t": "HorizontalRule"}),
    ]);
    let output = run(input.clone(), EmbedStrategy::DataUri).await;
    assert_eq!(output, input);
}

#[tokio::test]
async fn test_data_uri_embed_inlines_the_artifact() {
    let input = doc(vec![mermaid_block("graph TD; A-->B")]);
    let output = run(input, EmbedStrategy::DataUri).await;

    let url = output["blocks"][0]["c"][0]["c"][2][0].as_str().unwrap();
    assert!(url.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_diagram_inside_nested_structure_is_replaced() {
    let input = doc(vec![json!({
        "t": "Div",
        "c": [["", [], []], [mermaid_block("graph TD; A-->B")]]
    })]);
    let output = run(input, EmbedStrategy::Link).await;
    assert!(is_image(&output["blocks"][0]["c"][1][0]));
}

#[tokio::test]
async fn test_malformed_document_is_the_only_fatal_input() {
    let filter = DocumentFilter::new(ScriptedPipeline::new(), EmbedStrategy::Link);
    let err = filter
        .transform(json!({"blocks": "not an array"}), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, FilterError::MalformedDocument { .. }));
}
