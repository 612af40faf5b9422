//! Typed views over pandoc JSON nodes
//!
//! The document tree stays a `serde_json::Value` so unknown node variants
//! pass through untouched; this module provides the typed top-level document
//! plus views/constructors for the node shapes the filter reads and writes
//! (`{"t": ..., "c": ...}` encoding).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A pandoc JSON document: api version, metadata, and the block list
///
/// Anything that does not deserialize into this shape is a malformed
/// document as far as the filter is concerned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PandocDocument {
    #[serde(rename = "pandoc-api-version")]
    pub api_version: Value,
    pub meta: Value,
    pub blocks: Vec<Value>,
}

/// Borrowed view of a CodeBlock node's attributes and body
#[derive(Debug)]
pub struct CodeBlockView<'a> {
    pub ident: &'a str,
    pub classes: Vec<&'a str>,
    pub text: &'a str,
}

/// View a node as a CodeBlock, if it is one
///
/// CodeBlock content is `[[ident, [classes], [kv-pairs]], text]`.
pub fn code_block_view(node: &Value) -> Option<CodeBlockView<'_>> {
    let obj = node.as_object()?;
    if obj.get("t")?.as_str()? != "CodeBlock" {
        return None;
    }
    let content = obj.get("c")?.as_array()?;
    let attr = content.first()?.as_array()?;
    let text = content.get(1)?.as_str()?;
    let ident = attr.first()?.as_str()?;
    let classes = attr
        .get(1)?
        .as_array()?
        .iter()
        .filter_map(|class| class.as_str())
        .collect();
    Some(CodeBlockView {
        ident,
        classes,
        text,
    })
}

/// Build a paragraph wrapping an image reference
pub fn image_para(url: &str, alt: &str) -> Value {
    json!({
        "t": "Para",
        "c": [{
            "t": "Image",
            "c": [
                ["", [], []],
                [{"t": "Str", "c": alt}],
                [url, ""]
            ]
        }]
    })
}

/// Build the visible inline error paragraph substituted for a failed diagram
pub fn error_para(message: &str) -> Value {
    json!({
        "t": "Para",
        "c": [{
            "t": "Str",
            "c": format!("[Error rendering diagram: {}]", message)
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_block(classes: &[&str], text: &str) -> Value {
        json!({"t": "CodeBlock", "c": [["", classes, []], text]})
    }

    #[test]
    fn test_code_block_view() {
        let node = code_block(&["mermaid"], "graph TD; A-->B");
        let view = code_block_view(&node).unwrap();
        assert_eq!(view.ident, "");
        assert_eq!(view.classes, vec!["mermaid"]);
        assert_eq!(view.text, "graph TD; A-->B");
    }

    #[test]
    fn test_non_code_block_nodes_are_rejected() {
        assert!(code_block_view(&json!({"t": "Para", "c": []})).is_none());
        assert!(code_block_view(&json!("Str")).is_none());
        assert!(code_block_view(&json!({"t": "CodeBlock"})).is_none());
    }

    #[test]
    fn test_image_para_shape() {
        let node = image_para("out.png", "Diagram 1");
        assert_eq!(node["t"], "Para");
        assert_eq!(node["c"][0]["t"], "Image");
        assert_eq!(node["c"][0]["c"][2][0], "out.png");
    }

    #[test]
    fn test_error_para_is_clearly_marked() {
        let node = error_para("boom");
        assert_eq!(node["c"][0]["c"], "[Error rendering diagram: boom]");
    }

    #[test]
    fn test_document_round_trip() {
        let raw = json!({
            "pandoc-api-version": [1, 23, 1],
            "meta": {},
            "blocks": [{"t": "Para", "c": [{"t": "Str", "c": "hello"}]}]
        });
        let doc: PandocDocument = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_malformed_document_fails_to_parse() {
        assert!(serde_json::from_value::<PandocDocument>(json!({"not": "pandoc"})).is_err());
        assert!(serde_json::from_value::<PandocDocument>(json!([1, 2, 3])).is_err());
    }
}
