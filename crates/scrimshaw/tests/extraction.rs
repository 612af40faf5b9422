//! Extraction tests across the supported diagram dialects
//!
//! Covers fence variants, precedence between explicit fences and the raw
//! keyword heuristic, and ordering guarantees over whole documents.

use proptest::prelude::*;
use scrimshaw::extract::extract_blocks;
use scrimshaw::Dialect;

// =============================================================================
// Dialect Coverage
// =============================================================================

mod dialects {
    use super::*;

    #[test]
    fn test_backtick_fence() {
        let blocks = extract_blocks("```mermaid\ngraph TD; A-->B\n```\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].dialect, Dialect::FencedMermaid);
        assert_eq!(blocks[0].source, "graph TD; A-->B");
    }

    #[test]
    fn test_attribute_fence() {
        let blocks = extract_blocks("```{.mermaid}\ngraph TD; A-->B\n```\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].dialect, Dialect::FencedAttr);
    }

    #[test]
    fn test_attribute_fence_with_extra_attrs() {
        let blocks = extract_blocks("```{.mermaid caption=\"flow\"}\npie\n\"a\": 1\n```\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].dialect, Dialect::FencedAttr);
        assert_eq!(blocks[0].source, "pie\n\"a\": 1");
    }

    #[test]
    fn test_tilde_fence() {
        let blocks = extract_blocks("~~~mermaid\nsequenceDiagram\nA->>B: hi\n~~~\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].dialect, Dialect::TildeFenced);
    }

    #[test]
    fn test_crlf_line_endings() {
        let blocks = extract_blocks("```mermaid\r\ngraph TD; A-->B\r\n```\r\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "graph TD; A-->B");
    }

    #[test]
    fn test_raw_heuristic_keywords() {
        for keyword in ["flowchart LR", "sequenceDiagram", "stateDiagram-v2", "gantt"] {
            let source = format!("prose before\n\n{}\n  step one\n\nprose after\n", keyword);
            let blocks = extract_blocks(&source);
            assert_eq!(blocks.len(), 1, "keyword {:?} not detected", keyword);
            assert_eq!(blocks[0].dialect, Dialect::RawHeuristic);
        }
    }

    #[test]
    fn test_keyword_mid_sentence_is_ignored() {
        let blocks = extract_blocks("the gantt chart below shows the plan\n");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_non_mermaid_fence_is_ignored() {
        let blocks = extract_blocks("```rust\nfn main() {}\n```\n");
        assert!(blocks.is_empty());
    }
}

// =============================================================================
// Precedence and Ordering
// =============================================================================

mod precedence {
    use super::*;

    #[test]
    fn test_explicit_fence_suppresses_heuristic_everywhere() {
        // The bare keyword block would match the heuristic on its own, but
        // one explicit fence anywhere turns the heuristic off.
        let source = "\
graph TD\n  bare --> block\n\n```mermaid\ngraph LR; A-->B\n```\n";
        let blocks = extract_blocks(source);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].dialect, Dialect::FencedMermaid);
    }

    #[test]
    fn test_mixed_fences_come_back_in_document_order() {
        let source = "\
```mermaid\ngraph TD; A-->B\n```\n\n~~~mermaid\npie\n\"x\": 2\n~~~\n\n```{.mermaid}\ngantt\ntitle t\n```\n";
        let blocks = extract_blocks(source);
        let dialects: Vec<_> = blocks.iter().map(|b| b.dialect).collect();
        assert_eq!(
            dialects,
            vec![
                Dialect::FencedMermaid,
                Dialect::TildeFenced,
                Dialect::FencedAttr
            ]
        );
        let indexes: Vec<_> = blocks.iter().map(|b| b.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_nested_fences_produce_non_overlapping_spans() {
        // A fence body containing another fence opener matches more than one
        // detector; the accepted spans must still partition the document, or
        // downstream span-based rewriting would slice backwards.
        let source = "\
```mermaid\n```{.mermaid}\ngraph TD; A-->B\n```\n\ntext\n\n```mermaid\n~~~mermaid\npie\n~~~\n```\n";
        let blocks = extract_blocks(source);
        assert_eq!(blocks.len(), 2);

        let mut claimed = 0;
        for block in &blocks {
            let scrimshaw::Origin::Source(span) = &block.origin else {
                panic!("source scan must produce source spans");
            };
            assert!(
                span.start >= claimed,
                "span {:?} starts inside the previous block",
                span
            );
            claimed = span.end;
        }
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let source = "```mermaid\ngraph TD; A-->B\n```\n\npie\n\"x\": 1\n";
        let first = extract_blocks(source);
        let second = extract_blocks(source);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.index, b.index);
            assert_eq!(a.dialect, b.dialect);
            assert_eq!(a.source, b.source);
            assert_eq!(a.origin, b.origin);
        }
    }

    #[test]
    fn test_spans_point_at_the_full_fence() {
        let source = "before\n\n```mermaid\ngraph TD; A-->B\n```\n\nafter\n";
        let blocks = extract_blocks(source);
        assert_eq!(blocks.len(), 1);
        let scrimshaw::Origin::Source(span) = &blocks[0].origin else {
            panic!("source scan must produce source spans");
        };
        assert!(source[span.clone()].starts_with("```mermaid"));
        assert!(source[span.clone()].trim_end().ends_with("```"));
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_fenced_body_is_captured_verbatim(
        lines in prop::collection::vec("[a-zA-Z0-9 .;()>-]{1,40}", 1..6)
    ) {
        let body = lines.join("\n");
        let source = format!("intro text\n\n```mermaid\n{}\n```\n\noutro\n", body);
        let blocks = extract_blocks(&source);
        prop_assert_eq!(blocks.len(), 1);
        prop_assert_eq!(&blocks[0].source, &body);
        prop_assert_eq!(blocks[0].dialect, Dialect::FencedMermaid);
    }

    #[test]
    fn prop_block_count_matches_fence_count(count in 0usize..5) {
        let mut source = String::from("prose\n");
        for i in 0..count {
            source.push_str(&format!("\n```mermaid\ngraph TD; N{0}-->M{0}\n```\n", i));
        }
        let blocks = extract_blocks(&source);
        prop_assert_eq!(blocks.len(), count);
        for (i, block) in blocks.iter().enumerate() {
            prop_assert_eq!(block.index, i);
        }
    }
}
