//! Markdown preprocessing mode
//!
//! The source-text sibling of the JSON transform: diagram blocks are found
//! by scanning raw markdown, rendered through the same pipeline, and the
//! spans are rewritten in place as image references into a diagrams
//! directory. A diagram that fails leaves a bold failure marker so the
//! document stays readable.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::{FilterConfig, FilterError, Origin, RunContext};
use crate::extract::extract_blocks;

use super::transform::{DiagramPipeline, PipelineVerdict, RenderPipeline};

/// Counts from one preprocessing run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessReport {
    pub total: usize,
    pub rendered: usize,
    pub failed: usize,
}

/// Rewrite a markdown file, rendering its diagram blocks to PNG files
///
/// Artifacts land in `diagrams_dir` as `d1.png`, `d2.png`, ... numbered in
/// document order. The rewritten markdown goes to `output`.
pub async fn preprocess_markdown(
    input: &Path,
    output: &Path,
    diagrams_dir: &Path,
    config: &FilterConfig,
) -> Result<PreprocessReport, FilterError> {
    let source = std::fs::read_to_string(input)?;
    std::fs::create_dir_all(diagrams_dir)?;
    let ctx = RunContext::new(config)?;
    let pipeline = RenderPipeline::new(config);

    let blocks = extract_blocks(&source);
    info!(count = blocks.len(), input = %input.display(), "Preprocessing markdown");

    let mut report = PreprocessReport {
        total: blocks.len(),
        rendered: 0,
        failed: 0,
    };
    let mut rewritten = String::with_capacity(source.len());
    let mut last = 0;

    for block in &blocks {
        let Origin::Source(span) = &block.origin else {
            continue;
        };
        rewritten.push_str(&source[last..span.start]);
        last = span.end;

        let number = block.index + 1;
        match pipeline.process(block, &ctx).await {
            PipelineVerdict::Image(artifact) => {
                let target = diagram_file(diagrams_dir, number);
                match place_artifact(&artifact.path, &target) {
                    Ok(()) => {
                        report.rendered += 1;
                        rewritten.push_str(&format!("![Diagram {number}]({})", target.display()));
                    }
                    Err(err) => {
                        warn!(number, error = %err, "Could not place diagram artifact");
                        report.failed += 1;
                        rewritten.push_str(&failure_marker(number));
                    }
                }
            }
            PipelineVerdict::Failed(message) => {
                debug!(number, message, "Diagram failed during preprocessing");
                report.failed += 1;
                rewritten.push_str(&failure_marker(number));
            }
        }
    }
    rewritten.push_str(&source[last..]);

    std::fs::write(output, rewritten)?;
    Ok(report)
}

fn place_artifact(artifact: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::copy(artifact, target).map(|_| ())
}

fn failure_marker(number: usize) -> String {
    format!("**[Diagram {number} - could not be rendered]**")
}

/// Target path helper, exposed for the CLI summary output
pub fn diagram_file(diagrams_dir: &Path, number: usize) -> PathBuf {
    diagrams_dir.join(format!("d{number}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_marker_shape() {
        assert_eq!(
            failure_marker(3),
            "**[Diagram 3 - could not be rendered]**"
        );
    }

    #[test]
    fn test_diagram_file_numbering() {
        assert_eq!(
            diagram_file(Path::new("out"), 1),
            Path::new("out").join("d1.png")
        );
    }
}
