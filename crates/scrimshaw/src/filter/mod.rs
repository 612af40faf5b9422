//! Document-level filtering
//!
//! The pandoc JSON transform, the markdown preprocessing mode, and the node
//! helpers they share.

mod node;
mod preprocess;
mod transform;

pub use node::{code_block_view, error_para, image_para, CodeBlockView, PandocDocument};
pub use preprocess::{diagram_file, preprocess_markdown, PreprocessReport};
pub use transform::{DiagramPipeline, DocumentFilter, PipelineVerdict, RenderPipeline};
