//! In-process SVG rasterization
//!
//! The environment-independent link of the conversion chain: no external
//! tools, just usvg/resvg/tiny-skia. Renders at 2x scale on a white
//! background so diagrams stay legible when embedded in documents.

use std::path::Path;

const SCALE: f32 = 2.0;

/// Rasterize SVG markup to a PNG file
pub fn rasterize_svg(svg: &str, output: &Path) -> Result<(), String> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|err| format!("svg parse failed: {err}"))?;

    let size = tree.size();
    let width = (size.width() * SCALE).ceil().max(1.0) as u32;
    let height = (size.height() * SCALE).ceil().max(1.0) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| format!("failed to allocate {width}x{height} pixmap"))?;
    pixmap.fill(tiny_skia::Color::from_rgba8(255, 255, 255, 255));

    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(SCALE, SCALE),
        &mut pixmap.as_mut(),
    );

    pixmap
        .save_png(output)
        .map_err(|err| format!("png encode failed: {err}"))
}
