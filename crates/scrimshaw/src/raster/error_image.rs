//! Terminal placeholder image
//!
//! When every converter in the chain has failed, the pipeline still owes the
//! document an image. This synthesizes the flat "conversion failed"
//! placeholder; the diagnostic itself travels through the attempt log and an
//! inline error node, not through pixels.

use std::path::Path;

use image::{Rgba, RgbaImage};

pub const ERROR_IMAGE_WIDTH: u32 = 400;
pub const ERROR_IMAGE_HEIGHT: u32 = 200;

const BACKGROUND: Rgba<u8> = Rgba([255, 204, 204, 255]);
const BORDER: Rgba<u8> = Rgba([153, 51, 51, 255]);
const BORDER_THICKNESS: u32 = 4;

/// Write the placeholder PNG
///
/// The only way this fails is the filesystem write itself, which is fatal
/// for the single diagram, never for the document.
pub fn write_error_image(output: &Path) -> Result<(), String> {
    let mut img = RgbaImage::from_pixel(ERROR_IMAGE_WIDTH, ERROR_IMAGE_HEIGHT, BACKGROUND);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let near_edge = x < BORDER_THICKNESS
            || y < BORDER_THICKNESS
            || x >= ERROR_IMAGE_WIDTH - BORDER_THICKNESS
            || y >= ERROR_IMAGE_HEIGHT - BORDER_THICKNESS;
        if near_edge {
            *pixel = BORDER;
        }
    }
    img.save(output)
        .map_err(|err| format!("failed to write placeholder image: {err}"))
}
