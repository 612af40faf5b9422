//! SVG-to-PNG conversion with an ordered fallback chain
//!
//! Converting the layout engine's SVG to a raster image is the least
//! predictable part of the pipeline: external converters may be missing,
//! broken, or hung. The converter therefore walks a fixed chain of uniform
//! steps, first success wins, and degrades to a synthesized placeholder
//! image as the terminal step. `convert` never propagates a conversion
//! failure to the caller; a chain that bottomed out is visible on the
//! returned [`Conversion`] instead.

mod builtin;
mod error_image;

pub use builtin::rasterize_svg;
pub use error_image::{write_error_image, ERROR_IMAGE_HEIGHT, ERROR_IMAGE_WIDTH};

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, span, warn, Instrument, Level};

use crate::core::{
    BlockId, Conversion, ConversionAttempt, ConversionMethod, FilterConfig, FilterError,
    RasterArtifact, RunContext,
};
use crate::render::XML_DECLARATION;

/// One link of the conversion chain
enum ConvertStep {
    /// The configured external conversion command, run through the shell
    Command(String),
    /// In-process resvg rasterization
    BuiltinResvg,
    /// ImageMagick `convert`, when present on PATH
    ImageMagick(PathBuf),
}

impl ConvertStep {
    fn method(&self) -> ConversionMethod {
        match self {
            ConvertStep::Command(_) => ConversionMethod::PrimaryCommand,
            ConvertStep::BuiltinResvg => ConversionMethod::BuiltinResvg,
            ConvertStep::ImageMagick(_) => ConversionMethod::ImageMagick,
        }
    }
}

/// Walks the conversion fallback chain for single diagrams
pub struct RasterConverter {
    primary: Option<String>,
    step_timeout: Duration,
}

impl RasterConverter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            primary: config.svg_converter.clone(),
            step_timeout: config.convert_timeout,
        }
    }

    fn chain(&self) -> Vec<ConvertStep> {
        let mut steps = Vec::new();
        if let Some(command) = &self.primary {
            steps.push(ConvertStep::Command(command.clone()));
        }
        steps.push(ConvertStep::BuiltinResvg);
        if let Some(convert) = find_in_path("convert") {
            steps.push(ConvertStep::ImageMagick(convert));
        }
        steps
    }

    /// Convert SVG markup to a PNG artifact in the run's scratch directory
    ///
    /// Always produces an artifact short of being unable to write even the
    /// terminal placeholder; that is the only error path out of here, and it
    /// is fatal for the single diagram only.
    pub async fn convert(
        &self,
        svg: &str,
        id: &BlockId,
        ctx: &RunContext,
    ) -> Result<Conversion, FilterError> {
        let convert_span = span!(Level::INFO, "convert_svg", id = %id, svg_len = svg.len());
        self.convert_inner(svg, id, ctx).instrument(convert_span).await
    }

    async fn convert_inner(
        &self,
        svg: &str,
        id: &BlockId,
        ctx: &RunContext,
    ) -> Result<Conversion, FilterError> {
        let svg_path = ctx.block_path(id, "svg");
        std::fs::write(&svg_path, format!("{}{}", XML_DECLARATION, svg))?;
        let png_path = ctx.block_path(id, "png");

        let mut attempts = Vec::new();
        for step in self.chain() {
            let method = step.method();
            match self.attempt(&step, svg, &svg_path, &png_path).await {
                Ok(()) => {
                    info!(%method, "Conversion succeeded");
                    return Ok(Conversion {
                        artifact: RasterArtifact::png(png_path),
                        method,
                        attempts,
                    });
                }
                Err(diagnostic) => {
                    debug!(%method, diagnostic, "Conversion attempt failed");
                    attempts.push(ConversionAttempt {
                        method,
                        ok: false,
                        diagnostic: Some(diagnostic),
                    });
                }
            }
        }

        warn!(id = %id, "All conversion methods failed, writing placeholder image");
        write_error_image(&png_path).map_err(FilterError::conversion_exhausted)?;
        Ok(Conversion {
            artifact: RasterArtifact::png(png_path),
            method: ConversionMethod::ErrorImage,
            attempts,
        })
    }

    async fn attempt(
        &self,
        step: &ConvertStep,
        svg: &str,
        svg_path: &Path,
        png_path: &Path,
    ) -> Result<(), String> {
        match step {
            ConvertStep::Command(command) => {
                let line = format!(
                    "{} {} {}",
                    command,
                    shell_quote(svg_path),
                    shell_quote(png_path)
                );
                run_shell(&line, self.step_timeout).await?;
                ensure_artifact(png_path)
            }
            ConvertStep::BuiltinResvg => {
                rasterize_svg(svg, png_path)?;
                ensure_artifact(png_path)
            }
            ConvertStep::ImageMagick(binary) => {
                run_program(binary, &[svg_path, png_path], self.step_timeout).await?;
                ensure_artifact(png_path)
            }
        }
    }
}

/// A converter that exited 0 without producing output still failed
fn ensure_artifact(path: &Path) -> Result<(), String> {
    let ok = std::fs::metadata(path)
        .map(|meta| meta.len() > 0)
        .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err("converter produced no output file".to_string())
    }
}

async fn run_shell(line: &str, step_timeout: Duration) -> Result<(), String> {
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    run_to_completion(command, step_timeout).await
}

async fn run_program(
    program: &Path,
    args: &[&Path],
    step_timeout: Duration,
) -> Result<(), String> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    run_to_completion(command, step_timeout).await
}

async fn run_to_completion(mut command: Command, step_timeout: Duration) -> Result<(), String> {
    let child = command
        .spawn()
        .map_err(|err| format!("failed to spawn converter: {err}"))?;
    // Dropping the future on timeout kills the child (kill_on_drop); a stuck
    // converter is a failed attempt, never an indefinite wait.
    let output = timeout(step_timeout, child.wait_with_output())
        .await
        .map_err(|_| format!("converter did not finish within {:?}", step_timeout))?
        .map_err(|err| format!("failed to collect converter output: {err}"))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "converter exited with {}: {}",
            output.status,
            stderr.lines().last().unwrap_or("").trim()
        ))
    }
}

/// Probe PATH for an executable, `which`-style
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Convert a standalone SVG file to a PNG file
///
/// Collaborator surface for external callers; reports whether a genuine
/// conversion happened (false means the placeholder was used).
pub async fn convert_file(
    input: &Path,
    output: &Path,
    config: &FilterConfig,
) -> Result<bool, FilterError> {
    let svg = std::fs::read_to_string(input)?;
    let ctx = RunContext::new(config)?;
    let converter = RasterConverter::new(config);
    let id = BlockId::new();
    let conversion = converter.convert(&svg, &id, &ctx).await?;
    std::fs::copy(&conversion.artifact.path, output)?;
    Ok(!conversion.degraded())
}
