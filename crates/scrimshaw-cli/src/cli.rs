//! Command-line interface for the scrimshaw filter
//!
//! The bare invocation is the pandoc filter protocol: JSON document on
//! stdin, transformed JSON document on stdout, with pandoc's output format
//! as an optional positional argument. Subcommands expose the pipeline
//! stages individually.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use scrimshaw::core::logging::init_logging;
use scrimshaw::extract::extract_blocks;
use scrimshaw::filter::preprocess_markdown;
use scrimshaw::raster::convert_file;
use scrimshaw::render::render_to_file;
use scrimshaw::{transform_document, EmbedStrategy, FilterConfig};

/// Scrimshaw - render Mermaid diagrams inside pandoc documents
#[derive(Parser)]
#[command(name = "scrimshaw")]
#[command(about = "A pandoc filter that renders Mermaid code blocks to images")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format pandoc passes to its filters (ignored; all formats
    /// get the same image substitution)
    #[arg(value_name = "FORMAT")]
    pub format: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Path to the headless browser executable
    #[arg(long, global = true)]
    pub browser: Option<PathBuf>,

    /// External SVG-to-PNG command tried before the built-in converter
    #[arg(long, global = true)]
    pub svg_converter: Option<String>,

    /// Directory for intermediate files (default: a purged temp dir)
    #[arg(long, global = true)]
    pub scratch_dir: Option<PathBuf>,

    /// Keep intermediate files after the run
    #[arg(long, global = true)]
    pub keep_scratch: bool,

    /// How images are embedded into the document
    #[arg(long, global = true, value_enum, default_value_t = EmbedChoice::DataUri)]
    pub embed: EmbedChoice,
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// How rendered images are embedded into the document
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum EmbedChoice {
    /// Reference the PNG by filesystem path
    Link,
    /// Inline the PNG as a base64 data URI (self-contained output)
    #[default]
    DataUri,
}

impl From<EmbedChoice> for EmbedStrategy {
    fn from(value: EmbedChoice) -> Self {
        match value {
            EmbedChoice::Link => EmbedStrategy::Link,
            EmbedChoice::DataUri => EmbedStrategy::DataUri,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as a pandoc JSON filter (stdin to stdout); the default mode
    Filter {
        /// Output format pandoc passes to its filters (ignored)
        #[arg(value_name = "FORMAT")]
        format: Option<String>,
    },

    /// Render one Mermaid source file to an SVG file
    Render {
        /// Input file containing Mermaid source (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output SVG file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert one SVG file to a PNG file through the fallback chain
    Convert {
        /// Input SVG file
        #[arg(short, long)]
        input: PathBuf,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rewrite a markdown file, rendering its diagram blocks to PNG files
    Preprocess {
        /// Input markdown file
        #[arg(short, long)]
        input: PathBuf,

        /// Output markdown file
        #[arg(short, long)]
        output: PathBuf,

        /// Directory the numbered PNG files are written to
        #[arg(short, long, default_value = "diagrams")]
        diagrams_dir: PathBuf,
    },

    /// List the diagram blocks found in a document without rendering
    Extract {
        /// Input file to scan (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

/// Main CLI application
pub struct ScrimshawApp;

impl ScrimshawApp {
    pub fn new() -> Self {
        Self
    }

    fn build_config(cli: &Cli) -> FilterConfig {
        let mut config = FilterConfig::from_env();
        if cli.browser.is_some() {
            config.browser = cli.browser.clone();
        }
        if cli.svg_converter.is_some() {
            config.svg_converter = cli.svg_converter.clone();
        }
        if cli.scratch_dir.is_some() {
            config.scratch_dir = cli.scratch_dir.clone();
        }
        config.keep_scratch = config.keep_scratch || cli.keep_scratch;
        config.verbose = cli.verbose;
        config.embed = cli.embed.into();

        // Linked images must outlive the run; an auto-purged temp dir would
        // leave the document pointing at nothing.
        if config.embed == EmbedStrategy::Link && config.scratch_dir.is_none() {
            config.keep_scratch = true;
        }
        config
    }

    /// Run the application with the given CLI arguments
    pub fn run(&self, cli: Cli) -> Result<()> {
        // Initialize logging with CLI flags (environment variables take precedence)
        let log_level_str = std::env::var("SCRIMSHAW_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("SCRIMSHAW_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Scrimshaw v{}", env!("CARGO_PKG_VERSION"));
        }

        let config = Self::build_config(&cli);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;

        let verbose = cli.verbose;
        match cli.command {
            None => runtime.block_on(self.filter_command(cli.format, &config, verbose)),
            Some(Commands::Filter { format }) => {
                runtime.block_on(self.filter_command(format, &config, verbose))
            }
            Some(Commands::Render { input, output }) => {
                runtime.block_on(self.render_command(input, output, &config, verbose))
            }
            Some(Commands::Convert { input, output }) => {
                runtime.block_on(self.convert_command(input, output, &config, verbose))
            }
            Some(Commands::Preprocess {
                input,
                output,
                diagrams_dir,
            }) => runtime.block_on(self.preprocess_command(
                input,
                output,
                diagrams_dir,
                &config,
            )),
            Some(Commands::Extract { input }) => self.extract_command(input, verbose),
        }
    }

    /// Handle pandoc filter mode
    ///
    /// Per-diagram failures never fail this command; only unreadable input
    /// or a non-pandoc document exits non-zero.
    async fn filter_command(
        &self,
        format: Option<String>,
        config: &FilterConfig,
        verbose: bool,
    ) -> Result<()> {
        if let Some(format) = &format {
            tracing::debug!(format, "Running as pandoc filter");
        }

        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read document from stdin")?;
        if verbose {
            eprintln!("Read {} bytes of input", raw.len());
        }

        let document: Value = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("input is not valid JSON: {}", e))?;
        let transformed = transform_document(document, config).await?;

        let out = serde_json::to_string(&transformed)?;
        let mut stdout = io::stdout();
        stdout.write_all(out.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        Ok(())
    }

    /// Handle the render command
    async fn render_command(
        &self,
        input: Option<PathBuf>,
        output: PathBuf,
        config: &FilterConfig,
        verbose: bool,
    ) -> Result<()> {
        let input = self.materialize_input(input, config)?;
        let genuine = render_to_file(&input, &output, config).await?;
        if verbose {
            eprintln!("Wrote {}", output.display());
        }
        if !genuine {
            eprintln!("Warning: render failed, wrote placeholder SVG");
        }
        Ok(())
    }

    /// Handle the convert command
    async fn convert_command(
        &self,
        input: PathBuf,
        output: PathBuf,
        config: &FilterConfig,
        verbose: bool,
    ) -> Result<()> {
        let genuine = convert_file(&input, &output, config).await?;
        if verbose {
            eprintln!("Wrote {}", output.display());
        }
        if !genuine {
            eprintln!("Warning: all converters failed, wrote placeholder PNG");
        }
        Ok(())
    }

    /// Handle the preprocess command
    async fn preprocess_command(
        &self,
        input: PathBuf,
        output: PathBuf,
        diagrams_dir: PathBuf,
        config: &FilterConfig,
    ) -> Result<()> {
        let report = preprocess_markdown(&input, &output, &diagrams_dir, config).await?;
        eprintln!(
            "{} diagrams: {} rendered, {} failed",
            report.total, report.rendered, report.failed
        );
        Ok(())
    }

    /// Handle the extract command
    fn extract_command(&self, input: Option<PathBuf>, verbose: bool) -> Result<()> {
        let source = self.read_input(input)?;
        if verbose {
            eprintln!("Read {} bytes of input", source.len());
        }

        let blocks = extract_blocks(&source);
        let listing: Vec<Value> = blocks
            .iter()
            .map(|block| {
                serde_json::json!({
                    "index": block.index,
                    "dialect": block.dialect.to_string(),
                    "source": block.source,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        Ok(())
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Spill stdin to a scratch file so file-based collaborators can read it
    fn materialize_input(
        &self,
        input: Option<PathBuf>,
        config: &FilterConfig,
    ) -> Result<PathBuf> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => Ok(path),
            _ => {
                let content = self.read_input(None)?;
                let dir = config
                    .scratch_dir
                    .clone()
                    .unwrap_or_else(std::env::temp_dir);
                fs::create_dir_all(&dir)?;
                let path = dir.join(format!("scrimshaw-stdin-{}.mmd", std::process::id()));
                fs::write(&path, content)?;
                Ok(path)
            }
        }
    }
}

impl Default for ScrimshawApp {
    fn default() -> Self {
        Self::new()
    }
}
