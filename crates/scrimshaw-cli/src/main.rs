//! Scrimshaw CLI - render Mermaid diagrams inside pandoc documents

mod cli;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();

    // Logging is initialized exactly once, inside run(), after the CLI
    // flags are known; a second init would fail against the global
    // subscriber and silently drop the flags.
    let app = cli::ScrimshawApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
