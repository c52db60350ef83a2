//! Gloss CLI - product-photo upload and AI beautification.
//!
//! Gloss runs an HTTP service that stores product photos in a canonical
//! encoding and beautifies them through an image-edit API, plus a client
//! that pushes local photos through that service.
//!
//! # Usage
//!
//! ```bash
//! # Run the server
//! gloss serve --port 5000
//!
//! # Enhance a folder of photos through a running server
//! gloss enhance ./photos/ --output ./enhanced
//!
//! # View configuration
//! gloss config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;
mod server;

/// Gloss - product-photo upload and AI beautification.
#[derive(Parser, Debug)]
#[command(name = "gloss")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the upload and beautify HTTP API
    Serve(cli::serve::ServeArgs),

    /// Upload local photos to a server and save the enhanced results
    Enhance(cli::enhance::EnhanceArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match gloss_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `gloss config path`."
            );
            gloss_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Gloss v{}", gloss_core::VERSION);

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Enhance(args) => cli::enhance::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
