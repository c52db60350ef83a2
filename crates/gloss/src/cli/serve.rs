//! The `gloss serve` command: run the HTTP API.

use anyhow::Context;
use clap::{Args, ValueEnum};
use gloss_core::config::StoreBackend;
use gloss_core::{open_store, Config, ImageEditorFactory, Pipeline};
use std::sync::Arc;

use crate::server::{self, AppState};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides server.port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Object store backend (overrides store.backend)
    #[arg(long, value_enum)]
    pub store: Option<StoreArg>,
}

/// Store backends selectable on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StoreArg {
    Memory,
    Sqlite,
}

impl From<StoreArg> for StoreBackend {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Memory => StoreBackend::Memory,
            StoreArg::Sqlite => StoreBackend::Sqlite,
        }
    }
}

/// Apply command-line overrides on top of the loaded configuration.
fn apply_args(config: &mut Config, args: &ServeArgs) -> anyhow::Result<()> {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(store) = args.store {
        config.store.backend = store.into();
    }
    config.validate()?;
    Ok(())
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    apply_args(&mut config, &args)?;

    let store = open_store(&config).context("Failed to open image store")?;
    let editor = ImageEditorFactory::create(&config.transform)?;
    tracing::info!(
        store = store.name(),
        provider = editor.name(),
        "Pipeline ready"
    );

    let pipeline = Pipeline::new(store, editor, config.limits.clone(), &config.transform);
    let app = server::router(Arc::new(AppState { pipeline }), &config.server)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
