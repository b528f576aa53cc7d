//! Command-line loader for splat assets.
//!
//! Loads assets through an [`AssetManager`] from a local directory or over
//! HTTP, then prints a summary of each asset and of the cache.

mod cli;
mod report;

use std::process::ExitCode;

use clap::Parser;
use splat_assets::{
    AssetEvent, AssetManager, FileSource, HttpSource, LoadMode, PreloadRequest,
};
use tokio::sync::broadcast;

use crate::cli::Cli;

/// Log batch progress until the manager goes away.
async fn log_progress(mut events: broadcast::Receiver<AssetEvent>) {
    loop {
        match events.recv().await {
            Ok(AssetEvent::BatchProgress {
                loaded,
                total,
                percentage,
            }) => tracing::info!(loaded, total, "batch {percentage:.0}%"),
            Ok(AssetEvent::LoadFailed { url, error }) => {
                tracing::debug!(url = %url, %error, "load failed");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let cli = Cli::parse();
    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let urls = cli.urls(&config);
    let options = cli.load_options();

    let builder = match &cli.root {
        Some(root) => AssetManager::builder(FileSource::new(root.clone())),
        None => AssetManager::builder(HttpSource::new().with_origin(cli.origin.as_str())),
    };
    let manager = builder.config(config).build();
    tokio::spawn(log_progress(manager.subscribe()));

    tracing::info!(
        count = urls.len(),
        compression = manager.has_compression(),
        "loading assets"
    );

    let succeeded = if cli.preload {
        let requests: Vec<PreloadRequest> = urls
            .iter()
            .map(|url| PreloadRequest {
                url: url.clone(),
                options: options.clone(),
            })
            .collect();
        let summary = manager.preload_assets(&requests).await;
        for error in &summary.failed {
            tracing::error!(%error, "preload failed");
        }
        for url in &urls {
            if let Some(asset) = manager.cached(url, &options) {
                println!("{}", report::asset_summary(&asset));
            }
        }
        summary.failed.is_empty()
    } else {
        let mode = if cli.sequential {
            LoadMode::Sequential
        } else {
            LoadMode::Concurrent
        };
        match manager.load_multiple(&urls, &options, mode).await {
            Ok(assets) => {
                for asset in &assets {
                    println!("{}", report::asset_summary(asset));
                }
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "load failed");
                false
            }
        }
    };

    println!("{}", report::stats_summary(&manager.cache_stats()));
    manager.shutdown();

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
