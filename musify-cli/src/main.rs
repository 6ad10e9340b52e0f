mod cli;
mod error;
mod progress;

use std::{path::Path, process, sync::Arc};

use clap::Parser;
use musify_parser::{
    Crawl, Downloader, HttpSiteClient, Resolution, Resolver, SiteClient,
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::{Args, Target},
    error::AppError,
    progress::ProgressRenderer,
};

#[derive(Debug, Default)]
struct Summary {
    downloaded: usize,
    failed: usize,
    bytes: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let token = CancellationToken::new();
    spawn_interrupt_listener(token.clone());

    match run(args, token).await {
        Ok(summary) => {
            info!(
                downloaded = summary.downloaded,
                failed = summary.failed,
                bytes = summary.bytes,
                "Finished"
            );
        }
        Err(e) => {
            if let AppError::TargetNotFound { reason, .. } = &e {
                info!(reason = %reason, "Nothing to download");
            } else {
                error!("Application error: {}", e);
            }
            eprintln!("{e}");
            process::exit(e.exit_code());
        }
    }
}

async fn run(args: Args, token: CancellationToken) -> Result<Summary, AppError> {
    let config = args.site_config()?;
    let client: Arc<dyn SiteClient> = Arc::new(HttpSiteClient::new(&config)?);

    let start_page = match args.target()? {
        Target::Page(url) => url,
        Target::Search(query) => {
            let resolver = Resolver::new(client.clone(), config.base_url.clone());
            match resolver.resolve(&query, &token).await? {
                Resolution::Found(target) => {
                    println!("{}", target.message);
                    target.page_url
                }
                Resolution::NotFound(reason) => {
                    return Err(AppError::not_found(query.kind(), reason));
                }
            }
        }
    };

    prepare_destination(&args.directory).await?;

    let renderer = ProgressRenderer::new(args.quiet);
    let downloader =
        Downloader::new(client.clone(), &config).with_progress(renderer.callback());
    let mut crawl = Crawl::new(client, start_page, args.budget(), token.clone());

    let mut summary = Summary::default();
    while let Some(track) = crawl.next_track().await? {
        match downloader.download(&track, &args.directory, &token).await {
            Ok(outcome) => {
                summary.downloaded += 1;
                summary.bytes += outcome.bytes_written;
            }
            Err(e) if e.is_cancelled() => {
                renderer.abandon();
                return Err(AppError::Interrupted);
            }
            Err(e) => {
                renderer.abandon();
                warn!(file = %track.file_name, url = %track.source_url, error = %e, "Track download failed");
                summary.failed += 1;
            }
        }
    }

    info!(pages = crawl.pages_fetched(), "Crawl finished");
    Ok(summary)
}

/// Create the destination directory so an unusable one ends the run instead
/// of failing every track.
async fn prepare_destination(directory: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(directory).await?;
    Ok(())
}

fn spawn_interrupt_listener(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, stopping");
                token.cancel();
            }
            Err(e) => error!(error = %e, "Could not listen for Ctrl+C"),
        }
    });
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}
