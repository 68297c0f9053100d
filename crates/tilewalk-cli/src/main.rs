//! Command-line planner and downloader for 3D tiles.
//!
//! `plan` walks the remote tileset and prints the geometry tiles covering an
//! area of interest. `fetch` does the same, then downloads the tiles into a
//! disk cache under a byte cap.

mod config;
mod summary;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use config::{CliArgs, Command, FetchArgs, PlanArgs};
use tilewalk::{
    Client, DiskCache, Result, Session, TileDownloader, TilesetWalker, TraversalOutcome,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let args = CliArgs::parse();

    // Ctrl-C stops the walk or the downloads at the next tile.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, stopping");
                cancel.cancel();
            }
        }
    });

    let result = match args.command {
        Command::Plan(args) => plan(&args, &cancel).await,
        Command::Fetch(args) => fetch(&args, &cancel).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn plan(args: &PlanArgs, cancel: &CancellationToken) -> Result<()> {
    let (_, _, outcome) = walk(args, cancel).await?;
    print!("{}", summary::plan_summary(&outcome));
    Ok(())
}

async fn fetch(args: &FetchArgs, cancel: &CancellationToken) -> Result<()> {
    let (client, mut session, outcome) = walk(&args.plan, cancel).await?;
    print!("{}", summary::plan_summary(&outcome));
    if outcome.tiles.is_empty() {
        return Ok(());
    }

    let cache = DiskCache::new(&args.cache_dir)?;
    tracing::info!(dir = %args.cache_dir.display(), "using tile cache");

    let downloader = TileDownloader::new(client, Arc::new(cache)).with_cancellation(cancel.clone());
    let report = downloader
        .ensure(&mut session, &outcome.tiles, !args.no_download, args.cap_bytes)
        .await?;
    print!("{}", summary::download_summary(&report));
    Ok(())
}

/// Fetch the root tileset and plan the tiles covering the area.
async fn walk(
    args: &PlanArgs,
    cancel: &CancellationToken,
) -> Result<(Client, Session, TraversalOutcome)> {
    // Configuration problems surface before any request is made.
    let aoi = args.area_of_interest()?;
    let mut session = Session::new(args.api_key.as_str())?;
    let walker = TilesetWalker::new(&aoi, args.max_lod, args.relax)?
        .with_budgets(args.budgets())
        .with_cancellation(cancel.clone());

    let footprint = walker.footprint();
    tracing::info!(
        width_m = footprint.width_m(),
        height_m = footprint.height_m(),
        size_m = footprint.diagonal_m(),
        target_m = walker.target_footprint_meters(),
        max_lod = args.max_lod,
        "planning"
    );

    let client = Client::new().with_root_url(args.root_url.as_str());
    let root = client.fetch_root(&mut session).await?;
    let outcome = walker.plan_downloads(&client, &mut session, root).await;
    Ok((client, session, outcome))
}
