//! Area-of-interest traversal and acquisition of 3D tilesets.
//!
//! This crate walks a remote 3D tileset tree, keeps only the branches whose
//! bounding volumes intersect an area of interest, and downloads the selected
//! geometry tiles into a cache under a byte cap. Tile vertices can then be
//! reprojected into a local model frame.
//!
//! # Design principles
//!
//! - **Runtime-agnostic**: Transports and caches return boxed futures; any
//!   executor can drive them
//! - **Explicit sessions**: The service session token lives in a [`Session`]
//!   passed to every request, never in global state
//! - **Bounded work**: Traversal is limited by tile, document and node budgets,
//!   and acquisition by a byte cap
//!
//! # Example
//!
//! ```ignore
//! use tilewalk::{AreaOfInterest, Client, DiskCache, Session, TileDownloader, TilesetWalker};
//!
//! let client = Client::new();
//! let mut session = Session::new(api_key)?;
//! let root = client.fetch_root(&mut session).await?;
//!
//! let aoi = AreaOfInterest::from_bounds(8.54, 47.36, 8.56, 47.38)?;
//! let walker = TilesetWalker::new(&aoi, 4, 25.0)?;
//! let outcome = walker.plan_downloads(&client, &mut session, root).await;
//!
//! let downloader = TileDownloader::new(client, Arc::new(DiskCache::new("tiles")?));
//! let report = downloader
//!     .ensure(&mut session, &outcome.tiles, true, 512 * 1024 * 1024)
//!     .await?;
//! ```

mod aoi;
pub mod cache;
mod client;
mod downloader;
mod error;
pub mod freshness;
mod reproject;
mod session;
pub mod transport;
pub mod types;
mod walker;

pub use aoi::{AOI_DENSIFY_CHORD_METERS, AreaOfInterest};
pub use cache::{Cache, CacheEntry, DiskCache, MemoryCache, cache_key};
pub use client::{Client, DEFAULT_ROOT_URL, TileContent, validate_glb};
pub use downloader::{DownloadReport, TileDownloadResult, TileDownloader};
pub use error::{Error, Result};
pub use freshness::{TileCacheMetadata, is_expired};
pub use reproject::MeshReprojector;
pub use session::{Session, canonical_url, resolve};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
pub use types::{
    BoundingVolume, ContentKind, FetchFailure, PlannedTile, Refine, TileNode, Tileset,
    TraversalBudgets, TraversalOutcome, TraversalStats,
};
pub use walker::{TilesetWalker, plan_downloads};

// Re-export geometry types for convenience.
pub use tilewalk_geo::{self as geo, GeodeticPoint, LocalFrame};
