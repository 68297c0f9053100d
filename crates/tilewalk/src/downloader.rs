//! Cache-aware acquisition of planned tiles under a byte cap.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::cache::{Cache, CacheEntry};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::freshness::is_expired;
use crate::session::{Session, canonical_url};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{FetchFailure, PlannedTile};

/// One tile made available locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileDownloadResult {
    /// The planned content URL.
    pub content_uri: String,
    /// Where the payload lives, for file-backed caches.
    pub path: Option<PathBuf>,
    /// Payload size in bytes.
    pub bytes: u64,
    /// True if no download was needed.
    pub from_cache: bool,
}

/// The result of acquiring a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Acquired tiles, in plan order.
    pub results: Vec<TileDownloadResult>,
    /// Sum of `results` sizes.
    pub total_bytes: u64,
    /// Planned tiles left out because the cap was reached.
    pub skipped_for_cap: usize,
    /// True if the cap stopped acquisition.
    pub cap_reached: bool,
    /// True if acquisition was cancelled part way.
    pub cancelled: bool,
    /// Tiles that could not be acquired.
    pub failures: Vec<FetchFailure>,
}

/// Fetches planned tiles through a cache.
pub struct TileDownloader<C: Cache, T: Transport = ReqwestTransport> {
    client: Client<T>,
    cache: Arc<C>,
    cancel: CancellationToken,
}

impl<C: Cache, T: Transport> TileDownloader<C, T> {
    /// Create a downloader fetching through `client` into `cache`.
    #[must_use]
    pub fn new(client: Client<T>, cache: Arc<C>) -> Self {
        Self {
            client,
            cache,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop acquiring when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The cache tiles are stored in.
    #[must_use]
    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    /// Make the planned tiles available locally, in plan order.
    ///
    /// Fresh cache entries are reused. With `download` disabled, tiles that
    /// are not cached count as failures; stale entries are still used since
    /// they cannot be refreshed. Acquisition stops before the total size
    /// would exceed `cap_bytes`. Download and cache errors for one tile are
    /// recorded in the report and the next tile is tried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if cancelled before any tile was acquired,
    /// and [`Error::Acquisition`] if nothing was acquired and every attempt
    /// failed. A cap reached before the first tile is not an error.
    pub async fn ensure(
        &self,
        session: &mut Session,
        plan: &[PlannedTile],
        download: bool,
        cap_bytes: u64,
    ) -> Result<DownloadReport> {
        let mut report = DownloadReport::default();

        for (index, tile) in plan.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let uri = tile.content_uri.as_str();
            let cached = match self.cache.lookup(uri).await {
                Ok(cached) => cached,
                Err(e) => {
                    report.fail(uri, &e);
                    continue;
                }
            };
            let usable = cached.filter(|entry| {
                !download || !is_expired(entry.metadata.as_ref(), Utc::now())
            });

            if let Some(entry) = usable {
                if exceeds_cap(report.total_bytes, entry.size, cap_bytes) {
                    stop_for_cap(&mut report, plan.len() - index);
                    break;
                }
                report.push(uri, &entry, true);
                continue;
            }

            if !download {
                report.failures.push(FetchFailure {
                    uri: canonical_url(uri),
                    message: "not cached and downloads disabled".to_string(),
                });
                continue;
            }

            if let Some(size) = self.client.probe_size(session, uri).await
                && exceeds_cap(report.total_bytes, size, cap_bytes)
            {
                stop_for_cap(&mut report, plan.len() - index);
                break;
            }

            let content = match self.client.fetch_content(session, uri).await {
                Ok(content) => content,
                Err(e) => {
                    report.fail(uri, &e);
                    continue;
                }
            };

            let size = content.bytes.len() as u64;
            if exceeds_cap(report.total_bytes, size, cap_bytes) {
                tracing::debug!(url = %canonical_url(uri), size, "discarding tile over cap");
                stop_for_cap(&mut report, plan.len() - index);
                break;
            }

            match self
                .cache
                .put(uri, content.bytes, Some(content.metadata))
                .await
            {
                Ok(entry) => report.push(uri, &entry, false),
                Err(e) => report.fail(uri, &e),
            }
        }

        tracing::info!(
            tiles = report.results.len(),
            bytes = report.total_bytes,
            failures = report.failures.len(),
            skipped_for_cap = report.skipped_for_cap,
            "acquisition finished"
        );

        if report.results.is_empty() {
            if report.cancelled {
                return Err(Error::Cancelled);
            }
            if !report.cap_reached
                && let Some(first) = report.failures.first()
            {
                return Err(Error::Acquisition {
                    uri: first.uri.clone(),
                    cause: first.message.clone(),
                });
            }
        }

        Ok(report)
    }
}

impl DownloadReport {
    fn push(&mut self, uri: &str, entry: &CacheEntry, from_cache: bool) {
        self.total_bytes += entry.size;
        self.results.push(TileDownloadResult {
            content_uri: uri.to_string(),
            path: entry.path.clone(),
            bytes: entry.size,
            from_cache,
        });
    }

    fn fail(&mut self, uri: &str, error: &Error) {
        let uri = canonical_url(uri);
        tracing::warn!(url = %uri, error = %error, "tile acquisition failed");
        self.failures.push(FetchFailure {
            uri,
            message: error.to_string(),
        });
    }
}

/// True if adding `size` to `total` would pass `cap`. Sizes come from
/// response headers, so an overflowing sum counts as over the cap.
fn exceeds_cap(total: u64, size: u64, cap: u64) -> bool {
    total.checked_add(size).is_none_or(|sum| sum > cap)
}

fn stop_for_cap(report: &mut DownloadReport, remaining: usize) {
    tracing::info!(
        total_bytes = report.total_bytes,
        remaining,
        "byte cap reached"
    );
    report.cap_reached = true;
    report.skipped_for_cap = remaining;
}
