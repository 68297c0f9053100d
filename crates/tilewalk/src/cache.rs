//! Cache abstractions for downloaded tile content.
//!
//! Entries are keyed by content URL with credential parameters removed, so a
//! tile fetched under one session is found again under the next.
//!
//! # Implementations
//!
//! - [`DiskCache`]: one file per tile plus a metadata sidecar
//! - [`MemoryCache`]: in-memory cache with optional size limits

use std::{
    collections::HashMap,
    fs,
    future::Future,
    io,
    path::{Path, PathBuf},
    pin::Pin,
    sync::{Arc, RwLock},
};

use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::freshness::TileCacheMetadata;
use crate::session::canonical_url;

/// Future type for cache lookups.
pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<CacheEntry>>> + Send + 'a>>;

/// Future type for cache reads.
pub type GetFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>>> + Send + 'a>>;

/// Future type for cache writes.
pub type PutFuture<'a> = Pin<Box<dyn Future<Output = Result<CacheEntry>> + Send + 'a>>;

/// Future type for cache removals.
pub type CacheFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// What the cache knows about a stored tile.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Where the payload lives, for caches backed by files.
    pub path: Option<PathBuf>,
    /// Payload size in bytes.
    pub size: u64,
    /// Freshness metadata stored with the payload.
    pub metadata: Option<TileCacheMetadata>,
}

/// A cache for tile content.
pub trait Cache: Send + Sync {
    /// Describe the entry for `url` without reading its payload.
    fn lookup(&self, url: &str) -> LookupFuture<'_>;

    /// Read the payload for `url`.
    fn get(&self, url: &str) -> GetFuture<'_>;

    /// Store a payload and its metadata, replacing any previous entry.
    fn put(&self, url: &str, data: Vec<u8>, metadata: Option<TileCacheMetadata>)
    -> PutFuture<'_>;

    /// Remove the entry for `url`, if any.
    fn remove(&self, url: &str) -> CacheFuture<'_>;
}

/// Cache key for a content URL: hex SHA-1 of the URL without credentials.
#[must_use]
pub fn cache_key(url: &str) -> String {
    format!("{:x}", Sha1::digest(canonical_url(url).as_bytes()))
}

/// A cache storing each tile as `<key>.glb` with `<key>.meta.json` beside it.
///
/// Writes go to a temporary file that is renamed into place, so readers never
/// observe a partial payload.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open a cache directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::cache("open", e))?;
        Ok(Self { dir })
    }

    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the payload file for `url`.
    #[must_use]
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.glb", cache_key(url)))
    }

    fn meta_path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.meta.json", cache_key(url)))
    }

    fn lookup_sync(&self, url: &str) -> Result<Option<CacheEntry>> {
        let path = self.path_for(url);
        let size = match fs::metadata(&path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::cache("lookup", e)),
        };

        // A missing or unreadable sidecar leaves the entry without metadata.
        let metadata = match fs::read(self.meta_path_for(url)) {
            Ok(raw) => serde_json::from_slice::<TileCacheMetadata>(&raw)
                .inspect_err(|e| {
                    tracing::debug!(
                        path = %path.display(),
                        error = %e,
                        "ignoring bad cache metadata"
                    );
                })
                .ok(),
            Err(_) => None,
        };

        Ok(Some(CacheEntry {
            path: Some(path),
            size,
            metadata,
        }))
    }

    fn put_sync(
        &self,
        url: &str,
        data: &[u8],
        metadata: Option<&TileCacheMetadata>,
    ) -> Result<CacheEntry> {
        let path = self.path_for(url);
        let meta_path = self.meta_path_for(url);

        match metadata {
            Some(meta) => {
                let raw = serde_json::to_vec_pretty(meta).map_err(|e| Error::cache("put", e))?;
                write_atomic(&meta_path, &raw)?;
            }
            None => remove_if_exists(&meta_path)?,
        }
        write_atomic(&path, data)?;

        Ok(CacheEntry {
            path: Some(path),
            size: data.len() as u64,
            metadata: metadata.cloned(),
        })
    }
}

/// Write to a sibling temporary file, then rename it over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(format!(".{}.tmp", std::process::id()));
    let temp = PathBuf::from(temp);

    fs::write(&temp, data).map_err(|e| Error::cache("put", e))?;
    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        Error::cache("put", e)
    })
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::cache("remove", e)),
    }
}

impl Cache for DiskCache {
    fn lookup(&self, url: &str) -> LookupFuture<'_> {
        let result = self.lookup_sync(url);
        Box::pin(async move { result })
    }

    fn get(&self, url: &str) -> GetFuture<'_> {
        let result = match fs::read(self.path_for(url)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::cache("get", e)),
        };
        Box::pin(async move { result })
    }

    fn put(
        &self,
        url: &str,
        data: Vec<u8>,
        metadata: Option<TileCacheMetadata>,
    ) -> PutFuture<'_> {
        let result = self.put_sync(url, &data, metadata.as_ref());
        Box::pin(async move { result })
    }

    fn remove(&self, url: &str) -> CacheFuture<'_> {
        let result =
            remove_if_exists(&self.path_for(url)).and(remove_if_exists(&self.meta_path_for(url)));
        Box::pin(async move { result })
    }
}

/// An in-memory cache.
///
/// Entries live in a `HashMap` behind a `RwLock`. With a size limit, the
/// oldest entries are evicted first.
#[derive(Debug)]
pub struct MemoryCache {
    data: Arc<RwLock<MemoryCacheInner>>,
    max_size: Option<usize>,
}

#[derive(Debug, Default)]
struct MemoryCacheInner {
    entries: HashMap<String, (Vec<u8>, Option<TileCacheMetadata>)>,
    /// Insertion order for eviction.
    order: Vec<String>,
    current_size: usize,
}

impl MemoryCache {
    /// Create a new memory cache with no size limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(MemoryCacheInner::default())),
            max_size: None,
        }
    }

    /// Create a new memory cache with a maximum size in bytes.
    #[must_use]
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size: Some(max_size),
            ..Self::new()
        }
    }

    /// Total payload bytes held.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.read().map_or(0, |d| d.current_size)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().map_or(0, |d| d.entries.len())
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put_sync(
        &self,
        url: &str,
        data: Vec<u8>,
        metadata: Option<TileCacheMetadata>,
    ) -> Result<CacheEntry> {
        let key = cache_key(url);
        let mut cache = self.data.write().map_err(|e| Error::cache("put", e))?;

        if let Some((old, _)) = cache.entries.remove(&key) {
            cache.current_size -= old.len();
            cache.order.retain(|k| k != &key);
        }

        let size = data.len();
        if let Some(max_size) = self.max_size {
            while cache.current_size + size > max_size && !cache.order.is_empty() {
                let oldest = cache.order.remove(0);
                if let Some((old, _)) = cache.entries.remove(&oldest) {
                    cache.current_size -= old.len();
                }
            }
        }

        let entry = CacheEntry {
            path: None,
            size: size as u64,
            metadata: metadata.clone(),
        };
        cache.entries.insert(key.clone(), (data, metadata));
        cache.order.push(key);
        cache.current_size += size;
        Ok(entry)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryCache {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            max_size: self.max_size,
        }
    }
}

impl Cache for MemoryCache {
    fn lookup(&self, url: &str) -> LookupFuture<'_> {
        let result = self
            .data
            .read()
            .map_err(|e| Error::cache("lookup", e))
            .map(|d| {
                d.entries.get(&cache_key(url)).map(|(data, meta)| CacheEntry {
                    path: None,
                    size: data.len() as u64,
                    metadata: meta.clone(),
                })
            });
        Box::pin(async move { result })
    }

    fn get(&self, url: &str) -> GetFuture<'_> {
        let result = self
            .data
            .read()
            .map_err(|e| Error::cache("get", e))
            .map(|d| d.entries.get(&cache_key(url)).map(|(data, _)| data.clone()));
        Box::pin(async move { result })
    }

    fn put(
        &self,
        url: &str,
        data: Vec<u8>,
        metadata: Option<TileCacheMetadata>,
    ) -> PutFuture<'_> {
        let result = self.put_sync(url, data, metadata);
        Box::pin(async move { result })
    }

    fn remove(&self, url: &str) -> CacheFuture<'_> {
        let key = cache_key(url);
        let result = self
            .data
            .write()
            .map_err(|e| Error::cache("remove", e))
            .map(|mut cache| {
                if let Some((data, _)) = cache.entries.remove(&key) {
                    cache.current_size -= data.len();
                    cache.order.retain(|k| k != &key);
                }
            });
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_cache_key_ignores_credentials() {
        let a = cache_key("https://t.example/a.glb?key=k1&session=s1");
        let b = cache_key("https://t.example/a.glb?session=s2");
        let c = cache_key("https://t.example/b.glb");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_disk_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("tiles")).unwrap();
        let url = "https://t.example/a.glb?session=s1";

        assert!(cache.lookup(url).await.unwrap().is_none());
        assert!(cache.get(url).await.unwrap().is_none());

        let meta = TileCacheMetadata::new(Utc::now());
        let entry = cache.put(url, vec![7; 40], Some(meta.clone())).await.unwrap();
        assert_eq!(entry.size, 40);
        assert_eq!(entry.path.as_deref(), Some(cache.path_for(url).as_path()));

        let found = cache.lookup(url).await.unwrap().unwrap();
        assert_eq!(found.size, 40);
        assert_eq!(found.metadata, Some(meta));
        assert_eq!(cache.get(url).await.unwrap(), Some(vec![7; 40]));

        // Only the payload and its sidecar are left behind.
        let mut names: Vec<String> = fs::read_dir(cache.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        let key = cache_key(url);
        assert_eq!(names, vec![format!("{key}.glb"), format!("{key}.meta.json")]);

        cache.remove(url).await.unwrap();
        assert!(cache.lookup(url).await.unwrap().is_none());
        assert!(fs::read_dir(cache.dir()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_disk_cache_bad_sidecar_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();
        let url = "https://t.example/a.glb";

        cache.put(url, vec![1, 2, 3], None).await.unwrap();
        fs::write(cache.meta_path_for(url), b"not json").unwrap();

        let found = cache.lookup(url).await.unwrap().unwrap();
        assert_eq!(found.size, 3);
        assert!(found.metadata.is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_basic() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());

        cache.put("http://a/x.glb", vec![1, 2, 3], None).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), 3);

        // Same tile under a different session.
        let entry = cache.lookup("http://a/x.glb?session=s").await.unwrap().unwrap();
        assert_eq!(entry.size, 3);
        assert!(entry.path.is_none());
        assert_eq!(
            cache.get("http://a/x.glb").await.unwrap(),
            Some(vec![1, 2, 3])
        );

        cache.remove("http://a/x.glb").await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test]
    async fn test_memory_cache_eviction() {
        let cache = MemoryCache::with_max_size(10);

        cache.put("http://a", vec![0; 5], None).await.unwrap();
        cache.put("http://b", vec![0; 5], None).await.unwrap();
        assert_eq!(cache.size(), 10);

        // Adding 3 more bytes evicts the oldest entry.
        cache.put("http://c", vec![0; 3], None).await.unwrap();
        assert_eq!(cache.size(), 8);
        assert!(cache.lookup("http://a").await.unwrap().is_none());
        assert!(cache.lookup("http://b").await.unwrap().is_some());
        assert!(cache.lookup("http://c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_cache_update() {
        let cache = MemoryCache::new();
        cache.put("http://a", vec![1, 2, 3], None).await.unwrap();
        cache.put("http://a", vec![1, 2, 3, 4, 5], None).await.unwrap();
        assert_eq!(cache.size(), 5);
        assert_eq!(cache.len(), 1);
    }
}
