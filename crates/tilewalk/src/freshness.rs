//! HTTP freshness metadata for cached tiles.

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{CACHE_CONTROL, ETAG, EXPIRES, HeaderMap, HeaderName, LAST_MODIFIED};
use serde::{Deserialize, Serialize};

/// Freshness information captured when a tile was downloaded.
///
/// Stored next to the cached payload. Header values that cannot be parsed are
/// dropped rather than treated as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCacheMetadata {
    pub downloaded_at: DateTime<Utc>,
    /// The raw `Cache-Control` header, empty if absent.
    #[serde(default)]
    pub cache_control_raw: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub max_age_seconds: Option<u64>,
    #[serde(default)]
    pub must_revalidate: bool,
    #[serde(default)]
    pub no_cache: bool,
}

impl TileCacheMetadata {
    /// Metadata with no caching directives.
    #[must_use]
    pub fn new(downloaded_at: DateTime<Utc>) -> Self {
        Self {
            downloaded_at,
            cache_control_raw: String::new(),
            expires_at: None,
            last_modified: None,
            etag: None,
            max_age_seconds: None,
            must_revalidate: false,
            no_cache: false,
        }
    }

    /// Extract freshness headers from a response.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, downloaded_at: DateTime<Utc>) -> Self {
        let text = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

        let mut meta = Self::new(downloaded_at);
        if let Some(raw) = text(CACHE_CONTROL) {
            meta.cache_control_raw = raw.to_string();
            for directive in raw.split(',').map(str::trim) {
                let (name, value) = directive
                    .split_once('=')
                    .map_or((directive, None), |(n, v)| (n.trim(), Some(v.trim())));
                match name.to_ascii_lowercase().as_str() {
                    "max-age" => {
                        meta.max_age_seconds =
                            value.and_then(|v| v.trim_matches('"').parse().ok());
                    }
                    "no-cache" => meta.no_cache = true,
                    "must-revalidate" => meta.must_revalidate = true,
                    _ => {}
                }
            }
        }
        meta.expires_at = text(EXPIRES).and_then(parse_http_date);
        meta.last_modified = text(LAST_MODIFIED).and_then(parse_http_date);
        meta.etag = text(ETAG).map(str::to_string);
        meta
    }

    /// True if the cached copy must not be reused at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.no_cache {
            return true;
        }
        if self.expires_at.is_some_and(|expires| expires < now) {
            return true;
        }
        let stale_at = self
            .max_age_seconds
            .and_then(|secs| TimeDelta::try_seconds(i64::try_from(secs).ok()?))
            .and_then(|age| self.downloaded_at.checked_add_signed(age));
        stale_at.is_some_and(|stale| stale < now)
    }
}

/// Expiry check that treats missing metadata as fresh.
#[must_use]
pub fn is_expired(metadata: Option<&TileCacheMetadata>, now: DateTime<Utc>) -> bool {
    metadata.is_some_and(|m| m.is_expired(now))
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use reqwest::header::HeaderValue;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn headers(pairs: &[(HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_missing_metadata_is_fresh() {
        assert!(!is_expired(None, now()));
    }

    #[test]
    fn test_no_cache_is_always_expired() {
        let mut meta = TileCacheMetadata::new(now());
        meta.no_cache = true;
        meta.max_age_seconds = Some(86_400);
        assert!(is_expired(Some(&meta), now()));
    }

    #[test]
    fn test_max_age_elapsed() {
        let mut meta = TileCacheMetadata::new(now() - TimeDelta::hours(2));
        meta.max_age_seconds = Some(3600);
        assert!(is_expired(Some(&meta), now()));

        meta.max_age_seconds = Some(3 * 3600);
        assert!(!is_expired(Some(&meta), now()));
    }

    #[test]
    fn test_expires_in_the_past() {
        let mut meta = TileCacheMetadata::new(now());
        meta.expires_at = Some(now() - TimeDelta::seconds(1));
        assert!(meta.is_expired(now()));
        meta.expires_at = Some(now() + TimeDelta::days(1));
        assert!(!meta.is_expired(now()));
    }

    #[test]
    fn test_from_headers() {
        let map = headers(&[
            (CACHE_CONTROL, "public, Max-Age=600, must-revalidate"),
            (EXPIRES, "Sat, 01 Jun 2024 13:00:00 GMT"),
            (LAST_MODIFIED, "Fri, 31 May 2024 08:30:00 GMT"),
            (ETAG, "\"abc123\""),
        ]);
        let meta = TileCacheMetadata::from_headers(&map, now());

        assert_eq!(meta.cache_control_raw, "public, Max-Age=600, must-revalidate");
        assert_eq!(meta.max_age_seconds, Some(600));
        assert!(meta.must_revalidate);
        assert!(!meta.no_cache);
        assert_eq!(
            meta.expires_at,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap())
        );
        assert_eq!(
            meta.last_modified,
            Some(Utc.with_ymd_and_hms(2024, 5, 31, 8, 30, 0).unwrap())
        );
        assert_eq!(meta.etag.as_deref(), Some("\"abc123\""));
    }

    #[test]
    fn test_unparseable_headers_are_dropped() {
        let map = headers(&[
            (CACHE_CONTROL, "max-age=soon, no-cache"),
            (EXPIRES, "0"),
        ]);
        let meta = TileCacheMetadata::from_headers(&map, now());
        assert_eq!(meta.max_age_seconds, None);
        assert!(meta.no_cache);
        assert_eq!(meta.expires_at, None);
    }

    #[test]
    fn test_metadata_json_round_trip() {
        let map = headers(&[(CACHE_CONTROL, "max-age=60")]);
        let meta = TileCacheMetadata::from_headers(&map, now());
        let json = serde_json::to_string(&meta).unwrap();
        let back: TileCacheMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
