//! HTTP client for tileset documents and tile content.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Url;
use reqwest::header::CONTENT_LENGTH;

use crate::error::{Error, Result};
use crate::freshness::TileCacheMetadata;
use crate::session::{Session, canonical_url, resolve};
use crate::transport::{ReqwestTransport, Transport, TransportResponse};
use crate::types::Tileset;

/// Root document of the photorealistic 3D tiles service.
pub const DEFAULT_ROOT_URL: &str = "https://tile.googleapis.com/v1/3dtiles/root.json";

/// Magic bytes at the start of a binary glTF file.
const GLB_MAGIC: &[u8; 4] = b"glTF";
/// Length of the binary glTF header: magic, version, total length.
const GLB_HEADER_LEN: usize = 12;
/// The only binary glTF container version.
const GLB_VERSION: u32 = 2;

/// Downloaded tile content with the freshness metadata of its response.
#[derive(Debug, Clone)]
pub struct TileContent {
    /// The validated binary glTF payload.
    pub bytes: Vec<u8>,
    /// Freshness headers of the response.
    pub metadata: TileCacheMetadata,
}

/// Client for a 3D tiles service.
///
/// The client itself holds no per-run state: the API key and session token
/// live in the [`Session`] passed to every call.
///
/// # Example
///
/// ```ignore
/// let client = Client::new();
/// let mut session = Session::new(api_key)?;
/// let tileset = client.fetch_root(&mut session).await?;
/// ```
pub struct Client<T: Transport = ReqwestTransport> {
    transport: Arc<T>,
    root_url: String,
}

impl Client<ReqwestTransport> {
    /// Create a client for the default service.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }
}

impl Default for Client<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            root_url: self.root_url.clone(),
        }
    }
}

impl<T: Transport> Client<T> {
    /// Create a client with a custom transport.
    #[must_use]
    pub fn with_transport(transport: impl Into<Arc<T>>) -> Self {
        Self {
            transport: transport.into(),
            root_url: DEFAULT_ROOT_URL.to_string(),
        }
    }

    /// Use a different root document.
    #[must_use]
    pub fn with_root_url(mut self, root_url: impl Into<String>) -> Self {
        self.root_url = root_url.into();
        self
    }

    /// The root document URL, without credentials.
    #[must_use]
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Fetch the root tileset.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the document is malformed.
    pub async fn fetch_root(&self, session: &mut Session) -> Result<Tileset> {
        let root_url = self.root_url.clone();
        self.fetch_tileset(session, &root_url).await
    }

    /// Fetch a tileset document.
    ///
    /// Every content URI in the returned tree is resolved against the
    /// document's final URL, and the session token is captured from them if
    /// the session has none yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the document is malformed.
    pub async fn fetch_tileset(&self, session: &mut Session, uri: &str) -> Result<Tileset> {
        let response = self.get(session, uri).await?;
        let mut tileset = Tileset::from_json(&canonical_url(uri), &response.body)?;

        let base = response.url;
        tileset.root.try_for_each_mut(|node| {
            if let Some(content) = node.content_uri.as_deref() {
                let resolved = resolve(&base, content)?;
                session.capture(&resolved);
                node.content_uri = Some(resolved.into());
            }
            Ok(())
        })?;

        Ok(tileset)
    }

    /// Fetch and validate binary tile content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedJson`] if the service answered with JSON,
    /// [`Error::InvalidContent`] for any other payload that is not a binary
    /// glTF file, or the request error.
    pub async fn fetch_content(&self, session: &mut Session, uri: &str) -> Result<TileContent> {
        let response = self.get(session, uri).await?;
        validate_glb(&canonical_url(uri), &response.body)?;

        Ok(TileContent {
            metadata: TileCacheMetadata::from_headers(&response.headers, Utc::now()),
            bytes: response.body,
        })
    }

    /// Ask for the size of a content payload without downloading it.
    ///
    /// Returns `None` if the service does not say.
    pub async fn probe_size(&self, session: &mut Session, uri: &str) -> Option<u64> {
        let url = Url::parse(uri).ok()?;
        session.capture(&url);

        match self.transport.head(&session.authorize(&url)).await {
            Ok(response) if response.is_success() => response
                .headers
                .get(CONTENT_LENGTH)?
                .to_str()
                .ok()?
                .parse()
                .ok(),
            Ok(response) => {
                tracing::debug!(
                    url = %canonical_url(uri),
                    status = response.status,
                    "size probe rejected"
                );
                None
            }
            Err(e) => {
                tracing::debug!(url = %canonical_url(uri), error = %e, "size probe failed");
                None
            }
        }
    }

    async fn get(&self, session: &mut Session, uri: &str) -> Result<TransportResponse> {
        let url = Url::parse(uri).map_err(|e| Error::Http {
            url: canonical_url(uri),
            message: format!("invalid url: {e}"),
        })?;
        session.capture(&url);

        tracing::debug!(url = %canonical_url(uri), "fetching");
        let response = self.transport.get(&session.authorize(&url)).await?;
        session.capture(&response.url);

        if !response.is_success() {
            return Err(Error::HttpStatus {
                url: canonical_url(uri),
                status: response.status,
            });
        }
        Ok(response)
    }
}

/// Check that `data` is a binary glTF container.
///
/// # Errors
///
/// Returns [`Error::UnexpectedJson`] for JSON payloads and
/// [`Error::InvalidContent`] for anything else that is not a complete
/// version 2 container.
pub fn validate_glb(url: &str, data: &[u8]) -> Result<()> {
    let invalid = |detail: String| Error::InvalidContent {
        url: url.to_string(),
        detail,
    };

    if !data.starts_with(GLB_MAGIC) {
        if matches!(data.trim_ascii_start().first(), Some(b'{' | b'[')) {
            return Err(Error::UnexpectedJson {
                url: url.to_string(),
            });
        }
        return Err(invalid("missing glTF magic".to_string()));
    }
    if data.len() < GLB_HEADER_LEN {
        return Err(invalid(format!("truncated header of {} bytes", data.len())));
    }

    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != GLB_VERSION {
        return Err(invalid(format!("unsupported container version {version}")));
    }
    let declared = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
    if !usize::try_from(declared).is_ok_and(|d| d <= data.len()) {
        return Err(invalid(format!(
            "declared length {declared} exceeds payload of {} bytes",
            data.len()
        )));
    }
    Ok(())
}
