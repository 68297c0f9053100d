//! API key and session token handling.
//!
//! The tile service hands out an opaque `session` query parameter in the
//! URLs it returns. Later requests are only authorized when they carry it, so
//! it is captured the first time it shows up and appended from then on.

use std::fmt;

use reqwest::Url;

use crate::error::{Error, Result};

/// Query parameter carrying the API key.
pub const KEY_PARAM: &str = "key";
/// Query parameter carrying the session token.
pub const SESSION_PARAM: &str = "session";

/// Credentials for one traversal or download run.
///
/// Passed explicitly to every client call so independent runs never share a
/// token.
#[derive(Clone)]
pub struct Session {
    api_key: String,
    token: Option<String>,
}

impl Session {
    /// Create a session for an API key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the key is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config {
                context: "api key",
                detail: "an API key is required".to_string(),
            });
        }
        Ok(Self {
            api_key,
            token: None,
        })
    }

    /// Resume with a previously captured session token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The captured session token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Capture the session token from `url` if none is held yet.
    ///
    /// Returns true if a token was captured by this call.
    pub fn capture(&mut self, url: &Url) -> bool {
        if self.token.is_some() {
            return false;
        }
        let Some(token) = query_value(url, SESSION_PARAM).filter(|t| !t.is_empty()) else {
            return false;
        };
        tracing::debug!("captured session token");
        self.token = Some(token);
        true
    }

    /// Add the API key and, once captured, the session token to `url`.
    ///
    /// Parameters already present on the URL are left alone.
    #[must_use]
    pub fn authorize(&self, url: &Url) -> Url {
        let mut missing = Vec::with_capacity(2);
        if query_value(url, KEY_PARAM).is_none() {
            missing.push((KEY_PARAM, self.api_key.as_str()));
        }
        if let Some(token) = &self.token
            && query_value(url, SESSION_PARAM).is_none()
        {
            missing.push((SESSION_PARAM, token.as_str()));
        }

        let mut out = url.clone();
        if !missing.is_empty() {
            out.query_pairs_mut().extend_pairs(missing);
        }
        out
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_key", &"<redacted>")
            .field("token", &self.token)
            .finish()
    }
}

fn query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Resolve a content URI against the URL of the document that contains it.
///
/// # Errors
///
/// Returns [`Error::Json`] if the URI cannot be resolved; the document is
/// considered malformed.
pub fn resolve(base: &Url, uri: &str) -> Result<Url> {
    base.join(uri).map_err(|e| Error::Json {
        url: base.to_string(),
        message: format!("invalid content uri {uri:?}: {e}"),
    })
}

/// `url` without credential parameters.
///
/// Used wherever URLs are compared or hashed, so the same tile is recognized
/// across sessions and keys. Unparseable input is returned unchanged.
#[must_use]
pub fn canonical_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != KEY_PARAM && k != SESSION_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.into()
}
