//! Cookie jar adapter for callers that cannot handle errors
//!
//! HTTP cookie-jar interfaces usually have no error channel: setting cookies
//! returns nothing and reading them returns a plain string. This adapter
//! maps a [`Storage`] onto that shape by logging failures and substituting
//! an empty cookie string. Use it only at that boundary; everything else
//! should call [`Storage`] directly and handle the result.

use crate::storage::Storage;
use tracing::warn;
use url::Url;

/// Non-propagating cookie jar over any [`Storage`]
#[derive(Debug, Clone)]
pub struct LenientCookieJar<S> {
    storage: S,
}

impl<S: Storage> LenientCookieJar<S> {
    /// Wraps `storage`, which must already be initialized
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Gets a reference to the wrapped storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Stores cookies for the host of `url`, logging any failure
    pub fn set_cookies(&self, url: &Url, cookies: &str) {
        if let Err(e) = self.storage.set_cookies_for(url, cookies) {
            warn!("Failed to store cookies for {}: {}", url, e);
        }
    }

    /// Returns cookies for the host of `url`
    ///
    /// A host with no stored cookies and a failed lookup both yield an empty
    /// string; the failure is logged.
    pub fn cookies(&self, url: &Url) -> String {
        match self.storage.cookies_for(url) {
            Ok(cookies) => cookies.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to load cookies for {}: {}", url, e);
                String::new()
            }
        }
    }
}
