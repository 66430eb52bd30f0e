//! Request key normalization.

use url::Url;

use crate::error::{CacheError, Result};

/// Canonicalizes a request URL into a cache key.
///
/// Scheme and host are lowercased, default ports and the fragment are dropped,
/// and dot segments in the path are resolved, so equivalent URLs share a key.
pub fn normalize_key(raw: &str) -> Result<String> {
    let mut url = Url::parse(raw.trim())
        .map_err(|err| CacheError::InvalidKey(format!("'{}': {}", raw, err)))?;
    url.set_fragment(None);
    Ok(url.into())
}
