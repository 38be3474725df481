//! Feed retrieval for import-by-URL previews.

use crate::import::ImportError;

/// Upper bound on a fetched feed body. A published geofeed measured in
/// megabytes is almost certainly the wrong file.
const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;

/// Fetch the CSV body behind `url` for previewing.
///
/// Only `http`/`https` URLs are accepted; non-2xx responses and oversized
/// bodies are rejected before parsing.
pub async fn fetch_feed_text(url: &str) -> Result<String, ImportError> {
    let parsed = reqwest::Url::parse(url.trim()).map_err(|_| ImportError::InvalidSourceUrl)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ImportError::InvalidSourceUrl);
    }

    let response = reqwest::get(parsed).await?.error_for_status()?;
    let body = response.text().await?;
    if body.len() > MAX_FEED_BYTES {
        return Err(ImportError::FeedTooLarge);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let err = fetch_feed_text("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, ImportError::InvalidSourceUrl));

        let err = fetch_feed_text("not a url").await.unwrap_err();
        assert!(matches!(err, ImportError::InvalidSourceUrl));
    }
}
