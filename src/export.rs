//! CSV rendering and file-system publication of generated feeds.
//!
//! A published geofeed is a plain CSV written under the public directory,
//! served by whatever static file server fronts this API. Generation and
//! removal are the only file-system touch points in the application.

use std::io;
use std::path::PathBuf;

use uuid::Uuid;

use crate::models::GeofeedRow;

/// Where generated feeds are written and how their public URLs are formed.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub dir: PathBuf,
    pub base_url: String,
}

impl PublishConfig {
    /// Load from `GEOFEED_PUBLISH_DIR` and `GEOFEED_PUBLIC_BASE_URL`,
    /// with local-development defaults.
    pub fn from_env() -> Self {
        let dir = std::env::var("GEOFEED_PUBLISH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public/geo"));
        let base_url = std::env::var("GEOFEED_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        Self { dir, base_url }
    }

    pub fn feed_path(&self, geofeed_id: Uuid) -> PathBuf {
        self.dir.join(feed_file_name(geofeed_id))
    }

    pub fn public_url(&self, geofeed_id: Uuid) -> String {
        format!("{}/geo/{}", self.base_url, feed_file_name(geofeed_id))
    }
}

/// File name a geofeed publishes under.
pub fn feed_file_name(geofeed_id: Uuid) -> String {
    format!("geofeed-{geofeed_id}.csv")
}

/// Render rows as RFC 8805 CSV: five comma-separated fields per line, no
/// header, empty optionals as empty strings.
pub fn render_csv(rows: &[GeofeedRow]) -> String {
    rows.iter()
        .map(|row| {
            [
                row.network.as_str(),
                row.country_code.as_str(),
                row.subdivision.as_str(),
                row.city.as_str(),
                row.postal_code.as_str(),
            ]
            .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write a generated feed under the publish directory, creating it on
/// first use.
pub async fn write_feed(config: &PublishConfig, geofeed_id: Uuid, content: &str) -> io::Result<()> {
    tokio::fs::create_dir_all(&config.dir).await?;
    tokio::fs::write(config.feed_path(geofeed_id), content).await
}

/// Remove a published feed file. A file that is already gone is not an
/// error.
pub async fn remove_feed(config: &PublishConfig, geofeed_id: Uuid) -> io::Result<()> {
    match tokio::fs::remove_file(config.feed_path(geofeed_id)).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Best-effort removal used on geofeed deletion; failures are logged.
pub async fn remove_feed_best_effort(config: &PublishConfig, geofeed_id: Uuid) {
    if let Err(err) = remove_feed(config, geofeed_id).await {
        log::warn!("failed to remove published feed for geofeed {geofeed_id}: {err}");
    }
}
