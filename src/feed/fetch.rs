use crate::cache::Cache;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Retrieves the threat feed, either over HTTPS or from disk.
///
/// Downloaded snapshots are cached by URL so repeated audits against the
/// same feed don't hit the feed host every time.
pub struct FeedFetcher {
    client: reqwest::Client,
    cache: Option<Cache>,
    refresh: bool,
}

impl FeedFetcher {
    /// `timeout` bounds the whole download, from connect to the last byte.
    pub fn with_cache(cache: Option<Cache>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for the feed")?;
        Ok(Self {
            client,
            cache,
            refresh: false,
        })
    }

    /// Always download, but still store the fresh snapshot in the cache.
    pub fn refreshing(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Downloads the feed at `url`, or returns a cached copy within its TTL.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let cache_key = format!("feed_{}", url);

        if !self.refresh {
            if let Some(text) = self.cache.as_ref().and_then(|c| c.get::<String>(&cache_key)) {
                debug!(url, "Using cached feed snapshot");
                return Ok(text);
            }
        }

        info!(url, "Downloading threat feed");
        let response = self
            .client
            .get(url)
            .header("Accept", "text/csv, text/plain")
            .send()
            .await
            .with_context(|| format!("Failed to download feed from {}", url))?
            .error_for_status()
            .with_context(|| format!("Feed host rejected request for {}", url))?;

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read feed body from {}", url))?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&cache_key, &text) {
                debug!(error = %e, "Could not cache feed snapshot");
            }
        }

        Ok(text)
    }

    /// Reads a feed from a local file.
    pub fn read_file(path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feed file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_fetch_uses_cached_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::with_dir(dir.path().to_path_buf(), Duration::from_secs(3600));
        let url = "https://feeds.invalid/compromised.csv";
        cache
            .set(&format!("feed_{}", url), &"pkg,type,versions\n".to_string())
            .unwrap();

        let fetcher = FeedFetcher::with_cache(Some(cache), Duration::from_secs(5)).unwrap();
        let text = fetcher.fetch(url).await.unwrap();
        assert_eq!(text, "pkg,type,versions\n");
    }

    #[tokio::test]
    async fn test_fetch_times_out_on_silent_host() {
        // Accepts the connection but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let fetcher = FeedFetcher::with_cache(None, Duration::from_millis(200)).unwrap();
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            fetcher.fetch(&format!("http://{}/feed.csv", addr)),
        )
        .await
        .expect("fetch should give up on its own");

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        std::fs::write(&path, "a,b,c\n").unwrap();

        assert_eq!(FeedFetcher::read_file(&path).unwrap(), "a,b,c\n");
        assert!(FeedFetcher::read_file(&dir.path().join("missing.csv")).is_err());
    }
}
