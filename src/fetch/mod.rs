//! Loading raw bytes from local paths or HTTP(S) URLs.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use tracing::debug;

pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Reads `location` over HTTP when it is a URL, from disk otherwise.
pub async fn load_source<C: HttpClient>(client: &C, location: &str) -> Result<Vec<u8>> {
    debug!(location, "Loading source");
    if is_url(location) {
        fetch_bytes(client, location)
            .await
            .with_context(|| format!("fetching {location}"))
    } else {
        tokio::fs::read(location)
            .await
            .with_context(|| format!("reading {location}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.org/pool/a_B1.csv"));
        assert!(is_url("http://localhost:8080/a.csv"));
        assert!(!is_url("data/pool/a_B1.csv"));
        assert!(!is_url("/tmp/https.csv"));
    }

    #[tokio::test]
    async fn test_load_source_reads_local_file() {
        let path = std::env::temp_dir().join("kpi_grader_load_source.txt");
        std::fs::write(&path, b"0,1,2\n").unwrap();

        let bytes = load_source(&BasicClient::new(), path.to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(bytes, b"0,1,2\n");
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_load_source_missing_file_names_location() {
        let err = load_source(&BasicClient::new(), "/nonexistent/params.txt")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/params.txt"));
    }
}
