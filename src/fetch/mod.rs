//! Loading raw dataset bytes from HTTP(S) URLs or local files.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

#[cfg(test)]
pub(crate) mod canned;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

/// Downloads `url` and returns the response body.
///
/// # Errors
///
/// Fails on transport errors and on any non-success status code.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned status {status}");
    }

    Ok(resp.bytes().await?.to_vec())
}

/// Loads a dataset from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(client), fields(source = %source))]
pub async fn load_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>> {
    let started = std::time::Instant::now();
    let bytes = if is_remote(source) {
        fetch_bytes(client, source)
            .await
            .with_context(|| format!("failed to fetch {source}"))?
    } else {
        std::fs::read(source).with_context(|| format!("failed to read {source}"))?
    };

    info!(
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Source loaded"
    );
    debug!(remote = is_remote(source), "Source kind");
    Ok(bytes)
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
