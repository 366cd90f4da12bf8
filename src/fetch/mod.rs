//! HTTP download of remote flight datasets.
//!
//! Responses are streamed chunk by chunk to a local file, so a remote
//! dataset never has to fit in memory before batch reading starts.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Downloads `url` into `dest`, returning the number of bytes written.
///
/// # Errors
///
/// Fails on an invalid URL, a transport error, a non-success status or a
/// local write error. A partially written `dest` is removed.
#[tracing::instrument(skip(client, dest), fields(dest = %dest.display()))]
pub async fn download_to_file<C: HttpClient>(client: &C, url: &str, dest: &Path) -> Result<u64> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid URL '{url}'"))?,
    );

    let mut resp = client.execute(req).await?.error_for_status()?;
    debug!(content_length = ?resp.content_length(), "Download started");

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(dest).await?;

    let mut written = 0u64;
    let streamed: Result<()> = async {
        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = streamed {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(e.context(format!("downloading '{url}'")));
    }

    info!(bytes = written, "Download complete");
    Ok(written)
}
