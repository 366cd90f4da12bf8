//! Resolving a user-supplied source into a batch reader.
//!
//! A source is a local CSV path, a gzip-compressed CSV, or an `http(s)` URL
//! that is downloaded to disk first.

use anyhow::{Context, Result};
use chrono::Utc;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::fetch::{BasicClient, download_to_file};
use crate::reader::BatchReader;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Byte stream handed to the batch reader.
pub type RecordStream = Box<dyn Read + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Local(PathBuf),
    Remote(String),
}

impl DataSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            DataSource::Remote(source.to_string())
        } else {
            DataSource::Local(PathBuf::from(source))
        }
    }

    /// Returns a local copy of the source. Remote sources are downloaded
    /// into a fresh run directory under `download_dir`.
    #[tracing::instrument(skip(self), fields(source = ?self))]
    pub async fn fetch(&self, download_dir: &Path) -> Result<FetchedSource> {
        match self {
            DataSource::Local(path) => Ok(FetchedSource {
                path: path.clone(),
                run_dir: None,
            }),
            DataSource::Remote(url) => {
                let run_dir = download_dir.join(run_dir_name());
                let dest = run_dir.join(remote_file_name(url));
                let client = BasicClient::new()?;
                info!(url = %url, dest = %dest.display(), "Downloading flight records");

                if let Err(e) = download_to_file(&client, url, &dest).await {
                    let _ = tokio::fs::remove_dir_all(&run_dir).await;
                    return Err(e);
                }
                Ok(FetchedSource {
                    path: dest,
                    run_dir: Some(run_dir),
                })
            }
        }
    }
}

/// A source available on local disk.
///
/// Downloads live in a directory owned by this run; local sources are used
/// in place and never removed.
#[derive(Debug)]
pub struct FetchedSource {
    path: PathBuf,
    run_dir: Option<PathBuf>,
}

impl FetchedSource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_download(&self) -> bool {
        self.run_dir.is_some()
    }

    /// Deletes the downloaded copy and its run directory.
    pub async fn cleanup(self) -> Result<()> {
        let Some(run_dir) = self.run_dir else {
            return Ok(());
        };
        tokio::fs::remove_dir_all(&run_dir)
            .await
            .with_context(|| format!("removing download directory {}", run_dir.display()))?;
        debug!(dir = %run_dir.display(), "Removed downloaded flight records");
        Ok(())
    }

    /// Like [`cleanup`](Self::cleanup), but only logs a failure.
    pub async fn discard(self) {
        if let Err(e) = self.cleanup().await {
            warn!(error = %e, "Failed to remove downloaded flight records");
        }
    }
}

/// Directory name unique to this process and moment, so concurrent runs
/// never share a download path.
fn run_dir_name() -> String {
    format!(
        "run-{}-{}",
        std::process::id(),
        Utc::now().format("%Y%m%dT%H%M%S%.6f")
    )
}

/// Last path segment of `url` when it is a usable file name, otherwise
/// `flights.csv`.
fn remote_file_name(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|base| base.rsplit('/').next())
        .filter(|name| !matches!(*name, "" | "." | ".."))
        .filter(|name| !name.contains([':', '\\']))
        .unwrap_or("flights.csv")
        .to_string()
}

/// Opens `path` as a byte stream, transparently decompressing gzip input.
pub fn open_stream(path: &Path) -> Result<RecordStream, PipelineError> {
    let mut reader = BufReader::new(File::open(path)?);
    let gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    debug!(path = %path.display(), gzipped, "Opening flight records");

    if gzipped {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Opens `path` and wraps it in a [`BatchReader`].
pub fn open_records(
    path: &Path,
    batch_size: usize,
) -> Result<BatchReader<RecordStream>, PipelineError> {
    BatchReader::new(open_stream(path)?, batch_size)
}
