//! Streaming HTTP downloads with progress reporting

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use log::{info, warn};
use tokio::io::AsyncWriteExt;

use crate::error::{PackageError, PackageResult};

/// Progress callback: `(bytes_transferred, total_bytes)`; total is `None` when unknown
pub type ProgressFn<'a> = dyn FnMut(u64, Option<u64>) + 'a;

/// Fetches a remote resource into a local file
#[allow(async_fn_in_trait)]
pub trait Downloader {
    /// Stream `url` into `dest`, returning the number of bytes written
    async fn fetch(&self, url: &str, dest: &Path, progress: &mut ProgressFn<'_>)
    -> PackageResult<u64>;
}

/// [`Downloader`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(user_agent: &str, connect_timeout: Option<Duration>) -> PackageResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PackageError::network("<client>", e))?;
        Ok(Self { client })
    }

    async fn stream_to(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> PackageResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PackageError::network(url, e))?;

        if !response.status().is_success() {
            return Err(PackageError::network(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let total = response.content_length();
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| PackageError::io(format!("Failed to create {}", dest.display()), e))?;
        let write_err =
            |e| PackageError::io(format!("Failed to write {}", dest.display()), e);

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        progress(0, total);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PackageError::network(url, e))?;
            file.write_all(&chunk).await.map_err(write_err)?;
            downloaded += chunk.len() as u64;
            progress(downloaded, total);
        }

        file.flush().await.map_err(write_err)?;
        Ok(downloaded)
    }
}

impl Downloader for HttpDownloader {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> PackageResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PackageError::io(format!("Failed to create {}", parent.display()), e)
            })?;
        }

        info!("Downloading {url} -> {}", dest.display());
        match self.stream_to(url, dest, progress).await {
            Ok(bytes) => {
                info!("Downloaded {bytes} bytes from {url}");
                Ok(bytes)
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(dest).await
                    && rm.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to remove partial download {}: {rm}", dest.display());
                }
                Err(e)
            }
        }
    }
}
