//! # Track downloader
//!
//! Turns a [`TrackReference`] into a file on disk. The track link answers with a
//! redirect to the real file; the downloader reads the `Location`, streams the
//! target and writes it in `chunk_size` slices, emitting a [`ProgressEvent`]
//! for each slice.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::StreamExt;
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::{
    client::SiteClient,
    config::{FileMode, SiteConfig},
    crawler::TrackReference,
    error::DownloadError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The stream is open. `total` is the announced body size, if any.
    Started {
        file_name: String,
        total: Option<u64>,
    },
    /// One slice was written.
    Advanced { bytes: u64 },
    Finished { written: u64 },
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    /// Bytes written by this download, not the final file size
    pub bytes_written: u64,
}

pub struct Downloader {
    client: Arc<dyn SiteClient>,
    chunk_size: usize,
    file_mode: FileMode,
    on_progress: Option<ProgressCallback>,
}

impl Downloader {
    pub fn new(client: Arc<dyn SiteClient>, config: &SiteConfig) -> Self {
        Self {
            client,
            chunk_size: config.chunk_size.max(1),
            file_mode: config.file_mode,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.on_progress {
            callback(event);
        }
    }

    /// Download one track into `destination_dir`.
    ///
    /// On failure the partially written file is left in place.
    #[instrument(skip(self, track, token), fields(file = %track.file_name))]
    pub async fn download(
        &self,
        track: &TrackReference,
        destination_dir: &Path,
        token: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        if token.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let location = self
            .client
            .probe_redirect(&track.source_url)
            .await?
            .ok_or_else(|| DownloadError::missing_redirect(track.source_url.as_str()))?;
        let target = track
            .source_url
            .join(&location)
            .map_err(|e| DownloadError::invalid_redirect(&location, e.to_string()))?;
        debug!(target = %target, "Track redirect resolved");

        if token.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let mut asset = self.client.open_stream(&target).await?;

        fs::create_dir_all(destination_dir).await?;
        let path = destination_dir.join(&track.file_name);
        let mut options = OpenOptions::new();
        match self.file_mode {
            FileMode::Append => options.create(true).append(true),
            FileMode::Truncate => options.create(true).write(true).truncate(true),
        };
        let mut file = options.open(&path).await?;

        self.emit(ProgressEvent::Started {
            file_name: track.file_name.clone(),
            total: asset.content_length,
        });

        let mut written: u64 = 0;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    file.flush().await?;
                    return Err(DownloadError::Cancelled);
                }
                chunk = asset.body.next() => chunk,
            };

            let Some(chunk) = chunk else { break };
            let chunk = chunk?;

            for slice in chunk.chunks(self.chunk_size) {
                file.write_all(slice).await?;
                written += slice.len() as u64;
                self.emit(ProgressEvent::Advanced {
                    bytes: slice.len() as u64,
                });
            }
        }

        file.flush().await?;
        self.emit(ProgressEvent::Finished { written });

        info!(path = %path.display(), bytes = written, "Track downloaded");
        Ok(DownloadOutcome {
            path,
            bytes_written: written,
        })
    }
}
