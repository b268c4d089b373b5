//! Image downloads
//!
//! Saves the selected images of a page as `{prefix}-{n}.{ext}` files. A failed
//! image is logged and recorded in the report; the rest of the batch still runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::config::AppConfig;
use crate::error::{ParserError, Result};
use crate::extractors::{image_filename, ImageRef};

/// How a batch of images is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// One image at a time with a pause between items.
    Sequential { delay: Duration },
    /// Several images in flight at once, no pause.
    Batch { concurrency: usize },
}

/// An image that could not be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFailure {
    pub source_url: String,
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<ImageFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestOutcome {
    /// No image was selected; nothing was requested.
    NothingToDo,
    Finished(HarvestReport),
}

pub struct ImageHarvester {
    client: reqwest::Client,
    out_dir: PathBuf,
    mode: DownloadMode,
}

impl ImageHarvester {
    pub fn new(client: reqwest::Client, out_dir: impl Into<PathBuf>, mode: DownloadMode) -> Self {
        Self {
            client,
            out_dir: out_dir.into(),
            mode,
        }
    }

    /// Sequential harvester built from the configured timeout, agent and delay.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self::new(
            client,
            &config.output_dir,
            DownloadMode::Sequential {
                delay: config.download_delay,
            },
        ))
    }

    pub fn with_mode(mut self, mode: DownloadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Download every selected image.
    pub async fn harvest(&self, images: &[ImageRef], prefix: &str) -> Result<HarvestOutcome> {
        let selected: Vec<&ImageRef> = images.iter().filter(|i| i.selected).collect();
        if selected.is_empty() {
            tracing::info!("no images selected, nothing to download");
            return Ok(HarvestOutcome::NothingToDo);
        }

        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|e| ParserError::io(&self.out_dir, e))?;

        let results: Vec<(&ImageRef, String, Result<PathBuf>)> = match self.mode {
            DownloadMode::Sequential { delay } => {
                let mut results = Vec::with_capacity(selected.len());
                for (i, image) in selected.iter().enumerate() {
                    if i > 0 && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let filename = image_filename(prefix, image);
                    let outcome = self.save_one(image, &filename).await;
                    results.push((*image, filename, outcome));
                }
                results
            }
            DownloadMode::Batch { concurrency } => {
                stream::iter(selected.iter().copied())
                    .map(|image| async move {
                        let filename = image_filename(prefix, image);
                        let outcome = self.save_one(image, &filename).await;
                        (image, filename, outcome)
                    })
                    .buffered(concurrency.max(1))
                    .collect()
                    .await
            }
        };

        let mut report = HarvestReport::default();
        for (image, filename, outcome) in results {
            match outcome {
                Ok(path) => report.saved.push(path),
                Err(e) => {
                    tracing::warn!(url = %image.source_url, filename = %filename, error = %e, "image download failed");
                    report.failed.push(ImageFailure {
                        source_url: image.source_url.clone(),
                        filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            saved = report.saved.len(),
            failed = report.failed.len(),
            "image harvest finished"
        );
        Ok(HarvestOutcome::Finished(report))
    }

    async fn save_one(&self, image: &ImageRef, filename: &str) -> Result<PathBuf> {
        let response = self.client.get(&image.source_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ParserError::UnexpectedStatus {
                status: status.as_u16(),
                url: image.source_url.clone(),
            });
        }
        let bytes = response.bytes().await?;

        let path = self.out_dir.join(filename);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ParserError::io(&path, e))?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "image saved");
        Ok(path)
    }
}
