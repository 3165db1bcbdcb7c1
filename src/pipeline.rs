//! End-to-end collection archiving: stage, archive, clean up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::archive::{ArchiveError, ArchiveFormat, archive};
use crate::download::{CollectionStager, FetchOptions, HttpClient, StageError, StagedEntry};

/// Errors from [`archive_remote_urls`]. The staging directory is left as it was
/// when the error occurred.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Staging failed.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Packing the staging directory failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The staging directory could not be removed after archiving.
    #[error("failed to remove staging directory {path}: {source}")]
    Cleanup {
        /// The staging directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The blocking archive task panicked or was cancelled.
    #[error("archive task failed: {source}")]
    Join {
        /// The join failure.
        #[source]
        source: tokio::task::JoinError,
    },
}

/// One collection to archive.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    /// Parent directory for the staging directory and the archive.
    pub root: PathBuf,
    /// Human title; sanitized into the directory and archive name.
    pub title: String,
    /// Sources in output order.
    pub urls: Vec<String>,
    pub format: ArchiveFormat,
    /// Remove the staging directory after a successful archive.
    pub cleanup: bool,
    /// Pause between two fetches.
    pub delay: Duration,
    pub options: FetchOptions,
}

impl ArchiveRequest {
    /// A `.tar.gz` request with cleanup and no delay.
    #[must_use]
    pub fn new<I, S>(root: impl Into<PathBuf>, title: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.into(),
            title: title.into(),
            urls: urls.into_iter().map(Into::into).collect(),
            format: ArchiveFormat::default(),
            cleanup: true,
            delay: Duration::ZERO,
            options: FetchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: ArchiveFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }
}

/// What [`archive_remote_urls`] produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveOutcome {
    /// Sanitized title.
    pub safe_name: String,
    /// Where the entries were staged. Gone when `cleaned_up` is set.
    pub staging_dir: PathBuf,
    pub entries: Vec<StagedEntry>,
    /// The archive file, `None` for [`ArchiveFormat::None`].
    pub archive_path: Option<PathBuf>,
    pub cleaned_up: bool,
}

/// Fetches every URL of `request` into `root/<safe title>/NN<ext>`, packs that
/// directory into `root/<safe title><ext>` and removes it if asked.
///
/// With [`ArchiveFormat::None`] the function returns right after staging and
/// never cleans up. Archiving runs on the blocking thread pool.
///
/// # Errors
///
/// Returns the first [`PipelineError`]; nothing is retried or rolled back.
#[instrument(skip_all, fields(title = %request.title, urls = request.urls.len(), format = %request.format))]
pub async fn archive_remote_urls(
    client: &HttpClient,
    request: &ArchiveRequest,
) -> Result<ArchiveOutcome, PipelineError> {
    let staged = CollectionStager::new(client)
        .with_delay(request.delay)
        .with_options(request.options.clone())
        .stage(&request.root, &request.title, &request.urls)
        .await?;

    let Some(archive_path) = request.format.archive_path(&request.root, &staged.safe_name) else {
        info!(dir = %staged.dir.display(), "no archive format; staging directory kept");
        return Ok(ArchiveOutcome {
            safe_name: staged.safe_name,
            staging_dir: staged.dir,
            entries: staged.entries,
            archive_path: None,
            cleaned_up: false,
        });
    };

    let (dir, target, format) = (staged.dir.clone(), archive_path.clone(), request.format);
    tokio::task::spawn_blocking(move || archive(&dir, &target, format))
        .await
        .map_err(|source| PipelineError::Join { source })??;

    let cleaned_up = request.cleanup && remove_staging_dir(&staged.dir, &request.root).await?;

    info!(
        archive = %archive_path.display(),
        entries = staged.entries.len(),
        cleaned_up,
        "collection archived"
    );

    Ok(ArchiveOutcome {
        safe_name: staged.safe_name,
        staging_dir: staged.dir,
        entries: staged.entries,
        archive_path: Some(archive_path),
        cleaned_up,
    })
}

/// Removes the staging directory unless it is the root itself (empty safe name).
async fn remove_staging_dir(dir: &Path, root: &Path) -> Result<bool, PipelineError> {
    if dir == root {
        warn!(dir = %dir.display(), "staging directory is the output root; not removing it");
        return Ok(false);
    }
    tokio::fs::remove_dir_all(dir)
        .await
        .map_err(|source| PipelineError::Cleanup {
            path: dir.to_path_buf(),
            source,
        })?;
    Ok(true)
}
