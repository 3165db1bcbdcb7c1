//! Collection staging: fetch every URL of a collection, in order, into a
//! numbered file under `root/<sanitized title>`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::client::{FetchOptions, HttpClient, Sink};
use super::error::StageError;
use super::filename::{extension_from_url, sanitize_title, staged_file_name};

/// One fetched resource inside a staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedEntry {
    /// 1-based position in the input list; also the numeric part of the file name.
    pub index: usize,
    /// Source URL.
    pub url: String,
    /// Written file.
    pub path: PathBuf,
    /// Body bytes written.
    pub bytes: u64,
}

/// Result of staging a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedCollection {
    /// Sanitized title, used as the directory name.
    pub safe_name: String,
    /// The staging directory, `root/<safe_name>`.
    pub dir: PathBuf,
    /// Entries in input order, indices `1..=n`.
    pub entries: Vec<StagedEntry>,
}

/// Stages collections through a shared [`HttpClient`].
///
/// Fetches are strictly sequential. The optional delay is awaited between two
/// fetches and never after the last one, so a collection of `n` URLs spends
/// `(n - 1) * delay` waiting.
#[derive(Debug, Clone)]
pub struct CollectionStager<'a> {
    client: &'a HttpClient,
    delay: Duration,
    options: FetchOptions,
}

impl<'a> CollectionStager<'a> {
    /// Creates a stager with no delay and default fetch options.
    #[must_use]
    pub fn new(client: &'a HttpClient) -> Self {
        Self {
            client,
            delay: Duration::ZERO,
            options: FetchOptions::default(),
        }
    }

    /// Sets the pause between two consecutive fetches.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the options passed to every fetch.
    #[must_use]
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetches `urls` into `root/<sanitized title>/NN<ext>`.
    ///
    /// The directory (and missing parents) is created if needed. Files are
    /// named by 1-based position, zero-padded to two digits, followed by the
    /// extension of the URL's last path segment.
    ///
    /// # Errors
    ///
    /// - [`StageError::DirectoryCreate`] if the staging directory cannot be created
    /// - [`StageError::Fetch`] on the first failing fetch; earlier entries stay on disk
    /// - [`StageError::Write`] if a fetched file is missing afterwards
    #[instrument(skip(self, urls), fields(root = %root.display(), urls = urls.len()))]
    pub async fn stage<S: AsRef<str>>(
        &self,
        root: &Path,
        title: &str,
        urls: &[S],
    ) -> Result<StagedCollection, StageError> {
        let safe_name = sanitize_title(title);
        if safe_name.is_empty() {
            warn!(title, "title sanitizes to an empty name; staging directly into root");
        }
        let dir = root.join(&safe_name);
        ensure_directory(&dir).await?;

        let mut entries = Vec::with_capacity(urls.len());
        let last_index = urls.len().saturating_sub(1);

        for (idx, url) in urls.iter().enumerate() {
            let url = url.as_ref();
            let extension = extension_from_url(url);
            let path = dir.join(staged_file_name(idx, &extension));
            debug!(index = idx + 1, url, path = %path.display(), "staging entry");

            let bytes = self
                .client
                .fetch(url, Sink::Path(&path), &self.options)
                .await
                .map_err(|e| StageError::fetch(idx, url, e))?;

            if !path_exists(&path).await {
                return Err(StageError::write(path));
            }

            entries.push(StagedEntry {
                index: idx + 1,
                url: url.to_string(),
                path,
                bytes,
            });

            if idx < last_index && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            dir = %dir.display(),
            entries = entries.len(),
            "collection staged"
        );

        Ok(StagedCollection {
            safe_name,
            dir,
            entries,
        })
    }
}

async fn ensure_directory(dir: &Path) -> Result<(), StageError> {
    if !path_exists(dir).await {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StageError::directory_create(dir, Some(e)))?;
        debug!(dir = %dir.display(), "created staging directory");
    }

    let is_dir = tokio::fs::metadata(dir)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(StageError::directory_create(dir, None));
    }
    Ok(())
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
