//! File download operations with atomic writes and streaming
//!
//! Files are streamed into `<destination>.tmp` and renamed into place only
//! once the body is complete, so an interrupted download never leaves a file
//! that later idempotence checks would mistake for a finished one.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::{files, limits};
use crate::errors::{DownloadError, DownloadResult};

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Downloads a file to the specified path, replacing any existing file
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request fails after retries, the
    /// server answers with a non-success status, or file I/O fails.
    pub async fn download_file(&self, url: &Url, destination: &Path) -> DownloadResult<u64> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = temp_path_for(destination);

        let mut retries = 0;
        loop {
            match self.download_file_attempt(url, &temp_path).await {
                Ok(bytes) => {
                    tokio::fs::rename(&temp_path, destination)
                        .await
                        .map_err(|_e| DownloadError::AtomicOperationFailed {
                            temp_path: temp_path.clone(),
                            final_path: destination.to_path_buf(),
                        })?;
                    tracing::info!(
                        "Downloaded {} ({} bytes) to {}",
                        url,
                        bytes,
                        destination.display()
                    );
                    return Ok(bytes);
                }
                // Missing or forbidden files will not appear on retry
                Err(e @ (DownloadError::NotFound { .. } | DownloadError::Forbidden { .. })) => {
                    Self::discard_temp(&temp_path).await;
                    return Err(e);
                }
                Err(e) if retries < limits::MAX_RETRIES => {
                    retries += 1;
                    let delay = std::time::Duration::from_millis(
                        limits::RETRY_BASE_DELAY_MS * 2_u64.pow(retries),
                    );
                    tracing::warn!(
                        "Download failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        limits::MAX_RETRIES,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    Self::discard_temp(&temp_path).await;
                    tracing::error!(
                        "Download failed after {} retries: {}",
                        limits::MAX_RETRIES,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Streams the body into the temporary path and returns the byte count
    async fn download_file_attempt(&self, url: &Url, temp_path: &Path) -> DownloadResult<u64> {
        let response = self.http_handler.get_response(url).await?;
        let mut response = HttpHandler::ensure_success(response, url)?;

        let mut file = File::create(temp_path).await?;
        let mut written = 0_u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    async fn discard_temp(temp_path: &Path) {
        if temp_path.exists() {
            let _ = tokio::fs::remove_file(temp_path).await;
        }
    }
}

/// Temporary sibling used while a download is in flight
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_file_path_generation() {
        let temp_path = temp_path_for(Path::new("/tmp/rutland-latest.osm.pbf"));
        assert_eq!(temp_path, PathBuf::from("/tmp/rutland-latest.osm.pbf.tmp"));
    }

    #[test]
    fn test_temp_file_path_no_extension() {
        let temp_path = temp_path_for(Path::new("/tmp/testfile"));
        assert_eq!(temp_path, PathBuf::from("/tmp/testfile.tmp"));
    }
}
