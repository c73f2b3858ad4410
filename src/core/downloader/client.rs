use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::progress::{DownloadProgress, DownloadTask, ProgressThrottle};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::http::build_download_client;
use crate::core::state::InstallerSettings;

/// Streaming archive downloader with bounded redirect following.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    /// Per-attempt idle timeout: no response headers or no chunk for this long.
    idle_timeout: Duration,
    max_redirects: usize,
    progress_interval: Duration,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            idle_timeout: Duration::from_secs(30),
            max_redirects: 5,
            progress_interval: Duration::from_millis(200),
        }
    }

    pub fn from_settings(settings: &InstallerSettings) -> InstallerResult<Self> {
        let client = build_download_client(settings.download_idle_timeout())?;
        Ok(Self::new(client)
            .with_idle_timeout(settings.download_idle_timeout())
            .with_max_redirects(settings.max_redirects)
            .with_progress_interval(settings.progress_interval()))
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, n: usize) -> Self {
        self.max_redirects = n;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Download `url` into `dest_dir/file_name`, returning the local path.
    ///
    /// `on_progress` receives throttled updates plus one final update whose
    /// `bytes_downloaded` equals the size of the written file. Any failure
    /// after the destination directory exists removes the partial file.
    pub async fn download<F>(
        &self,
        url: &str,
        dest_dir: &Path,
        file_name: &str,
        mut on_progress: F,
    ) -> InstallerResult<PathBuf>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|source| InstallerError::DirectoryCreate {
                path: dest_dir.to_path_buf(),
                source,
            })?;

        let mut task = DownloadTask::new(url, dest_dir, file_name);
        let dest = task.dest_path();
        info!("Downloading {} -> {:?}", url, dest);

        let result = self.transfer(&mut task, &mut on_progress).await;
        if let Err(e) = &result {
            warn!("Download of {} failed: {}", url, e);
            remove_partial(&dest).await;
        }
        result
    }

    async fn transfer<F>(
        &self,
        task: &mut DownloadTask,
        on_progress: &mut F,
    ) -> InstallerResult<PathBuf>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        let response = self.open(&task.url).await?;
        let source_url = response.url().to_string();
        task.total_bytes = response.content_length().unwrap_or(0);
        debug!(
            "Streaming {} ({} bytes declared)",
            source_url, task.total_bytes
        );

        let dest = task.dest_path();
        let transport_err = |detail: String| InstallerError::DownloadTransport {
            url: source_url.clone(),
            detail,
        };

        // Write inside a block so the handle is dropped before returning.
        {
            let mut file = tokio::fs::File::create(&dest)
                .await
                .map_err(|source| InstallerError::Io {
                    path: dest.clone(),
                    source,
                })?;

            let mut throttle = ProgressThrottle::new(self.progress_interval);
            let mut stream = response.bytes_stream();

            loop {
                let next = tokio::time::timeout(self.idle_timeout, stream.next())
                    .await
                    .map_err(|_| {
                        transport_err(format!("no data for {}s", self.idle_timeout.as_secs()))
                    })?;

                let chunk = match next {
                    Some(chunk) => chunk.map_err(|e| transport_err(e.to_string()))?,
                    None => break,
                };

                file.write_all(&chunk)
                    .await
                    .map_err(|source| InstallerError::Io {
                        path: dest.clone(),
                        source,
                    })?;

                task.record_chunk(chunk.len());
                if throttle.ready() {
                    on_progress(task.progress());
                }
            }

            file.flush().await.map_err(|source| InstallerError::Io {
                path: dest.clone(),
                source,
            })?;
        }

        if task.total_bytes > 0 && task.bytes_transferred < task.total_bytes {
            return Err(transport_err(format!(
                "connection closed after {} of {} bytes",
                task.bytes_transferred, task.total_bytes
            )));
        }

        on_progress(task.progress());
        info!(
            "Download complete: {:?} ({} bytes)",
            dest, task.bytes_transferred
        );
        Ok(dest)
    }

    /// Issue the GET, following redirects up to `max_redirects` hops.
    async fn open(&self, url: &str) -> InstallerResult<Response> {
        let mut current = url.to_string();
        let mut hops = 0usize;

        loop {
            let response = tokio::time::timeout(self.idle_timeout, self.client.get(&current).send())
                .await
                .map_err(|_| InstallerError::DownloadTransport {
                    url: current.clone(),
                    detail: format!("no response within {}s", self.idle_timeout.as_secs()),
                })?
                .map_err(|e| InstallerError::DownloadTransport {
                    url: current.clone(),
                    detail: e.to_string(),
                })?;

            let status = response.status();
            if is_followed_redirect(status) {
                if hops >= self.max_redirects {
                    return Err(InstallerError::TooManyRedirects {
                        url: url.to_string(),
                        limit: self.max_redirects,
                    });
                }
                let next = redirect_target(&response).ok_or_else(|| {
                    InstallerError::MissingRedirectLocation {
                        url: current.clone(),
                    }
                })?;
                debug!("HTTP {} redirect: {} -> {}", status.as_u16(), current, next);
                current = next;
                hops += 1;
                continue;
            }

            if !status.is_success() {
                return Err(InstallerError::DownloadHttp {
                    url: current,
                    status: status.as_u16(),
                });
            }

            return Ok(response);
        }
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Absolute target of a redirect; relative `Location` values are resolved
/// against the responding URL.
fn redirect_target(response: &Response) -> Option<String> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    response
        .url()
        .join(location)
        .ok()
        .map(|url| url.to_string())
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial download {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial download {:?}: {}", path, e),
    }
}
