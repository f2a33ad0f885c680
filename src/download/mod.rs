//! Fetches a Chrome installer when no local WidevineCdm is available.
//!
//! The installer is kept in the temp root together with a [`CacheRecord`]; a later
//! run reuses it as long as the release tag and checksum still agree.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::checksum::sha256_file;
use crate::error::{Error, Result};
use crate::extract::{self, Unpacker};
use crate::platform::Platform;
use crate::report::Reporter;
use crate::util::{format_size, progress_percent};

pub mod cache;
pub mod release;

pub use cache::{CacheRecord, is_cache_valid};
pub use release::LATEST_RELEASE_URL;

const ARTIFACT_NAME: &str = "chrome_installer.exe";
const RECORD_NAME: &str = "cache.json";
const EXTRACT_DIR: &str = "extracted";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DownloadProgress {
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub percentage: f32,
}

impl DownloadProgress {
    fn new(downloaded_bytes: u64, total_bytes: u64) -> Self {
        Self {
            downloaded_bytes,
            total_bytes,
            percentage: progress_percent(downloaded_bytes, total_bytes),
        }
    }
}

pub struct Downloader {
    client: Client,
    platform: Platform,
    temp_root: PathBuf,
    release_url: String,
}

impl Downloader {
    pub fn new(platform: Platform, temp_root: impl Into<PathBuf>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(30 * 60))
            .user_agent(concat!("helium-widevine/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|err| {
                warn!("download: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self {
            client,
            platform,
            temp_root: temp_root.into(),
            release_url: LATEST_RELEASE_URL.to_owned(),
        }
    }

    pub fn with_release_url(mut self, url: impl Into<String>) -> Self {
        self.release_url = url.into();
        self
    }

    #[cfg(test)]
    fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.temp_root.join(ARTIFACT_NAME)
    }

    pub fn record_path(&self) -> PathBuf {
        self.temp_root.join(RECORD_NAME)
    }

    pub fn extract_dir(&self) -> PathBuf {
        self.temp_root.join(EXTRACT_DIR)
    }

    /// Make sure a current installer is on disk, unpack it and return the
    /// WidevineCdm directory found inside.
    pub async fn fetch_and_extract<F>(
        &self,
        force_download: bool,
        unpacker: &dyn Unpacker,
        reporter: &Reporter,
        progress: F,
    ) -> Result<PathBuf>
    where
        F: FnMut(DownloadProgress),
    {
        // Fails for platforms without published installers before any request is made.
        self.platform.asset_pattern()?;

        reporter.detail(format!("Fetching release metadata from {}", self.release_url));
        let release = release::fetch_latest(&self.client, &self.release_url).await?;
        let asset = release.select_asset(self.platform)?;
        reporter.detail(format!(
            "Latest release {} provides {}",
            release.tag_name, asset.name
        ));

        fs::create_dir_all(&self.temp_root)
            .map_err(|e| Error::io(format!("create {}", self.temp_root.display()), e))?;

        let artifact = self.artifact_path();
        let record_path = self.record_path();
        let cached = !force_download && is_cache_valid(&record_path, &artifact, &release.tag_name);

        if cached {
            info!("download: cache hit for {}", release.tag_name);
            reporter.status(format!("Using cached installer {}", asset.name));
        } else {
            reporter.status(format!(
                "Downloading {} ({})",
                asset.name,
                format_size(asset.size)
            ));
            download_to_path(&self.client, &asset.browser_download_url, &artifact, progress)
                .await?;
            let checksum = sha256_file(&artifact)?;
            CacheRecord::new(&release.tag_name, &asset.name, checksum).save(&record_path)?;
            info!("download: cached {} as {}", asset.name, artifact.display());
        }

        let extract_dir = self.extract_dir();
        if let Err(err) = fs::remove_dir_all(&extract_dir) {
            debug!("download: no previous extraction removed: {err}");
        }
        reporter.status("Extracting installer...");
        extract::unpack_installer(unpacker, &artifact, &extract_dir)?;

        let target = extract::find_target_dir(&extract_dir)
            .ok_or_else(|| Error::TargetNotFound(extract_dir.clone()))?;
        info!("download: found module at {}", target.display());
        Ok(target)
    }
}

/// Stream `url` into `dest`, reporting progress after every chunk.
///
/// The response must declare a non-zero content length.
pub async fn download_to_path<F>(
    client: &Client,
    url: &str,
    dest: &Path,
    mut progress: F,
) -> Result<u64>
where
    F: FnMut(DownloadProgress),
{
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            context: format!("download of {url}"),
            status,
        });
    }

    let total = match response.content_length() {
        Some(total) if total > 0 => total,
        _ => {
            return Err(Error::MissingContentLength {
                url: url.to_owned(),
            });
        }
    };

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(format!("create {}", parent.display()), e))?;
    }
    let mut file = File::create(dest)
        .await
        .map_err(|e| Error::io(format!("create {}", dest.display()), e))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io(format!("write {}", dest.display()), e))?;
        downloaded += chunk.len() as u64;
        progress(DownloadProgress::new(downloaded, total));
    }
    file.flush()
        .await
        .map_err(|e| Error::io(format!("flush {}", dest.display()), e))?;

    debug!("download: wrote {} of {} bytes to {}", downloaded, total, dest.display());
    Ok(downloaded)
}
