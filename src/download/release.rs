use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::platform::Platform;

pub const LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/Bush2021/chrome_installer/releases/latest";

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

impl Release {
    /// Pick the installer published for `platform`.
    pub fn select_asset(&self, platform: Platform) -> Result<&Asset> {
        let pattern = platform.asset_pattern()?;
        let mut matches = self.assets.iter().filter(|a| pattern.is_match(&a.name));
        let asset = matches.next().ok_or_else(|| Error::AssetNotFound {
            platform: platform.to_string(),
            pattern: pattern.as_str().to_owned(),
        })?;
        if matches.next().is_some() {
            warn!(
                "release: several assets match {}, using {}",
                pattern.as_str(),
                asset.name
            );
        }
        Ok(asset)
    }
}

/// Fetch the release metadata served at `url`.
pub async fn fetch_latest(client: &Client, url: &str) -> Result<Release> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            context: format!("release metadata request to {url}"),
            status,
        });
    }

    let release: Release = response.json().await?;
    debug!(
        "release: {} with {} assets",
        release.tag_name,
        release.assets.len()
    );
    Ok(release)
}
