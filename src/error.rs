use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("unsupported architecture: {0}")]
    UnsupportedArch(String),

    #[error(
        "no downloadable WidevineCdm installer exists for {os}; only Windows builds are published, \
         pass --chrome-path to point at an existing WidevineCdm directory"
    )]
    NoRemoteAssets { os: String },

    #[error("no release asset for {platform} matched pattern {pattern}")]
    AssetNotFound { platform: String, pattern: String },

    #[error("{context} returned status {status}")]
    HttpStatus {
        context: String,
        status: reqwest::StatusCode,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response from {url} did not declare a content length")]
    MissingContentLength { url: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to unpack {archive}: {reason}")]
    Unpack { archive: PathBuf, reason: String },

    #[error("no WidevineCdm directory found under {0}")]
    TargetNotFound(PathBuf),

    #[error("source directory does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("refusing to copy {src} into {dest}: one contains the other")]
    OverlappingPaths { src: PathBuf, dest: PathBuf },

    #[error(
        "Helium's WidevineCdm folder was not found in {0}. Install Helium, open it once so it \
         creates its profile, or pass --helium-path to choose the folder explicitly"
    )]
    DestinationNotFound(PathBuf),

    #[error("{0} is not installed")]
    BrowserNotFound(String),
}

impl Error {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
