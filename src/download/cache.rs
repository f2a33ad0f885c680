use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::checksum::sha256_file;
use crate::error::{Error, Result};

/// What was downloaded last time, persisted beside the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub tag: String,
    pub asset_name: String,
    pub downloaded_at: DateTime<Utc>,
    #[serde(default)]
    pub checksum: Option<String>,
}

impl CacheRecord {
    pub fn new(tag: impl Into<String>, asset_name: impl Into<String>, checksum: String) -> Self {
        Self {
            tag: tag.into(),
            asset_name: asset_name.into(),
            downloaded_at: Utc::now(),
            checksum: Some(checksum),
        }
    }

    /// Read a record; a missing or unreadable file is treated as no record.
    pub fn load(path: &Path) -> Option<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!("cache: no record at {}: {err}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(err) => {
                info!("cache: ignoring corrupted record {}: {err}", path.display());
                None
            }
        }
    }

    /// Overwrite the record file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("create {}", parent.display()), e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| Error::io(format!("write {}", path.display()), e))
    }
}

/// Whether the artifact on disk can be reused for release `tag`.
///
/// Requires the artifact and record to exist, the tags to agree and the recorded
/// checksum to match the artifact's current contents.
pub fn is_cache_valid(record_path: &Path, artifact_path: &Path, tag: &str) -> bool {
    if !artifact_path.is_file() {
        debug!("cache: no artifact at {}", artifact_path.display());
        return false;
    }
    let Some(record) = CacheRecord::load(record_path) else {
        return false;
    };
    if record.tag != tag {
        debug!("cache: record is for {}, latest is {}", record.tag, tag);
        return false;
    }
    let Some(expected) = record.checksum.as_deref() else {
        debug!("cache: record has no checksum");
        return false;
    };
    match sha256_file(artifact_path) {
        Ok(actual) if actual == expected => true,
        Ok(actual) => {
            debug!("cache: checksum mismatch, expected {expected}, got {actual}");
            false
        }
        Err(err) => {
            debug!("cache: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const TAG: &str = "143.0.7499.170";

    fn populated(dir: &Path) -> (PathBuf, PathBuf) {
        let artifact = dir.join("chrome_installer.exe");
        let record = dir.join("cache.json");
        fs::write(&artifact, b"installer bytes").unwrap();
        let checksum = sha256_file(&artifact).unwrap();
        CacheRecord::new(TAG, "x64_installer.exe", checksum)
            .save(&record)
            .unwrap();
        (record, artifact)
    }

    #[test]
    fn valid_when_everything_matches() {
        let tmp = TempDir::new().unwrap();
        let (record, artifact) = populated(tmp.path());
        assert!(is_cache_valid(&record, &artifact, TAG));
    }

    #[test]
    fn invalid_without_artifact() {
        let tmp = TempDir::new().unwrap();
        let (record, artifact) = populated(tmp.path());
        fs::remove_file(&artifact).unwrap();
        assert!(!is_cache_valid(&record, &artifact, TAG));
    }

    #[test]
    fn invalid_without_record() {
        let tmp = TempDir::new().unwrap();
        let (record, artifact) = populated(tmp.path());
        fs::remove_file(&record).unwrap();
        assert!(!is_cache_valid(&record, &artifact, TAG));
    }

    #[test]
    fn invalid_for_other_tag() {
        let tmp = TempDir::new().unwrap();
        let (record, artifact) = populated(tmp.path());
        assert!(!is_cache_valid(&record, &artifact, "144.0.0.1"));
    }

    #[test]
    fn invalid_without_checksum() {
        let tmp = TempDir::new().unwrap();
        let (record, artifact) = populated(tmp.path());
        let mut stored = CacheRecord::load(&record).unwrap();
        stored.checksum = None;
        stored.save(&record).unwrap();

        assert!(!is_cache_valid(&record, &artifact, TAG));
    }

    #[test]
    fn invalid_when_artifact_changed() {
        let tmp = TempDir::new().unwrap();
        let (record, artifact) = populated(tmp.path());
        fs::write(&artifact, b"truncated").unwrap();
        assert!(!is_cache_valid(&record, &artifact, TAG));
    }

    #[test]
    fn corrupted_record_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let (record, artifact) = populated(tmp.path());
        fs::write(&record, "not valid json {{{{").unwrap();

        assert!(CacheRecord::load(&record).is_none());
        assert!(!is_cache_valid(&record, &artifact, TAG));
    }

    #[test]
    fn record_without_checksum_field_parses() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        fs::write(
            &path,
            r#"{"tag":"1.2.3.4","asset_name":"a.exe","downloaded_at":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let record = CacheRecord::load(&path).unwrap();
        assert_eq!(record.tag, "1.2.3.4");
        assert!(record.checksum.is_none());
    }
}
