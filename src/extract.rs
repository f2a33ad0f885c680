use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Directory names the module may carry inside an installer.
pub const TARGET_NAMES: [&str; 2] = ["WidevineCdm", "widevinecdm"];

/// Unpacks an archive into a directory.
pub trait Unpacker {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Shells out to a 7-Zip compatible binary, which also reads self-extracting installers.
#[derive(Clone, Debug)]
pub struct SevenZip {
    program: PathBuf,
}

impl SevenZip {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SevenZip {
    fn default() -> Self {
        Self::new("7z")
    }
}

impl Unpacker for SevenZip {
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("x")
            .arg("-y")
            .arg(format!("-o{}", dest.display()))
            .arg(archive);
        info!(
            "extract: running {} on {} into {}",
            self.program.display(),
            archive.display(),
            dest.display()
        );

        let output = cmd.output().map_err(|e| Error::Unpack {
            archive: archive.to_path_buf(),
            reason: format!("failed to run {}: {e}", self.program.display()),
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(Error::Unpack {
                archive: archive.to_path_buf(),
                reason: if stderr.trim().is_empty() {
                    stdout.trim().to_owned()
                } else {
                    stderr.trim().to_owned()
                },
            });
        }
        Ok(())
    }
}

/// Unpack `archive` into `dest`, then unpack any `.7z` payloads it contained next to
/// themselves. Chrome installers wrap the browser files in an inner `chrome.7z`.
pub fn unpack_installer(unpacker: &dyn Unpacker, archive: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|e| Error::io(format!("create {}", dest.display()), e))?;
    unpacker.unpack(archive, dest)?;

    let nested: Vec<PathBuf> = WalkDir::new(dest)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("7z"))
        })
        .collect();

    for inner in nested {
        let inner_dest = inner.with_extension("");
        debug!("extract: unpacking nested payload {}", inner.display());
        fs::create_dir_all(&inner_dest)
            .map_err(|e| Error::io(format!("create {}", inner_dest.display()), e))?;
        unpacker.unpack(&inner, &inner_dest)?;
    }
    Ok(())
}

/// Depth-first search for the first directory carrying one of [`TARGET_NAMES`].
pub fn find_target_dir(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .find(|entry| {
            entry.file_type().is_dir()
                && TARGET_NAMES
                    .iter()
                    .any(|name| entry.file_name().to_string_lossy() == *name)
        })
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Writes a fixed layout instead of reading the archive.
    struct FakeUnpacker {
        calls: RefCell<Vec<PathBuf>>,
    }

    impl FakeUnpacker {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Unpacker for FakeUnpacker {
        fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
            self.calls.borrow_mut().push(archive.to_path_buf());
            if archive.extension().is_some_and(|ext| ext == "7z") {
                let cdm = dest.join("Chrome-bin").join("143.0.7499.170").join("WidevineCdm");
                fs::create_dir_all(&cdm).unwrap();
                fs::write(cdm.join("manifest.json"), "{}").unwrap();
            } else {
                fs::write(dest.join("chrome.7z"), "payload").unwrap();
            }
            Ok(())
        }
    }

    #[test]
    fn unpacks_nested_payload() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("extracted");
        let unpacker = FakeUnpacker::new();

        unpack_installer(&unpacker, &tmp.path().join("installer.exe"), &out).unwrap();

        assert_eq!(unpacker.calls.borrow().len(), 2);
        assert_eq!(
            find_target_dir(&out).unwrap(),
            out.join("chrome")
                .join("Chrome-bin")
                .join("143.0.7499.170")
                .join("WidevineCdm")
        );
    }

    #[test]
    fn finds_lowercase_target_name() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a").join("b").join("widevinecdm")).unwrap();

        assert_eq!(
            find_target_dir(tmp.path()).unwrap(),
            tmp.path().join("a").join("b").join("widevinecdm")
        );
    }

    #[test]
    fn ignores_files_with_target_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("WidevineCdm"), "not a directory").unwrap();

        assert!(find_target_dir(tmp.path()).is_none());
    }

    #[test]
    fn missing_unpacker_binary_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = SevenZip::new(tmp.path().join("no-such-7z"))
            .unpack(&tmp.path().join("a.exe"), tmp.path())
            .unwrap_err();

        assert!(matches!(err, Error::Unpack { .. }));
    }
}
