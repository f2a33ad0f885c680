use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::copy::copy_tree;
use crate::download::Downloader;
use crate::env;
use crate::error::{Error, Result};
use crate::extract::Unpacker;
use crate::platform::Platform;
use crate::probe::{self, BrowserLocator, Role};
use crate::report::Reporter;

/// What the user asked for on the command line.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub check: bool,
    pub dry_run: bool,
    pub force_download: bool,
    pub chrome_path: Option<PathBuf>,
    pub helium_path: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Explicit,
    Installed,
    Downloaded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Checked,
    DryRun,
    Copied { files: u64 },
}

/// One run: find the module, find Helium's slot, then copy or report.
pub struct Installer<'a> {
    platform: Platform,
    reporter: Reporter,
    locator: &'a dyn BrowserLocator,
    unpacker: &'a dyn Unpacker,
    downloader: Downloader,
}

impl<'a> Installer<'a> {
    pub fn new(
        platform: Platform,
        reporter: Reporter,
        locator: &'a dyn BrowserLocator,
        unpacker: &'a dyn Unpacker,
    ) -> Self {
        let mut downloader = Downloader::new(platform, env::temp_root());
        if let Some(url) = env::release_url_override() {
            debug!("run: release metadata from {url}");
            downloader = downloader.with_release_url(url);
        }
        Self {
            platform,
            reporter,
            locator,
            unpacker,
            downloader,
        }
    }

    pub async fn run(&self, options: &RunOptions) -> Result<Outcome> {
        info!("run: platform {} options {:?}", self.platform, options);

        let (source, kind) = self.resolve_source(options).await?;
        self.reporter
            .status(format!("WidevineCdm source: {}", source.display()));
        if let Some(version) = probe::cdm_version(&source) {
            self.reporter.status(format!("Widevine version: {version}"));
        }

        let destination = self.resolve_destination(options)?;
        self.reporter
            .status(format!("Helium destination: {}", destination.display()));

        if options.check {
            self.reporter.status("Check complete, nothing was copied.");
            return Ok(Outcome::Checked);
        }

        if options.dry_run {
            self.reporter.status(format!(
                "Dry run: would replace {} with {}",
                destination.display(),
                source.display()
            ));
            return Ok(Outcome::DryRun);
        }

        let files = copy_tree(&source, &destination)?;
        self.reporter.status(format!(
            "Copied {files} files into {}. Restart Helium to enable DRM playback.",
            destination.display()
        ));

        if kind == SourceKind::Downloaded {
            self.cleanup_extraction();
        }
        Ok(Outcome::Copied { files })
    }

    async fn resolve_source(&self, options: &RunOptions) -> Result<(PathBuf, SourceKind)> {
        if let Some(path) = &options.chrome_path {
            if !path.is_dir() {
                return Err(Error::SourceMissing(path.clone()));
            }
            self.reporter.detail("Using WidevineCdm path given on the command line");
            return Ok((path.clone(), SourceKind::Explicit));
        }

        if options.force_download {
            self.reporter.detail("Skipping local Chrome lookup (--force-download)");
        } else if let Some(path) = probe::locate_module(Role::Source, self.platform, self.locator)
        {
            self.reporter.detail("Found WidevineCdm in the installed Chrome");
            return Ok((path, SourceKind::Installed));
        } else {
            self.reporter
                .status("Chrome's WidevineCdm was not found locally, fetching an installer");
        }

        let bar = self.reporter.download_bar();
        let tick = bar.clone();
        let fetched = self
            .downloader
            .fetch_and_extract(options.force_download, self.unpacker, &self.reporter, |p| {
                tick.set_length(p.total_bytes);
                tick.set_position(p.downloaded_bytes);
                tick.set_message(format!("({:.0}%)", p.percentage));
            })
            .await;
        bar.finish_and_clear();

        Ok((fetched?, SourceKind::Downloaded))
    }

    fn resolve_destination(&self, options: &RunOptions) -> Result<PathBuf> {
        if let Some(path) = &options.helium_path {
            self.reporter.detail("Using Helium path given on the command line");
            return Ok(path.clone());
        }
        probe::locate_module(Role::Destination, self.platform, self.locator)
            .ok_or_else(|| Error::DestinationNotFound(env::helium_widevine_dir(self.platform.os)))
    }

    fn cleanup_extraction(&self) {
        let dir = self.downloader.extract_dir();
        if let Err(err) = remove_quietly(&dir) {
            debug!("run: leaving {} behind: {err}", dir.display());
        }
    }
}

fn remove_quietly(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SevenZip;
    use tempfile::TempDir;

    struct NoBrowser;

    impl BrowserLocator for NoBrowser {
        fn find_installed_browser(&self, name: &str) -> Result<PathBuf> {
            Err(Error::BrowserNotFound(name.to_owned()))
        }
    }

    struct InstalledChrome(PathBuf);

    impl BrowserLocator for InstalledChrome {
        fn find_installed_browser(&self, _name: &str) -> Result<PathBuf> {
            Ok(self.0.clone())
        }
    }

    fn linux() -> Platform {
        Platform::from_parts("linux", "x86_64").unwrap()
    }

    fn source_module(root: &Path) -> PathBuf {
        let src = root.join("chrome").join("WidevineCdm");
        fs::create_dir_all(src.join("_platform_specific")).unwrap();
        fs::write(src.join("manifest.json"), r#"{"version":"4.10.2891.0"}"#).unwrap();
        fs::write(src.join("_platform_specific").join("cdm.so"), "cdm").unwrap();
        src
    }

    #[tokio::test]
    async fn copies_from_installed_chrome() {
        let tmp = TempDir::new().unwrap();
        source_module(tmp.path());
        let dest = tmp.path().join("helium").join("4.10.2891.0");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale"), "old").unwrap();

        let locator = InstalledChrome(tmp.path().join("chrome").join("chrome"));
        let unpacker = SevenZip::default();
        let installer = Installer::new(linux(), Reporter::new(false), &locator, &unpacker);
        let options = RunOptions {
            helium_path: Some(dest.clone()),
            ..Default::default()
        };

        let outcome = installer.run(&options).await.unwrap();

        assert_eq!(outcome, Outcome::Copied { files: 2 });
        assert!(!dest.join("stale").exists());
        assert!(dest.join("_platform_specific").join("cdm.so").is_file());
    }

    #[tokio::test]
    async fn check_and_dry_run_leave_destination_alone() {
        let tmp = TempDir::new().unwrap();
        let src = source_module(tmp.path());
        let dest = tmp.path().join("dest");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale"), "old").unwrap();

        let unpacker = SevenZip::default();
        let installer = Installer::new(linux(), Reporter::new(true), &NoBrowser, &unpacker);

        for (check, dry_run, expected) in [
            (true, false, Outcome::Checked),
            (false, true, Outcome::DryRun),
        ] {
            let options = RunOptions {
                check,
                dry_run,
                chrome_path: Some(src.clone()),
                helium_path: Some(dest.clone()),
                ..Default::default()
            };
            assert_eq!(installer.run(&options).await.unwrap(), expected);
            assert!(dest.join("stale").is_file());
        }
    }

    #[tokio::test]
    async fn explicit_source_must_exist() {
        let tmp = TempDir::new().unwrap();
        let unpacker = SevenZip::default();
        let installer = Installer::new(linux(), Reporter::new(false), &NoBrowser, &unpacker);
        let options = RunOptions {
            chrome_path: Some(tmp.path().join("missing")),
            helium_path: Some(tmp.path().join("dest")),
            ..Default::default()
        };

        let err = installer.run(&options).await.unwrap_err();
        assert!(matches!(err, Error::SourceMissing(_)));
    }

    #[tokio::test]
    async fn no_local_chrome_on_linux_cannot_download() {
        let tmp = TempDir::new().unwrap();
        let unpacker = SevenZip::default();
        let installer = Installer::new(linux(), Reporter::new(false), &NoBrowser, &unpacker);
        let options = RunOptions {
            helium_path: Some(tmp.path().join("dest")),
            ..Default::default()
        };

        let err = installer.run(&options).await.unwrap_err();
        assert!(matches!(err, Error::NoRemoteAssets { .. }));
        assert!(!tmp.path().join("dest").exists());
    }
}
