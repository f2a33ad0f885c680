use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::env as app_env;
use crate::error::{Error, Result};
use crate::platform::Os;

pub const CHROME: &str = "chrome";

/// Finds the executable of an installed browser.
pub trait BrowserLocator {
    fn find_installed_browser(&self, name: &str) -> Result<PathBuf>;
}

/// Looks in the usual per-OS install locations, then on `PATH`.
#[derive(Clone, Copy, Debug)]
pub struct SystemLocator {
    os: Os,
}

impl SystemLocator {
    pub fn new(os: Os) -> Self {
        Self { os }
    }
}

impl BrowserLocator for SystemLocator {
    fn find_installed_browser(&self, name: &str) -> Result<PathBuf> {
        for candidate in install_candidates(self.os, name) {
            debug!("locator: trying {}", candidate.display());
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        if let Some(found) = find_on_path(launcher_names(self.os, name), env::var_os("PATH")) {
            return Ok(found);
        }

        Err(Error::BrowserNotFound(name.to_owned()))
    }
}

/// First launcher that resolves to an executable in the `paths` search list.
fn find_on_path(launchers: &[&str], paths: Option<OsString>) -> Option<PathBuf> {
    let paths = paths?;
    let cwd = env::current_dir().ok()?;
    for launcher in launchers {
        match which::which_in(launcher, Some(&paths), &cwd) {
            Ok(found) => {
                debug!("locator: found {} on PATH", found.display());
                // Distro launchers are usually symlinks into the real install dir.
                return Some(fs::canonicalize(&found).unwrap_or(found));
            }
            Err(err) => debug!("locator: {launcher} not on PATH: {err}"),
        }
    }
    None
}

fn install_candidates(os: Os, name: &str) -> Vec<PathBuf> {
    if name != CHROME {
        return Vec::new();
    }
    match os {
        Os::Windows => ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|key| env::var_os(key))
            .map(|root| {
                PathBuf::from(root)
                    .join("Google")
                    .join("Chrome")
                    .join("Application")
                    .join("chrome.exe")
            })
            .collect(),
        Os::MacOs => [PathBuf::from("/Applications"), app_env::home_dir().join("Applications")]
            .into_iter()
            .map(|root| {
                root.join("Google Chrome.app")
                    .join("Contents")
                    .join("MacOS")
                    .join("Google Chrome")
            })
            .collect(),
        Os::Linux => vec![
            PathBuf::from("/opt/google/chrome/chrome"),
            PathBuf::from("/opt/google/chrome/google-chrome"),
        ],
    }
}

fn launcher_names(os: Os, name: &str) -> &'static [&'static str] {
    if name != CHROME {
        return &[];
    }
    match os {
        Os::Windows => &["chrome.exe"],
        Os::MacOs => &[],
        Os::Linux => &["google-chrome-stable", "google-chrome"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_browser_is_not_found() {
        let err = SystemLocator::new(Os::Linux)
            .find_installed_browser("netscape")
            .unwrap_err();
        assert!(matches!(err, Error::BrowserNotFound(name) if name == "netscape"));
    }

    #[test]
    fn chrome_candidates_point_at_executables() {
        let mac = install_candidates(Os::MacOs, CHROME);
        assert!(mac.iter().all(|p| p.ends_with("Contents/MacOS/Google Chrome")));

        let linux = install_candidates(Os::Linux, CHROME);
        assert_eq!(linux[0], PathBuf::from("/opt/google/chrome/chrome"));
    }

    #[cfg(unix)]
    #[test]
    fn path_lookup_requires_an_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let launcher = dir.path().join("google-chrome");
        fs::write(&launcher, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&launcher, fs::Permissions::from_mode(0o644)).unwrap();
        let search = Some(dir.path().as_os_str().to_owned());

        let launchers = launcher_names(Os::Linux, CHROME);
        assert_eq!(find_on_path(launchers, search.clone()), None);

        fs::set_permissions(&launcher, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(
            find_on_path(launchers, search),
            Some(fs::canonicalize(&launcher).unwrap())
        );
    }

    #[test]
    fn empty_search_list_finds_nothing() {
        assert_eq!(find_on_path(launcher_names(Os::Linux, CHROME), None), None);
        assert_eq!(find_on_path(&[], Some(OsString::from("/usr/bin"))), None);
    }
}
