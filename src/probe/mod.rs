//! Filesystem probes for the WidevineCdm module and the slot it is copied into.
//!
//! Nothing here is cached: every call lists the directories again. A missing
//! directory is reported as `None`, never as an error.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::env;
use crate::platform::{Os, Platform, is_version_name};

pub mod locator;

pub use locator::{BrowserLocator, CHROME, SystemLocator};

pub const WIDEVINE_DIR: &str = "WidevineCdm";

const MAC_FRAMEWORK: &str = "Google Chrome Framework.framework";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The browser the module is taken from (Chrome).
    Source,
    /// The browser the module is installed into (Helium).
    Destination,
}

/// Find the WidevineCdm directory for `role` on this machine.
pub fn locate_module(
    role: Role,
    platform: Platform,
    locator: &dyn BrowserLocator,
) -> Option<PathBuf> {
    match role {
        Role::Source => {
            let exe = match locator.find_installed_browser(CHROME) {
                Ok(exe) => exe,
                Err(err) => {
                    debug!("probe: {err}");
                    return None;
                }
            };
            debug!("probe: chrome executable at {}", exe.display());
            source_from_executable(platform.os, &exe)
        }
        Role::Destination => destination_slot(&env::helium_widevine_dir(platform.os)),
    }
}

/// Resolve Chrome's bundled WidevineCdm from the location of its executable.
pub fn source_from_executable(os: Os, exe: &Path) -> Option<PathBuf> {
    let exe_dir = exe.parent()?;
    match os {
        Os::Windows => scan_versions(exe_dir, Path::new(WIDEVINE_DIR)),
        Os::MacOs => {
            // .../Google Chrome.app/Contents/MacOS/Google Chrome
            let contents = exe_dir.parent()?;
            let versions = contents
                .join("Frameworks")
                .join(MAC_FRAMEWORK)
                .join("Versions");
            let relative = Path::new("Libraries").join(WIDEVINE_DIR);
            scan_versions(&versions, &relative).or_else(|| {
                let current = versions.join("Current").join(&relative);
                current.is_dir().then_some(current)
            })
        }
        Os::Linux => {
            let direct = exe_dir.join(WIDEVINE_DIR);
            if direct.is_dir() {
                return Some(direct);
            }
            scan_versions(exe_dir, Path::new(WIDEVINE_DIR))
        }
    }
}

/// Walk the version-named children of `root` in listing order and return the
/// first `<version>/<relative>` that is a directory.
pub fn scan_versions(root: &Path, relative: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(root).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !is_version_name(&name.to_string_lossy()) {
            continue;
        }
        let candidate = entry.path().join(relative);
        debug!("probe: checking {}", candidate.display());
        if candidate.is_dir() {
            return Some(candidate);
        }
    }
    None
}

/// First version-named directory directly under `base`.
pub fn destination_slot(base: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(base).ok()?;
    entries
        .flatten()
        .filter(|entry| is_version_name(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .find(|path| path.is_dir())
}

#[derive(Deserialize)]
struct CdmManifest {
    version: String,
}

/// Version recorded in a WidevineCdm directory's `manifest.json`, if readable.
pub fn cdm_version(dir: &Path) -> Option<String> {
    let contents = fs::read_to_string(dir.join("manifest.json")).ok()?;
    match serde_json::from_str::<CdmManifest>(&contents) {
        Ok(manifest) => Some(manifest.version),
        Err(err) => {
            debug!("probe: unreadable manifest in {}: {err}", dir.display());
            None
        }
    }
}
