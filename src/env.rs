use std::env;
use std::path::PathBuf;

use crate::platform::Os;

const TEMP_SUBDIR: &str = "helium-widevine";

/// Overrides the release metadata endpoint, e.g. for a mirror.
pub const RELEASE_URL_VAR: &str = "HELIUM_WIDEVINE_RELEASE_URL";
/// Overrides the 7-Zip executable used to unpack installers.
pub const SEVEN_ZIP_VAR: &str = "HELIUM_WIDEVINE_7Z";

pub fn release_url_override() -> Option<String> {
    env::var(RELEASE_URL_VAR).ok().filter(|value| !value.trim().is_empty())
}

pub fn seven_zip_override() -> Option<PathBuf> {
    env::var_os(SEVEN_ZIP_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// The current user's home directory, falling back to the working directory.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Scratch root holding the downloaded installer, its cache record and the extraction.
pub fn temp_root() -> PathBuf {
    let base = ["TMPDIR", "TEMP", "TMP"]
        .iter()
        .find_map(|key| env::var_os(key).filter(|value| !value.is_empty()))
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            if cfg!(target_os = "windows") {
                PathBuf::from(r"C:\Windows\Temp")
            } else {
                PathBuf::from("/tmp")
            }
        });

    base.join(TEMP_SUBDIR)
}

/// Per-OS root under which browsers keep their user data.
pub fn user_data_root(os: Os) -> PathBuf {
    match os {
        Os::Windows => env::var_os("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join("AppData").join("Local")),
        Os::MacOs => home_dir().join("Library").join("Application Support"),
        Os::Linux => env::var_os("XDG_CONFIG_HOME")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".config")),
    }
}

/// Directory where Helium keeps its versioned WidevineCdm slots.
pub fn helium_widevine_dir(os: Os) -> PathBuf {
    let root = user_data_root(os);
    match os {
        Os::Windows => root
            .join("imput")
            .join("Helium")
            .join("User Data")
            .join("WidevineCdm"),
        Os::MacOs | Os::Linux => root.join("net.imput.helium").join("WidevineCdm"),
    }
}
