use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static VERSION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+\.\d+$").expect("valid version regex"));

const INSTALLER_SUFFIX: &str = "_chrome_installer_uncompressed.exe";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    X64,
    Arm64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Os {
    /// Parse a value in the shape of `std::env::consts::OS`.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "windows" => Ok(Os::Windows),
            "macos" => Ok(Os::MacOs),
            "linux" => Ok(Os::Linux),
            other => Err(Error::UnsupportedOs(other.to_owned())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::MacOs => "macos",
            Os::Linux => "linux",
        }
    }
}

impl Arch {
    /// Parse a value in the shape of `std::env::consts::ARCH`.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "x86_64" | "x64" => Ok(Arch::X64),
            "aarch64" | "arm64" => Ok(Arch::Arm64),
            other => Err(Error::UnsupportedArch(other.to_owned())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl Platform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Identify the platform this binary is running on.
    pub fn current() -> Result<Self> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_parts(os: &str, arch: &str) -> Result<Self> {
        Ok(Self::new(Os::parse(os)?, Arch::parse(arch)?))
    }

    /// Build the matcher for the installer asset published for this platform.
    ///
    /// Installers are only published for Windows; every other OS is rejected.
    pub fn asset_pattern(self) -> Result<Regex> {
        if self.os != Os::Windows {
            return Err(Error::NoRemoteAssets {
                os: self.os.as_str().to_owned(),
            });
        }
        let pattern = format!(
            r"^{}_\d+\.\d+\.\d+\.\d+{}$",
            self.arch.as_str(),
            regex::escape(INSTALLER_SUFFIX)
        );
        Ok(Regex::new(&pattern).expect("valid asset regex"))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Whether a directory name looks like a four-part browser version (`143.0.7499.170`).
#[must_use]
pub fn is_version_name(name: &str) -> bool {
    VERSION_NAME.is_match(name)
}
