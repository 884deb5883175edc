use crate::error::SidecarError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating system family, as far as sidecar management is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// darwin and linux: signals reach the tracked child directly
    Posix,
    /// No process-group kill, descendants must be found by walking the tree
    Windows,
}

impl Platform {
    /// Platform of the compile target
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// Suffix carried by packaged executables on this platform
    pub fn executable_suffix(&self) -> &'static str {
        match self {
            Platform::Posix => "",
            Platform::Windows => ".exe",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Posix => "posix",
            Platform::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = SidecarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "darwin" | "macos" | "linux" | "posix" | "unix" => Ok(Platform::Posix),
            "win32" | "windows" => Ok(Platform::Windows),
            _ => Err(SidecarError::resolution(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_platforms() {
        assert_eq!("darwin".parse::<Platform>().unwrap(), Platform::Posix);
        assert_eq!("linux".parse::<Platform>().unwrap(), Platform::Posix);
        assert_eq!("Linux".parse::<Platform>().unwrap(), Platform::Posix);
        assert_eq!("win32".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!(" WINDOWS ".parse::<Platform>().unwrap(), Platform::Windows);
    }

    #[test]
    fn test_parse_unknown_platform() {
        let err = "haiku".parse::<Platform>().unwrap_err();
        assert!(matches!(err, SidecarError::Resolution(ref name) if name == "haiku"));
    }

    #[test]
    fn test_current_platform() {
        #[cfg(windows)]
        assert_eq!(Platform::current(), Platform::Windows);

        #[cfg(unix)]
        assert_eq!(Platform::current(), Platform::Posix);
    }

    #[test]
    fn test_executable_suffix() {
        assert_eq!(Platform::Posix.executable_suffix(), "");
        assert_eq!(Platform::Windows.executable_suffix(), ".exe");
    }
}
