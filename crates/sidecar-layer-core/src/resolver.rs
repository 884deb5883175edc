//! Executable resolution
//!
//! Decides where the sidecar lives and how it has to be started. Whether the
//! application is packaged is guessed from the filesystem: if a prebuilt
//! sidecar sits in the resources directory the build is packaged, otherwise
//! the sidecar is run from source through an interpreter. The same probing
//! runs unmodified in packaged and development trees.

use crate::error::SidecarError;
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether the sidecar runs from prebuilt artifacts or from source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingMode {
    #[default]
    Development,
    Packaged,
}

/// How the resolved path must be started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Invocation {
    /// The path is a self-contained executable
    Direct,
    /// The path is a script handed to the interpreter
    Interpreter,
}

/// Result of resolving the sidecar executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSidecar {
    pub path: PathBuf,
    pub invocation: Invocation,
    pub mode: PackagingMode,
}

impl ResolvedSidecar {
    /// File name of the resolved path, as it shows up in process listings
    pub fn image_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Program and arguments that start the sidecar bound to `port`
    pub fn command(&self, interpreter: &str, port: u16) -> (PathBuf, Vec<String>) {
        match self.invocation {
            Invocation::Direct => (self.path.clone(), vec![port.to_string()]),
            Invocation::Interpreter => (
                PathBuf::from(interpreter),
                vec![self.path.to_string_lossy().into_owned(), port.to_string()],
            ),
        }
    }
}

/// Resolves the sidecar executable for a fixed layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableResolver {
    module_name: String,
    script_extension: String,
    resources_dir: PathBuf,
    dev_script_dir: PathBuf,
}

impl ExecutableResolver {
    pub fn new(
        module_name: impl Into<String>,
        script_extension: impl Into<String>,
        resources_dir: impl Into<PathBuf>,
        dev_script_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            module_name: module_name.into(),
            script_extension: script_extension.into(),
            resources_dir: resources_dir.into(),
            dev_script_dir: dev_script_dir.into(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Packaged if either a unix-style or a windows-style executable exists
    pub fn detect_mode(&self) -> PackagingMode {
        let unix_path = self.resources_dir.join(&self.module_name);
        let windows_path = self
            .resources_dir
            .join(format!("{}{}", self.module_name, Platform::Windows.executable_suffix()));

        if unix_path.exists() || windows_path.exists() {
            PackagingMode::Packaged
        } else {
            PackagingMode::Development
        }
    }

    pub fn resolve(&self, requested: PackagingMode, platform: Platform) -> ResolvedSidecar {
        let mode = self.detect_mode();
        if mode != requested {
            debug!(
                requested = ?requested,
                detected = ?mode,
                resources_dir = %self.resources_dir.display(),
                "Requested packaging mode overridden by filesystem probe"
            );
        }

        let resolved = match mode {
            PackagingMode::Development => ResolvedSidecar {
                path: self
                    .dev_script_dir
                    .join(format!("{}.{}", self.module_name, self.script_extension)),
                invocation: Invocation::Interpreter,
                mode,
            },
            PackagingMode::Packaged => ResolvedSidecar {
                path: self.resources_dir.join(format!(
                    "{}{}",
                    self.module_name,
                    platform.executable_suffix()
                )),
                invocation: Invocation::Direct,
                mode,
            },
        };

        debug!(
            path = %resolved.path.display(),
            invocation = ?resolved.invocation,
            platform = %platform,
            "Resolved sidecar executable"
        );
        resolved
    }

    /// Resolve for a platform given by name, e.g. `"darwin"` or `"win32"`
    pub fn resolve_named(
        &self,
        requested: PackagingMode,
        platform: &str,
    ) -> Result<ResolvedSidecar, SidecarError> {
        let platform = platform.parse::<Platform>()?;
        Ok(self.resolve(requested, platform))
    }
}

/// One-shot form of [`ExecutableResolver::resolve`]
pub fn resolve_path(
    requested: PackagingMode,
    platform: Platform,
    module_name: &str,
    script_extension: &str,
    resources_dir: &Path,
    dev_script_dir: &Path,
) -> ResolvedSidecar {
    ExecutableResolver::new(module_name, script_extension, resources_dir, dev_script_dir)
        .resolve(requested, platform)
}
