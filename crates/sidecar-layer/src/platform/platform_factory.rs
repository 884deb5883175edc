use anyhow::Result;
use async_trait::async_trait;
use sidecar_layer_core::{
    CompletionSignal, ProcessId, ProcessLauncher, TerminationStrategy, TerminationTarget,
};
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;
use tracing::info;

/// Platform-specific termination strategies
pub enum PlatformTermination {
    #[cfg(unix)]
    Posix(sidecar_layer_unix::PosixSignalStrategy<sidecar_layer_unix::NixSignaller>),
    #[cfg(windows)]
    ProcessTree(
        sidecar_layer_windows::ProcessTreeStrategy<sidecar_layer_windows::SysinfoProcessTree>,
    ),
}

impl PlatformTermination {
    pub fn new() -> Self {
        #[cfg(unix)]
        {
            info!("Creating posix signal termination strategy");
            Self::Posix(sidecar_layer_unix::UnixSidecarFactory::create_strategy())
        }

        #[cfg(windows)]
        {
            info!("Creating process tree termination strategy");
            Self::ProcessTree(sidecar_layer_windows::WindowsSidecarFactory::create_strategy())
        }

        #[cfg(not(any(unix, windows)))]
        {
            compile_error!("Unsupported platform: only Unix and Windows are currently supported");
        }
    }
}

impl Default for PlatformTermination {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminationStrategy for PlatformTermination {
    fn terminate(&self, target: &TerminationTarget) -> CompletionSignal {
        match self {
            #[cfg(unix)]
            Self::Posix(strategy) => strategy.terminate(target),
            #[cfg(windows)]
            Self::ProcessTree(strategy) => strategy.terminate(target),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            #[cfg(unix)]
            Self::Posix(strategy) => strategy.name(),
            #[cfg(windows)]
            Self::ProcessTree(strategy) => strategy.name(),
        }
    }
}

/// Platform-specific process launchers
pub enum PlatformLauncher {
    #[cfg(unix)]
    Unix(sidecar_layer_unix::UnixProcessLauncher),
    #[cfg(windows)]
    Windows(sidecar_layer_windows::WindowsProcessLauncher),
}

impl PlatformLauncher {
    pub fn new() -> Self {
        #[cfg(unix)]
        {
            Self::Unix(sidecar_layer_unix::UnixSidecarFactory::create_launcher())
        }

        #[cfg(windows)]
        {
            Self::Windows(sidecar_layer_windows::WindowsSidecarFactory::create_launcher())
        }

        #[cfg(not(any(unix, windows)))]
        {
            compile_error!("Unsupported platform: only Unix and Windows are currently supported");
        }
    }
}

impl Default for PlatformLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessLauncher for PlatformLauncher {
    async fn spawn_process(&self, program: &Path, args: &[String]) -> std::io::Result<ProcessId> {
        match self {
            #[cfg(unix)]
            Self::Unix(launcher) => launcher.spawn_process(program, args).await,
            #[cfg(windows)]
            Self::Windows(launcher) => launcher.spawn_process(program, args).await,
        }
    }

    async fn wait_for_exit(
        &self,
        pid: ProcessId,
        timeout: Option<Duration>,
    ) -> Result<Option<ExitStatus>> {
        match self {
            #[cfg(unix)]
            Self::Unix(launcher) => launcher.wait_for_exit(pid, timeout).await,
            #[cfg(windows)]
            Self::Windows(launcher) => launcher.wait_for_exit(pid, timeout).await,
        }
    }
}

/// Platform-agnostic factory that selects the appropriate implementation at compile time
pub struct PlatformSidecarFactory;

impl PlatformSidecarFactory {
    pub fn create_launcher() -> PlatformLauncher {
        PlatformLauncher::new()
    }

    pub fn create_strategy() -> PlatformTermination {
        PlatformTermination::new()
    }

    pub fn platform_name() -> &'static str {
        #[cfg(unix)]
        {
            sidecar_layer_unix::UnixSidecarFactory::platform_name()
        }

        #[cfg(windows)]
        {
            sidecar_layer_windows::WindowsSidecarFactory::platform_name()
        }

        #[cfg(not(any(unix, windows)))]
        {
            "Unknown"
        }
    }
}
