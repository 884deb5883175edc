use crate::platform::{PlatformLauncher, PlatformSidecarFactory, PlatformTermination};
use sidecar_layer_core::{
    ExecutableResolver, Platform, ProcessId, ProcessLauncher, ResolvedSidecar, SidecarConfig,
    SidecarError, SidecarHandle, SidecarSupervisor, TerminationOutcome, TerminationStatus,
};
use std::process::ExitStatus;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a completed shutdown waits to collect the sidecar's exit status
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

/// The desktop shell's view of its API sidecar
///
/// Call [`start_sidecar`](Self::start_sidecar) once the shell is ready and
/// [`stop_sidecar`](Self::stop_sidecar) when the last window closes. The
/// returned [`TerminationOutcome`] borrows the sidecar, so a new launch
/// cannot begin until the previous teardown has been awaited.
pub struct Sidecar {
    config: SidecarConfig,
    platform: Platform,
    resolver: ExecutableResolver,
    supervisor: SidecarSupervisor<PlatformTermination, PlatformLauncher>,
    handle: SidecarHandle,
}

impl Sidecar {
    pub fn new(config: SidecarConfig) -> Result<Self, SidecarError> {
        config.validate()?;

        let platform = Platform::current();
        info!(
            platform = %platform,
            backend = PlatformSidecarFactory::platform_name(),
            port = config.port,
            "Creating sidecar supervisor"
        );

        let supervisor = SidecarSupervisor::new(
            PlatformSidecarFactory::create_strategy(),
            PlatformSidecarFactory::create_launcher(),
            config.interpreter.clone(),
            config.shutdown.clone(),
        );

        Ok(Self {
            resolver: config.resolver(),
            handle: SidecarHandle::new(config.port),
            platform,
            supervisor,
            config,
        })
    }

    /// Where the sidecar lives and how it would be started right now
    pub fn resolved(&self) -> ResolvedSidecar {
        self.resolver.resolve(self.config.requested_mode, self.platform)
    }

    /// Resolve and launch the sidecar
    ///
    /// A launch error is fatal to startup: the shell should report it and
    /// exit instead of showing a UI with no backend.
    pub async fn start_sidecar(&mut self) -> Result<ProcessId, SidecarError> {
        let resolved = self.resolved();
        self.supervisor.launch(&mut self.handle, &resolved).await
    }

    /// Begin tearing down the sidecar and everything it spawned
    ///
    /// `caller_pid` is the shell's own process id. Await the outcome before
    /// letting the shell exit.
    pub fn stop_sidecar(&mut self, caller_pid: ProcessId) -> TerminationOutcome<'_> {
        self.supervisor.terminate(&mut self.handle, caller_pid)
    }

    /// Stop the sidecar, await the outcome, then reap the launched process
    pub async fn shutdown_sidecar(&mut self, caller_pid: ProcessId) -> TerminationStatus {
        let pid = self.handle.process_id();
        let status = self.stop_sidecar(caller_pid).await;

        if let (TerminationStatus::Completed, Some(pid)) = (status, pid) {
            match self.wait_for_exit(pid, Some(REAP_TIMEOUT)).await {
                Ok(Some(exit)) => debug!(pid = %pid, status = %exit, "Sidecar process reaped"),
                Ok(None) => debug!(pid = %pid, "Sidecar process not reaped yet"),
                Err(e) => warn!(pid = %pid, error = %e, "Failed to reap sidecar process"),
            }
        }
        status
    }

    /// Reap a process started by this sidecar's launcher
    pub async fn wait_for_exit(
        &self,
        pid: ProcessId,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Option<ExitStatus>> {
        self.supervisor.launcher().wait_for_exit(pid, timeout).await
    }

    pub fn handle(&self) -> &SidecarHandle {
        &self.handle
    }

    pub fn config(&self) -> &SidecarConfig {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn platform_name() -> &'static str {
        PlatformSidecarFactory::platform_name()
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        if let Some(pid) = self.handle.process_id() {
            warn!(
                pid = %pid,
                "Sidecar dropped while still active, relying on launcher cleanup"
            );
        }
    }
}
