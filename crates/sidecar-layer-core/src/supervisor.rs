use crate::config::ShutdownConfig;
use crate::error::SidecarError;
use crate::process::{ProcessId, ProcessLauncher, SidecarHandle};
use crate::resolver::ResolvedSidecar;
use crate::termination::{
    TerminationOutcome, TerminationStatus, TerminationStrategy, TerminationTarget,
};
use tracing::{error, info, warn};

/// Owns the lifecycle of the single sidecar process
///
/// The supervisor holds the platform pieces (launcher and termination
/// strategy) but not the [`SidecarHandle`]: the application-lifecycle driver
/// owns the handle and passes it to [`launch`](Self::launch) and
/// [`terminate`](Self::terminate).
pub struct SidecarSupervisor<Strategy, Launcher> {
    strategy: Strategy,
    launcher: Launcher,
    interpreter: String,
    shutdown: ShutdownConfig,
}

impl<Strategy, Launcher> SidecarSupervisor<Strategy, Launcher>
where
    Strategy: TerminationStrategy,
    Launcher: ProcessLauncher,
{
    pub fn new(
        strategy: Strategy,
        launcher: Launcher,
        interpreter: impl Into<String>,
        shutdown: ShutdownConfig,
    ) -> Self {
        Self {
            strategy,
            launcher,
            interpreter: interpreter.into(),
            shutdown,
        }
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Start the resolved sidecar bound to the handle's port
    pub async fn launch(
        &self,
        handle: &mut SidecarHandle,
        resolved: &ResolvedSidecar,
    ) -> Result<ProcessId, SidecarError> {
        if let (Some(_), Some(pid)) = (handle.pending_cleanup(), handle.process_id()) {
            warn!(pid = %pid, "Refusing to launch while the previous sidecar is still terminating");
            return Err(SidecarError::TerminationPending(pid));
        }

        if let Some(pid) = handle.process_id() {
            return Err(SidecarError::AlreadyRunning(pid));
        }

        let port = handle.port();
        let (program, args) = resolved.command(&self.interpreter, port);
        info!(
            program = %program.display(),
            args = ?args,
            invocation = ?resolved.invocation,
            "Starting sidecar process"
        );

        handle.begin_launch();
        match self.launcher.spawn_process(&program, &args).await {
            Ok(pid) => {
                handle.mark_running(pid, resolved.clone());
                info!(pid = %pid, port = port, "Sidecar process started");
                info!(
                    "API documentation hosted at {}/docs",
                    handle.service_url()
                );
                Ok(pid)
            }
            Err(source) => {
                handle.clear();
                error!(
                    program = %program.display(),
                    port = port,
                    error = %source,
                    "Sidecar process failed to start"
                );
                Err(SidecarError::Launch { program, source })
            }
        }
    }

    /// Tear down the sidecar and everything it spawned
    ///
    /// `caller_pid` is the supervising application's own process id, used by
    /// strategies that walk the process tree. With no active sidecar this is a
    /// no-op that resolves immediately. If an earlier termination timed out and
    /// is still running, the returned outcome waits on that one instead of
    /// issuing a new request.
    pub fn terminate<'a>(
        &self,
        handle: &'a mut SidecarHandle,
        caller_pid: ProcessId,
    ) -> TerminationOutcome<'a> {
        if let Some(signal) = handle.pending_cleanup() {
            info!(
                pid = ?handle.process_id(),
                "Earlier sidecar termination still running, waiting on it again"
            );
            return TerminationOutcome::in_flight(handle, signal, &self.shutdown);
        }

        let Some(pid) = handle.process_id() else {
            info!("No sidecar process to terminate");
            return TerminationOutcome::not_running(handle);
        };

        let target = TerminationTarget {
            pid,
            caller_pid,
            image_name: handle
                .launch()
                .map(ResolvedSidecar::image_name)
                .unwrap_or_default(),
        };
        info!(
            pid = %pid,
            caller_pid = %caller_pid,
            strategy = self.strategy.name(),
            "Terminating sidecar process"
        );

        handle.begin_termination();
        let signal = self.strategy.terminate(&target);
        TerminationOutcome::in_flight(handle, signal, &self.shutdown)
    }

    /// Terminate and wait for the outcome in one call
    pub async fn shutdown(
        &self,
        handle: &mut SidecarHandle,
        caller_pid: ProcessId,
    ) -> TerminationStatus {
        self.terminate(handle, caller_pid).await
    }
}
