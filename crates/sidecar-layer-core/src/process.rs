use crate::resolver::ResolvedSidecar;
use crate::termination::CompletionSignal;
use async_trait::async_trait;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

/// OS-assigned process identifier
pub type ProcessId = u32;

/// Result of a single termination request
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationResult {
    /// Signal or kill request was delivered
    Success,
    /// Process was not found (already exited)
    ProcessNotFound,
    /// Insufficient privileges to signal the process
    AccessDenied,
    /// Operation failed with specific error message
    Failed(String),
}

impl TerminationResult {
    /// True when the process is gone or about to be
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            TerminationResult::Success | TerminationResult::ProcessNotFound
        )
    }
}

/// One row of a process table snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: ProcessId,
    pub parent: Option<ProcessId>,
    /// Image name as reported by the OS, e.g. `api.exe` or `python.exe`
    pub name: String,
    /// Full argument vector, when the OS exposes it
    pub cmd: Vec<String>,
}

impl ProcessEntry {
    pub fn new(pid: ProcessId, parent: Option<ProcessId>, name: impl Into<String>) -> Self {
        Self {
            pid,
            parent,
            name: name.into(),
            cmd: Vec::new(),
        }
    }

    pub fn with_cmd<S: ToString, I: IntoIterator<Item = S>>(mut self, cmd: I) -> Self {
        self.cmd = cmd.into_iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether this process runs `image_name`, either as its own image or as
    /// a script argument handed to an interpreter
    pub fn runs_image(&self, image_name: &str) -> bool {
        if image_name.is_empty() {
            return false;
        }

        self.name.eq_ignore_ascii_case(image_name)
            || self.cmd.iter().any(|arg| {
                // Both separators: listings may come from either platform
                arg.rsplit(['/', '\\'])
                    .next()
                    .is_some_and(|name| name.eq_ignore_ascii_case(image_name))
            })
    }
}

/// Lifecycle state of the sidecar handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SidecarState {
    #[default]
    Absent,
    Launching,
    Running,
    Terminating,
}

/// The single in-flight representation of the launched sidecar
///
/// Owned by the application-lifecycle driver and passed by reference to the
/// supervisor. Holds a process id only between a successful launch and the
/// completion of its termination. A termination whose wait timed out leaves
/// the handle in [`SidecarState::Terminating`] until the strategy finishes.
#[derive(Debug, Clone)]
pub struct SidecarHandle {
    process_id: Option<ProcessId>,
    port: u16,
    launch: Option<ResolvedSidecar>,
    state: SidecarState,
    cleanup: Option<CompletionSignal>,
}

impl SidecarHandle {
    pub fn new(port: u16) -> Self {
        Self {
            process_id: None,
            port,
            launch: None,
            state: SidecarState::Absent,
            cleanup: None,
        }
    }

    pub fn process_id(&self) -> Option<ProcessId> {
        self.process_id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// How the current process was started, if any
    pub fn launch(&self) -> Option<&ResolvedSidecar> {
        self.launch.as_ref()
    }

    pub fn state(&self) -> SidecarState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.process_id.is_some()
    }

    /// Whether a timed-out termination is still tearing processes down
    pub fn cleanup_pending(&self) -> bool {
        self.cleanup
            .as_ref()
            .is_some_and(|signal| !signal.is_complete())
    }

    /// Base URL the sidecar serves on once it has bound its port
    pub fn service_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub(crate) fn begin_launch(&mut self) {
        self.state = SidecarState::Launching;
    }

    pub(crate) fn mark_running(&mut self, pid: ProcessId, launch: ResolvedSidecar) {
        self.process_id = Some(pid);
        self.launch = Some(launch);
        self.state = SidecarState::Running;
    }

    pub(crate) fn begin_termination(&mut self) {
        self.state = SidecarState::Terminating;
    }

    pub(crate) fn defer_cleanup(&mut self, signal: CompletionSignal) {
        self.state = SidecarState::Terminating;
        self.cleanup = Some(signal);
    }

    /// Signal of an earlier termination that is still running. Clears the
    /// handle once that termination has finished.
    pub(crate) fn pending_cleanup(&mut self) -> Option<CompletionSignal> {
        let signal = self.cleanup.clone()?;
        if signal.is_complete() {
            self.clear();
            None
        } else {
            Some(signal)
        }
    }

    pub(crate) fn clear(&mut self) {
        self.process_id = None;
        self.launch = None;
        self.state = SidecarState::Absent;
        self.cleanup = None;
    }
}

/// Starts OS processes on behalf of the supervisor
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Spawn `program` with `args`, standard streams discarded
    async fn spawn_process(&self, program: &Path, args: &[String]) -> std::io::Result<ProcessId>;

    /// Wait for a process spawned by this launcher to exit.
    ///
    /// Returns `Ok(None)` if the process is unknown to the launcher or the
    /// timeout elapsed first.
    async fn wait_for_exit(
        &self,
        pid: ProcessId,
        timeout: Option<Duration>,
    ) -> anyhow::Result<Option<ExitStatus>>;
}
