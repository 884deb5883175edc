use async_trait::async_trait;
use sidecar_layer_core::{
    Invocation, PackagingMode, ProcessEntry, ProcessId, ProcessLauncher, ResolvedSidecar,
    ShutdownConfig, SidecarHandle, SidecarState, SidecarSupervisor, TerminationResult,
    TerminationStatus,
};
use sidecar_layer_windows::{ProcessTree, ProcessTreeStrategy};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Mutex;
use std::time::Duration;

const SHELL_PID: ProcessId = 100;

/// Process table whose sidecar appears under the shell once launched
struct SimulatedTable {
    entries: Vec<ProcessEntry>,
    kills: Mutex<Vec<ProcessId>>,
}

impl SimulatedTable {
    fn new(entries: Vec<ProcessEntry>) -> Self {
        Self {
            entries,
            kills: Mutex::new(Vec::new()),
        }
    }
}

impl ProcessTree for SimulatedTable {
    fn descendants(&self, root: ProcessId) -> anyhow::Result<Vec<ProcessEntry>> {
        assert_eq!(root, SHELL_PID);
        Ok(self.entries.clone())
    }

    fn force_kill(&self, pid: ProcessId) -> TerminationResult {
        self.kills.lock().unwrap().push(pid);
        TerminationResult::Success
    }
}

struct FixedPidLauncher(ProcessId);

#[async_trait]
impl ProcessLauncher for FixedPidLauncher {
    async fn spawn_process(&self, _program: &Path, _args: &[String]) -> std::io::Result<ProcessId> {
        Ok(self.0)
    }

    async fn wait_for_exit(
        &self,
        _pid: ProcessId,
        _timeout: Option<Duration>,
    ) -> anyhow::Result<Option<ExitStatus>> {
        Ok(None)
    }
}

fn packaged_exe() -> ResolvedSidecar {
    ResolvedSidecar {
        path: PathBuf::from("resources").join("api.exe"),
        invocation: Invocation::Direct,
        mode: PackagingMode::Packaged,
    }
}

fn supervisor(
    entries: Vec<ProcessEntry>,
) -> SidecarSupervisor<ProcessTreeStrategy<SimulatedTable>, FixedPidLauncher> {
    SidecarSupervisor::new(
        ProcessTreeStrategy::new(SimulatedTable::new(entries)),
        FixedPidLauncher(200),
        "python",
        ShutdownConfig::new(),
    )
}

#[tokio::test]
async fn test_launch_then_terminate_kills_every_matching_descendant() {
    let supervisor = supervisor(vec![
        ProcessEntry::new(200, Some(SHELL_PID), "api.exe"),
        ProcessEntry::new(201, Some(200), "api.exe"),
        ProcessEntry::new(202, Some(201), "API.EXE"),
        ProcessEntry::new(300, Some(SHELL_PID), "renderer.exe"),
        ProcessEntry::new(301, Some(SHELL_PID), "gpu-helper.exe"),
    ]);
    let mut handle = SidecarHandle::new(5000);

    let pid = supervisor.launch(&mut handle, &packaged_exe()).await.unwrap();
    assert_eq!(pid, 200);

    let outcome = supervisor.terminate(&mut handle, SHELL_PID);
    let status = outcome.await;

    assert_eq!(status, TerminationStatus::Completed);
    assert_eq!(handle.state(), SidecarState::Absent);
    assert_eq!(handle.process_id(), None);

    let mut kills = supervisor.strategy().tree().kills.lock().unwrap().clone();
    kills.sort_unstable();
    assert_eq!(kills, vec![200, 201, 202]);
}

#[tokio::test]
async fn test_launch_then_terminate_with_no_matching_descendants() {
    let supervisor = supervisor(vec![
        ProcessEntry::new(300, Some(SHELL_PID), "renderer.exe"),
        ProcessEntry::new(301, Some(SHELL_PID), "gpu-helper.exe"),
    ]);
    let mut handle = SidecarHandle::new(5000);
    supervisor.launch(&mut handle, &packaged_exe()).await.unwrap();

    let status = supervisor.shutdown(&mut handle, SHELL_PID).await;

    assert_eq!(status, TerminationStatus::Completed);
    assert_eq!(handle.state(), SidecarState::Absent);
    assert!(supervisor.strategy().tree().kills.lock().unwrap().is_empty());
}
