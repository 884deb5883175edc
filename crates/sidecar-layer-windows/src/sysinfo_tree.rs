use crate::tree_strategy::ProcessTree;
use anyhow::Result;
use sidecar_layer_core::{ProcessEntry, ProcessId, TerminationResult};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use sysinfo::System;
use tracing::info;

/// Process table backed by `sysinfo`
pub struct SysinfoProcessTree {
    system: Mutex<System>,
}

impl Default for SysinfoProcessTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProcessTree {
    pub fn new() -> Self {
        info!("Initializing process tree with system monitoring");
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// One pass over the process table, as entries the tree walk can use
    fn snapshot(system: &System) -> Vec<ProcessEntry> {
        system
            .processes()
            .iter()
            .map(|(pid, process)| {
                ProcessEntry::new(
                    pid.as_u32(),
                    process.parent().map(|ppid| ppid.as_u32()),
                    process.name().to_string_lossy(),
                )
                .with_cmd(process.cmd().iter().map(|arg| arg.to_string_lossy()))
            })
            .collect()
    }
}

/// Breadth-first walk of `snapshot` collecting every descendant of `root`
///
/// Parent ids on Windows can be stale and pids get reused, so the table may
/// contain cycles. Each pid is visited at most once.
fn collect_descendants(snapshot: Vec<ProcessEntry>, root: ProcessId) -> Vec<ProcessEntry> {
    let mut children: HashMap<ProcessId, Vec<ProcessEntry>> = HashMap::new();
    for entry in snapshot {
        if let Some(parent) = entry.parent.filter(|&parent| parent != entry.pid) {
            children.entry(parent).or_default().push(entry);
        }
    }

    let mut visited = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    let mut result = Vec::new();
    while let Some(pid) = queue.pop_front() {
        let Some(direct) = children.remove(&pid) else {
            continue;
        };
        for child in direct {
            if visited.insert(child.pid) {
                queue.push_back(child.pid);
                result.push(child);
            }
        }
    }
    result
}

impl ProcessTree for SysinfoProcessTree {
    fn descendants(&self, root: ProcessId) -> Result<Vec<ProcessEntry>> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| anyhow::anyhow!("process table lock poisoned"))?;
        system.refresh_processes_specifics(
            sysinfo::ProcessesToUpdate::All,
            true,
            sysinfo::ProcessRefreshKind::everything(),
        );

        Ok(collect_descendants(Self::snapshot(&system), root))
    }

    #[cfg(windows)]
    fn force_kill(&self, pid: ProcessId) -> TerminationResult {
        win32::terminate_process(pid)
    }

    #[cfg(not(windows))]
    fn force_kill(&self, pid: ProcessId) -> TerminationResult {
        let Ok(mut system) = self.system.lock() else {
            return TerminationResult::Failed("process table lock poisoned".to_string());
        };
        let sys_pid = sysinfo::Pid::from_u32(pid);
        system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[sys_pid]), true);

        match system.process(sys_pid) {
            Some(process) if process.kill() => TerminationResult::Success,
            Some(_) => TerminationResult::Failed(format!("kill request for {pid} was rejected")),
            None => TerminationResult::ProcessNotFound,
        }
    }
}

#[cfg(windows)]
mod win32 {
    use sidecar_layer_core::{ProcessId, TerminationResult};
    use windows::Win32::Foundation::{CloseHandle, ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER};
    use windows::Win32::System::Threading::{OpenProcess, PROCESS_TERMINATE, TerminateProcess};

    pub fn terminate_process(pid: ProcessId) -> TerminationResult {
        // SAFETY: the handle is only used for TerminateProcess and closed below
        let handle = match unsafe { OpenProcess(PROCESS_TERMINATE, false, pid) } {
            Ok(handle) => handle,
            Err(e) if e.code() == ERROR_INVALID_PARAMETER.to_hresult() => {
                return TerminationResult::ProcessNotFound;
            }
            Err(e) if e.code() == ERROR_ACCESS_DENIED.to_hresult() => {
                return TerminationResult::AccessDenied;
            }
            Err(e) => return TerminationResult::Failed(format!("OpenProcess failed: {e}")),
        };

        let result = unsafe { TerminateProcess(handle, 1) };
        unsafe {
            let _ = CloseHandle(handle);
        }

        match result {
            Ok(()) => TerminationResult::Success,
            Err(e) if e.code() == ERROR_ACCESS_DENIED.to_hresult() => {
                TerminationResult::AccessDenied
            }
            Err(e) => TerminationResult::Failed(format!("TerminateProcess failed: {e}")),
        }
    }
}
