use anyhow::Result;
use async_trait::async_trait;
use sidecar_layer_core::{ProcessId, ProcessLauncher};
use std::collections::HashMap;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// Windows-specific launcher that starts the sidecar without a console window
pub struct WindowsProcessLauncher {
    children: Mutex<HashMap<ProcessId, Child>>,
}

impl Default for WindowsProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowsProcessLauncher {
    pub fn new() -> Self {
        Self {
            children: Mutex::new(HashMap::new()),
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.children.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ProcessLauncher for WindowsProcessLauncher {
    async fn spawn_process(&self, program: &Path, args: &[String]) -> std::io::Result<ProcessId> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            // CREATE_NO_WINDOW (0x08000000) - Creates a process without a console window
            cmd.creation_flags(0x08000000);
        }

        let child = cmd.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| std::io::Error::other("spawned process has no PID"))?;

        info!(
            pid = %pid,
            program = %program.display(),
            args = ?args,
            "Spawned Windows process"
        );

        let mut children = self
            .children
            .lock()
            .map_err(|_| std::io::Error::other("process table lock poisoned"))?;
        // Reap children that exited without anyone waiting on them
        children.retain(|_, tracked| !matches!(tracked.try_wait(), Ok(Some(_))));
        children.insert(pid, child);
        Ok(pid)
    }

    async fn wait_for_exit(
        &self,
        pid: ProcessId,
        timeout: Option<Duration>,
    ) -> Result<Option<ExitStatus>> {
        let child = self
            .children
            .lock()
            .map_err(|_| anyhow::anyhow!("process table lock poisoned"))?
            .remove(&pid);
        let Some(mut child) = child else {
            return Ok(None);
        };

        let status = match timeout {
            Some(duration) => match tokio::time::timeout(duration, child.wait()).await {
                Ok(status) => Some(status?),
                Err(_) => None,
            },
            None => Some(child.wait().await?),
        };

        if status.is_none() {
            self.children
                .lock()
                .map_err(|_| anyhow::anyhow!("process table lock poisoned"))?
                .insert(pid, child);
        }
        Ok(status)
    }
}

impl Drop for WindowsProcessLauncher {
    fn drop(&mut self) {
        let Ok(children) = self.children.get_mut() else {
            return;
        };

        let running: Vec<ProcessId> = children
            .iter_mut()
            .filter_map(|(pid, child)| matches!(child.try_wait(), Ok(None)).then_some(*pid))
            .collect();

        if !running.is_empty() {
            warn!(
                count = running.len(),
                "Emergency cleanup: terminating processes during drop"
            );

            for pid in running {
                if let Some(child) = children.get_mut(&pid) {
                    if let Err(e) = child.start_kill() {
                        warn!(pid = %pid, error = %e, "Failed to kill process during drop");
                    }
                }
            }
        }
    }
}
