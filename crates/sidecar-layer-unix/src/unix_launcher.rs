#[cfg(unix)]
mod unix_impl {
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

    /// Unix-specific launcher that keeps every spawned child so it can be reaped
    pub struct UnixProcessLauncher {
        children: Mutex<HashMap<ProcessId, Child>>,
    }

    impl Default for UnixProcessLauncher {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UnixProcessLauncher {
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
    impl ProcessLauncher for UnixProcessLauncher {
        async fn spawn_process(&self, program: &Path, args: &[String]) -> std::io::Result<ProcessId> {
            let mut cmd = Command::new(program);
            cmd.args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());

            // Own process group, so a terminal Ctrl-C reaches the shell only
            cmd.process_group(0);

            let child = cmd.spawn()?;
            let pid = child
                .id()
                .ok_or_else(|| std::io::Error::other("spawned process has no PID"))?;

            info!(
                "Spawned Unix process: {} (PID: {}) with args: {:?}",
                program.display(),
                pid,
                args
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
                // Still running, keep tracking it
                self.children
                    .lock()
                    .map_err(|_| anyhow::anyhow!("process table lock poisoned"))?
                    .insert(pid, child);
            }
            Ok(status)
        }
    }

    impl Drop for UnixProcessLauncher {
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
                    "Emergency cleanup: terminating {} processes during drop",
                    running.len()
                );

                for pid in running {
                    use nix::sys::signal::{self, Signal};
                    use nix::unistd::Pid as NixPid;

                    if let Err(e) = signal::kill(NixPid::from_raw(pid as i32), Signal::SIGTERM) {
                        warn!(
                            "Failed to send SIGTERM to process {} during drop: {}",
                            pid, e
                        );
                    }
                }
            }
        }
    }
}

// Re-export the Unix implementation when on Unix systems
#[cfg(unix)]
pub use unix_impl::UnixProcessLauncher;

// Provide stub implementations for non-Unix systems
#[cfg(not(unix))]
pub struct UnixProcessLauncher;

#[cfg(not(unix))]
impl UnixProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(unix))]
impl Default for UnixProcessLauncher {
    fn default() -> Self {
        Self::new()
    }
}
