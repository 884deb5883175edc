use sidecar_layer_core::{
    CompletionSignal, ProcessId, TerminationResult, TerminationStrategy, TerminationTarget,
};
use tracing::{info, warn};

/// Delivers a termination signal to a single process
pub trait ProcessSignaller: Send + Sync {
    fn terminate(&self, pid: ProcessId) -> TerminationResult;
}

/// Posix termination: one signal to the tracked child
///
/// The outcome is complete as soon as the signal has been issued. The
/// strategy does not wait for the process to exit.
pub struct PosixSignalStrategy<S> {
    signaller: S,
}

impl<S: ProcessSignaller> PosixSignalStrategy<S> {
    pub fn new(signaller: S) -> Self {
        Self { signaller }
    }

    pub fn signaller(&self) -> &S {
        &self.signaller
    }
}

impl<S: ProcessSignaller> TerminationStrategy for PosixSignalStrategy<S> {
    fn terminate(&self, target: &TerminationTarget) -> CompletionSignal {
        match self.signaller.terminate(target.pid) {
            TerminationResult::Success => {
                info!(pid = %target.pid, "Sent termination signal to sidecar");
            }
            TerminationResult::ProcessNotFound => {
                info!(pid = %target.pid, "Sidecar already terminated");
            }
            other => {
                warn!(pid = %target.pid, result = ?other, "Failed to signal sidecar");
            }
        }
        CompletionSignal::completed()
    }

    fn name(&self) -> &'static str {
        "posix-signal"
    }
}

#[cfg(unix)]
mod nix_impl {
    use super::*;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid as NixPid;

    /// SIGTERM through `kill(2)`
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NixSignaller;

    impl ProcessSignaller for NixSignaller {
        fn terminate(&self, pid: ProcessId) -> TerminationResult {
            let nix_pid = NixPid::from_raw(pid as i32);

            match signal::kill(nix_pid, Signal::SIGTERM) {
                Ok(()) => TerminationResult::Success,
                Err(nix::errno::Errno::ESRCH) => TerminationResult::ProcessNotFound,
                Err(nix::errno::Errno::EPERM) => {
                    warn!(pid = %pid, "Permission denied to terminate process");
                    TerminationResult::AccessDenied
                }
                Err(e) => TerminationResult::Failed(format!("SIGTERM failed: {e}")),
            }
        }
    }

    impl PosixSignalStrategy<NixSignaller> {
        /// Strategy backed by real signals
        pub fn system() -> Self {
            Self::new(NixSignaller)
        }
    }
}

#[cfg(unix)]
pub use nix_impl::NixSignaller;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSignaller {
        signalled: Mutex<Vec<ProcessId>>,
        result: TerminationResult,
    }

    impl RecordingSignaller {
        fn returning(result: TerminationResult) -> Self {
            Self {
                signalled: Mutex::new(Vec::new()),
                result,
            }
        }
    }

    impl ProcessSignaller for RecordingSignaller {
        fn terminate(&self, pid: ProcessId) -> TerminationResult {
            self.signalled.lock().unwrap().push(pid);
            self.result.clone()
        }
    }

    fn target(pid: ProcessId) -> TerminationTarget {
        TerminationTarget {
            pid,
            caller_pid: 1,
            image_name: "api".to_string(),
        }
    }

    #[test]
    fn test_single_signal_to_tracked_pid() {
        let strategy =
            PosixSignalStrategy::new(RecordingSignaller::returning(TerminationResult::Success));

        let signal = strategy.terminate(&target(4242));

        assert!(signal.is_complete());
        assert_eq!(*strategy.signaller().signalled.lock().unwrap(), vec![4242]);
    }

    #[test]
    fn test_signal_failure_is_swallowed() {
        for result in [
            TerminationResult::ProcessNotFound,
            TerminationResult::AccessDenied,
            TerminationResult::Failed("EINVAL".to_string()),
        ] {
            let strategy = PosixSignalStrategy::new(RecordingSignaller::returning(result));
            let signal = strategy.terminate(&target(7));
            assert!(signal.is_complete());
            assert_eq!(strategy.signaller().signalled.lock().unwrap().len(), 1);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_nix_signaller_missing_process() {
        // PIDs are capped well below i32::MAX on Linux and macOS
        let result = NixSignaller.terminate(i32::MAX as ProcessId);
        assert_eq!(result, TerminationResult::ProcessNotFound);
    }
}
