use sidecar_layer_core::{
    CompletionSignal, ProcessEntry, ProcessId, TerminationResult, TerminationStrategy,
    TerminationTarget,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read access to the OS process table plus a forceful kill
pub trait ProcessTree: Send + Sync {
    /// Every process descended from `root`, at any depth
    fn descendants(&self, root: ProcessId) -> anyhow::Result<Vec<ProcessEntry>>;

    /// Terminate a single process without giving it a chance to clean up
    fn force_kill(&self, pid: ProcessId) -> TerminationResult;
}

/// Counts from one sweep of the process tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub matched: usize,
    pub killed: usize,
    pub failed: usize,
}

/// Process-tree termination for platforms without process-group signals
///
/// The tracked pid may only be a launcher, and the real service may have
/// re-executed itself, so the strategy walks the supervising application's
/// own tree and kills every descendant running the sidecar image.
pub struct ProcessTreeStrategy<T> {
    tree: Arc<T>,
}

impl<T: ProcessTree + 'static> ProcessTreeStrategy<T> {
    pub fn new(tree: T) -> Self {
        Self {
            tree: Arc::new(tree),
        }
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Synchronously kill every matching descendant of `target.caller_pid`
    pub fn sweep(&self, target: &TerminationTarget) -> SweepReport {
        sweep_tree(self.tree.as_ref(), target)
    }
}

impl<T: ProcessTree + 'static> TerminationStrategy for ProcessTreeStrategy<T> {
    fn terminate(&self, target: &TerminationTarget) -> CompletionSignal {
        let signal = CompletionSignal::pending();

        let tree = Arc::clone(&self.tree);
        let target = target.clone();
        let done = signal.clone();
        let job = move || {
            let report = sweep_tree(tree.as_ref(), &target);
            debug!(
                matched = report.matched,
                killed = report.killed,
                failed = report.failed,
                "Process tree sweep finished"
            );
            done.complete();
        };

        // The sweep blocks on the process table, keep it off the async workers
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(job);
            }
            Err(_) => {
                std::thread::spawn(job);
            }
        }

        signal
    }

    fn name(&self) -> &'static str {
        "process-tree"
    }
}

fn sweep_tree<T: ProcessTree + ?Sized>(tree: &T, target: &TerminationTarget) -> SweepReport {
    let mut report = SweepReport::default();

    let descendants = match tree.descendants(target.caller_pid) {
        Ok(descendants) => descendants,
        Err(e) => {
            warn!(
                root_pid = %target.caller_pid,
                error = %e,
                "Failed to enumerate process tree"
            );
            return report;
        }
    };

    let matching: Vec<&ProcessEntry> = descendants
        .iter()
        .filter(|entry| entry.runs_image(&target.image_name))
        .collect();
    report.matched = matching.len();

    if matching.is_empty() {
        info!(
            root_pid = %target.caller_pid,
            image = %target.image_name,
            "No sidecar processes found in process tree"
        );
        return report;
    }

    info!(
        count = matching.len(),
        image = %target.image_name,
        "Found sidecar processes to terminate"
    );

    for entry in matching {
        match tree.force_kill(entry.pid) {
            TerminationResult::Success => {
                info!(pid = %entry.pid, "Force killed sidecar process");
                report.killed += 1;
            }
            TerminationResult::ProcessNotFound => {
                info!(pid = %entry.pid, "Sidecar process already terminated");
                report.killed += 1;
            }
            result => {
                warn!(
                    pid = %entry.pid,
                    result = ?result,
                    "Failed to terminate sidecar process"
                );
                report.failed += 1;
            }
        }
    }

    report
}
