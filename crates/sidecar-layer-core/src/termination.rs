use crate::config::ShutdownConfig;
use crate::process::{ProcessId, SidecarHandle};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// What a termination strategy is asked to tear down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationTarget {
    /// Process id recorded when the sidecar was launched
    pub pid: ProcessId,
    /// Process id of the supervising application itself
    pub caller_pid: ProcessId,
    /// Base name of the sidecar executable or script, e.g. `api.exe`
    pub image_name: String,
}

/// Platform-specific way of tearing down the sidecar
///
/// Implementations issue their termination requests and hand back a
/// [`CompletionSignal`] that is set once every request has been issued.
/// Failures on individual processes are logged and swallowed.
pub trait TerminationStrategy: Send + Sync {
    fn terminate(&self, target: &TerminationTarget) -> CompletionSignal;

    /// Name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Completion flag shared between a strategy and the waiting shutdown sequence
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal(Arc<AtomicBool>);

impl CompletionSignal {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn completed() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn complete(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Poll the flag every `interval` until it is set or `max_wait` elapses.
    /// Returns `None` on completion, the time waited otherwise.
    pub async fn poll(&self, interval: Duration, max_wait: Option<Duration>) -> Option<Duration> {
        let started = Instant::now();
        loop {
            if self.is_complete() {
                return None;
            }

            let waited = started.elapsed();
            if max_wait.is_some_and(|max_wait| waited >= max_wait) {
                return Some(waited);
            }

            tokio::time::sleep(interval).await;
        }
    }
}

/// How a termination outcome resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStatus {
    /// All termination requests were issued
    Completed,
    /// No sidecar was active; nothing was signalled
    NotRunning,
    /// The strategy did not report completion within the configured wait
    TimedOut { waited: Duration },
}

impl TerminationStatus {
    pub fn is_complete(&self) -> bool {
        !matches!(self, TerminationStatus::TimedOut { .. })
    }
}

/// Awaitable result of a terminate request
///
/// Borrows the sidecar handle until it resolves, so nothing else can touch the
/// handle while termination is in flight. The handle is cleared once the
/// strategy reports completion. When the wait times out the handle stays in
/// the terminating state, and the supervisor refuses to relaunch until the
/// background teardown finishes.
#[must_use = "the sidecar handle is only cleared once the outcome is awaited"]
pub struct TerminationOutcome<'a> {
    handle: &'a mut SidecarHandle,
    signal: CompletionSignal,
    status_on_completion: TerminationStatus,
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl<'a> TerminationOutcome<'a> {
    pub(crate) fn in_flight(
        handle: &'a mut SidecarHandle,
        signal: CompletionSignal,
        shutdown: &ShutdownConfig,
    ) -> Self {
        Self {
            handle,
            signal,
            status_on_completion: TerminationStatus::Completed,
            poll_interval: shutdown.poll_interval(),
            max_wait: shutdown.max_wait(),
        }
    }

    pub(crate) fn not_running(handle: &'a mut SidecarHandle) -> Self {
        Self {
            handle,
            signal: CompletionSignal::completed(),
            status_on_completion: TerminationStatus::NotRunning,
            poll_interval: Duration::ZERO,
            max_wait: None,
        }
    }

    /// Non-blocking check of the completion flag
    pub fn is_complete(&self) -> bool {
        self.signal.is_complete()
    }

    pub async fn wait(self) -> TerminationStatus {
        let Self {
            handle,
            signal,
            status_on_completion,
            poll_interval,
            max_wait,
        } = self;

        match signal.poll(poll_interval, max_wait).await {
            None => {
                if let Some(pid) = handle.process_id() {
                    debug!(pid = %pid, status = ?status_on_completion, "Sidecar handle released");
                }
                handle.clear();
                status_on_completion
            }
            Some(waited) => {
                warn!(
                    pid = ?handle.process_id(),
                    waited_ms = waited.as_millis() as u64,
                    "Gave up waiting for sidecar cleanup, it continues in the background"
                );
                // Held until the strategy reports completion
                handle.defer_cleanup(signal);
                TerminationStatus::TimedOut { waited }
            }
        }
    }
}

impl<'a> IntoFuture for TerminationOutcome<'a> {
    type Output = TerminationStatus;
    type IntoFuture = Pin<Box<dyn Future<Output = TerminationStatus> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_signal_resolves_immediately() {
        let signal = CompletionSignal::completed();
        let result = signal
            .poll(Duration::from_secs(60), Some(Duration::from_secs(60)))
            .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_signal_completed_later_resolves() {
        let signal = CompletionSignal::pending();
        let setter = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            setter.complete();
        });

        let result = signal
            .poll(Duration::from_millis(10), Some(Duration::from_secs(5)))
            .await;
        assert_eq!(result, None);
        assert!(signal.is_complete());
    }

    #[tokio::test]
    async fn test_never_completed_signal_times_out() {
        let signal = CompletionSignal::pending();
        let waited = signal
            .poll(Duration::from_millis(10), Some(Duration::from_millis(60)))
            .await
            .expect("poll should give up");
        assert!(waited >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_outcome_holds_handle_after_timeout() {
        let mut handle = SidecarHandle::new(5000);
        handle.begin_termination();
        let shutdown = ShutdownConfig {
            poll_interval_ms: 5,
            max_wait_ms: Some(20),
        };
        let signal = CompletionSignal::pending();

        let outcome = TerminationOutcome::in_flight(&mut handle, signal.clone(), &shutdown);
        assert!(!outcome.is_complete());
        let status = outcome.await;

        assert!(matches!(status, TerminationStatus::TimedOut { .. }));
        assert!(!status.is_complete());
        assert_eq!(handle.state(), crate::process::SidecarState::Terminating);
        assert!(handle.cleanup_pending());

        signal.complete();
        assert!(!handle.cleanup_pending());
    }

    #[tokio::test]
    async fn test_outcome_clears_handle_on_completion() {
        let mut handle = SidecarHandle::new(5000);
        handle.begin_termination();
        let shutdown = ShutdownConfig {
            poll_interval_ms: 5,
            max_wait_ms: Some(1_000),
        };

        let status =
            TerminationOutcome::in_flight(&mut handle, CompletionSignal::completed(), &shutdown)
                .await;

        assert_eq!(status, TerminationStatus::Completed);
        assert_eq!(handle.state(), crate::process::SidecarState::Absent);
    }

    #[tokio::test]
    async fn test_not_running_outcome() {
        let mut handle = SidecarHandle::new(5000);
        let status = TerminationOutcome::not_running(&mut handle).await;
        assert_eq!(status, TerminationStatus::NotRunning);
        assert!(status.is_complete());
    }
}
