//! Unix-specific sidecar launching and termination

mod signal_strategy;
mod unix_launcher;

pub use signal_strategy::{PosixSignalStrategy, ProcessSignaller};
#[cfg(unix)]
pub use signal_strategy::NixSignaller;
pub use unix_launcher::UnixProcessLauncher;

pub struct UnixSidecarFactory;

#[cfg(unix)]
impl UnixSidecarFactory {
    pub fn create_launcher() -> UnixProcessLauncher {
        UnixProcessLauncher::new()
    }

    pub fn create_strategy() -> PosixSignalStrategy<NixSignaller> {
        PosixSignalStrategy::system()
    }
}

impl UnixSidecarFactory {
    pub fn platform_name() -> &'static str {
        "Unix"
    }
}
