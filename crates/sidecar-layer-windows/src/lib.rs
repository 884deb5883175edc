//! Windows-specific sidecar launching and process-tree termination
//!
//! The strategy logic compiles on every platform so it can be exercised
//! against simulated process tables; only the forceful kill goes through the
//! Win32 API.

mod sysinfo_tree;
mod tree_strategy;
mod windows_launcher;

pub use sysinfo_tree::SysinfoProcessTree;
pub use tree_strategy::{ProcessTree, ProcessTreeStrategy, SweepReport};
pub use windows_launcher::WindowsProcessLauncher;

/// Windows-specific sidecar factory
pub struct WindowsSidecarFactory;

impl WindowsSidecarFactory {
    pub fn create_launcher() -> WindowsProcessLauncher {
        WindowsProcessLauncher::new()
    }

    pub fn create_strategy() -> ProcessTreeStrategy<SysinfoProcessTree> {
        ProcessTreeStrategy::new(SysinfoProcessTree::new())
    }

    pub fn platform_name() -> &'static str {
        "Windows"
    }
}
