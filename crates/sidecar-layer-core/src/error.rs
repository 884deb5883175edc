use crate::process::ProcessId;
use std::path::PathBuf;
use thiserror::Error;

/// Core error types for sidecar operations
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Unrecognized platform: {0}")]
    Resolution(String),

    #[error("Failed to launch sidecar {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sidecar already running with PID {0}")]
    AlreadyRunning(ProcessId),

    #[error("Sidecar with PID {0} is still being terminated")]
    TerminationPending(ProcessId),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl SidecarError {
    pub fn resolution(platform: impl Into<String>) -> Self {
        SidecarError::Resolution(platform.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        SidecarError::Configuration(message.into())
    }

    /// Check if this error should stop the shell from presenting its UI,
    /// since the backend would be unreachable
    pub fn is_fatal_to_startup(&self) -> bool {
        matches!(
            self,
            SidecarError::Resolution(_)
                | SidecarError::Launch { .. }
                | SidecarError::Configuration(_)
        )
    }
}
