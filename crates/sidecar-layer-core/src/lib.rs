//! Sidecar Layer Core - Platform-independent sidecar supervision
//!
//! This crate provides the executable resolver, the sidecar handle and its
//! state machine, the supervisor, and the traits that platform-specific
//! crates implement to launch and terminate the sidecar.

mod config;
mod error;
mod platform;
mod process;
mod resolver;
mod supervisor;
mod termination;

pub use config::*;
pub use error::*;
pub use platform::*;
pub use process::*;
pub use resolver::*;
pub use supervisor::*;
pub use termination::*;
